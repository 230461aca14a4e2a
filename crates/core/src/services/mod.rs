mod gateway;
mod limiter;

pub use gateway::*;
pub use limiter::*;
