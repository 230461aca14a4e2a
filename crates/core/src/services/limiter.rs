//! Bounded admission for outbound CRM requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{GatewayError, GatewayResult};
use crate::metrics::record_in_flight;

/// Caps the number of simultaneous outbound requests.
///
/// Callers beyond the limit wait in FIFO order (tokio's semaphore is fair)
/// and are admitted as earlier permits are dropped. Cloning shares the
/// same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    limit: usize,
}

/// An admitted request slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl ConcurrencyLimiter {
    /// Create a limiter admitting at most `limit` concurrent requests.
    pub fn new(limit: usize) -> GatewayResult<Self> {
        if limit == 0 {
            return Err(GatewayError::Config(
                "max concurrent requests must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            limit,
        })
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> GatewayResult<Permit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GatewayError::Config("concurrency limiter closed".to_string()))?;

        let current = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        record_in_flight(current);

        Ok(Permit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }

    /// Configured maximum.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Requests currently admitted.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        let current = self.in_flight.fetch_sub(1, Ordering::AcqRel) - 1;
        record_in_flight(current);
    }
}
