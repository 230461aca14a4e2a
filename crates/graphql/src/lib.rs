//! GraphQL API for the Retailer gateway.
//!
//! Provides a GraphQL endpoint for orders and reference lookups, backed by
//! a [`RetailGateway`](retailer_core::services::RetailGateway).
//!
//! # Building and Serving
//!
//! ```ignore
//! use std::sync::Arc;
//! use retailer_graphql::{build_schema, serve_with_shutdown, ServerConfig};
//!
//! let schema = build_schema(Arc::new(gateway));
//! serve_with_shutdown(schema, ServerConfig::default(), shutdown_signal).await?;
//! ```

mod schema;
mod server;
mod types;

pub use schema::{
    MAX_QUERY_COMPLEXITY, MAX_QUERY_DEPTH, Order, OrdersResponse, Pagination, ReferenceEntry,
    RetailQuery, build_schema,
};
pub use server::{ServerConfig, router, serve_with_shutdown};
pub use types::RetailSchema;
