//! Core domain layer for the Retailer gateway.
//!
//! This crate contains the domain models, the CRM port trait, and the
//! gateway service that turns GraphQL-shaped requests into RetailCRM REST
//! calls. It follows hexagonal architecture principles - this is the
//! innermost layer and contains no HTTP code.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     retailer (binary)                       │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │       retailer-graphql       │        retailer-crm          │
//! │            (API)             │       (REST transport)       │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                    retailer-core  ← YOU ARE HERE            │
//! │        (models, query, ports, gateway, limiter)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (Order, Pagination, ReferenceEntry, filters)
//! - [`query`] - Nested filter to query-string serialization
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - The gateway service and its concurrency limiter
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Request Lifecycle
//!
//! 1. A gateway operation builds an [`models::OrdersFilter`] (or none)
//! 2. The filter is flattened by [`query::serialize`]
//! 3. The request waits for a slot in the [`services::ConcurrencyLimiter`]
//! 4. The [`ports::CrmTransport`] performs the GET
//! 5. The body is decoded into typed models, or the call fails with
//!    [`error::UpstreamError`]

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod query;
pub mod services;
