//! Error types for the retailer domain layer.
//!
//! This module defines a small hierarchy of error types:
//!
//! - [`UpstreamError`] - Failures talking to the retail CRM
//! - [`GatewayError`] - Top-level errors returned by the gateway service
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Upstream Errors
// =============================================================================

/// Retail CRM connectivity and response errors.
///
/// Timeouts and refused connections are not told apart: both surface
/// as [`UpstreamError::Transport`].
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The CRM answered without a body (or with JSON `null`).
    #[error("Retail CRM returned an empty response for {endpoint}")]
    EmptyResponse {
        /// Endpoint path that was requested.
        endpoint: String,
    },

    /// The CRM answered with a non-success HTTP status.
    #[error("Retail CRM responded {status} for {endpoint}: {message}")]
    Status {
        /// Endpoint path that was requested.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// `errorMsg` from the CRM body, or the canonical reason.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Malformed response for {endpoint}: {message}")]
    Decode {
        /// Endpoint path that was requested.
        endpoint: String,
        /// Error details.
        message: String,
    },

    /// The request never produced a response (timeout, connection failure).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    ClientBuild(String),
}

// =============================================================================
// Gateway Errors
// =============================================================================

/// Errors returned by [`crate::services::RetailGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A caller-supplied argument was rejected before any request was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Retail CRM error.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result type for transport operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
