//! RetailCRM REST adapter for the Retailer gateway.
//!
//! This crate implements the [`CrmTransport`] port from `retailer-core`,
//! providing connectivity to a RetailCRM instance over its `api/v5` REST API.
//!
//! # Features
//!
//! - Single pooled HTTP client with a fixed per-request timeout
//! - API key sent as the `x-api-key` header on every request
//! - Empty and `null` bodies reported as absent, non-2xx statuses as
//!   errors carrying the CRM's `errorMsg`
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use retailer_core::services::RetailGateway;
//! use retailer_crm::{HttpTransport, HttpTransportConfig};
//!
//! let config = HttpTransportConfig::new("https://shop.retailcrm.ru", api_key);
//! let transport = Arc::new(HttpTransport::new(config)?);
//! let gateway = RetailGateway::new(transport, 10)?;
//!
//! let page = gateway.orders(None).await?;
//! ```
//!
//! Admission control lives in the gateway, not here: the transport sends
//! whatever it is asked to send.
//!
//! [`CrmTransport`]: retailer_core::ports::CrmTransport

mod client;

pub use client::{
    API_KEY_HEADER, API_PREFIX, DEFAULT_TIMEOUT, HttpTransport, HttpTransportConfig,
};
