//! Port trait for the retail CRM transport.
//!
//! This trait defines how the gateway reaches the CRM's REST API.
//! Implementations live in the infrastructure layer (e.g., `retailer-crm`);
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UpstreamResult;

/// Port trait for issuing GET requests against the CRM.
#[async_trait]
pub trait CrmTransport: Send + Sync {
    /// Issue `GET {base}{path}?{query}` and return the decoded JSON body.
    ///
    /// `query` is an already serialized query string, possibly empty.
    /// Returns `Ok(None)` when the CRM answered with an empty body or
    /// JSON `null`.
    async fn get(&self, path: &str, query: &str) -> UpstreamResult<Option<Value>>;
}
