//! RetailCRM REST transport over reqwest.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, trace};
use url::Url;

use retailer_core::error::{UpstreamError, UpstreamResult};
use retailer_core::ports::CrmTransport;

/// Header carrying the CRM API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Path appended to the CRM root URL.
pub const API_PREFIX: &str = "/api/v5";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the HTTP transport.
#[derive(Clone)]
pub struct HttpTransportConfig {
    /// CRM root URL (e.g., "https://shop.retailcrm.ru").
    pub base_url: String,
    /// API key sent on every request.
    pub api_key: String,
    /// Fixed per-request timeout.
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// The API key must never reach the logs.
impl fmt::Debug for HttpTransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransportConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"****")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// CRM transport adapter implementing the CrmTransport port.
///
/// Wraps a single pooled `reqwest::Client`; cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: String,
}

impl HttpTransport {
    /// Build the underlying HTTP client.
    #[instrument(skip_all, fields(url = %config.base_url))]
    pub fn new(config: HttpTransportConfig) -> UpstreamResult<Self> {
        let api_url = api_url(&config.base_url)?;

        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| UpstreamError::ClientBuild("API key is not a valid header value".into()))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| UpstreamError::ClientBuild(e.to_string()))?;

        debug!(api_url = %api_url, "HTTP transport ready");

        Ok(Self { client, api_url })
    }

    /// Versioned API root every path is appended to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request_url(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}{}", self.api_url, path)
        } else {
            format!("{}{}?{}", self.api_url, path, query)
        }
    }
}

#[async_trait]
impl CrmTransport for HttpTransport {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, path: &str, query: &str) -> UpstreamResult<Option<Value>> {
        let url = self.request_url(path, query);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        trace!(status = status.as_u16(), bytes = body.len(), "CRM response");

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string()
            });
            return Err(UpstreamError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let value: Value = serde_json::from_slice(&body).map_err(|e| UpstreamError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;

        Ok(if value.is_null() { None } else { Some(value) })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Validate the CRM root and append the API prefix.
fn api_url(base_url: &str) -> UpstreamResult<String> {
    let parsed = Url::parse(base_url)
        .map_err(|e| UpstreamError::ClientBuild(format!("invalid CRM URL {:?}: {}", base_url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UpstreamError::ClientBuild(format!(
            "CRM URL must be http(s), got {:?}",
            base_url
        )));
    }

    Ok(format!("{}{}", base_url.trim_end_matches('/'), API_PREFIX))
}

/// Extract RetailCRM's `errorMsg` from an error body.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("errorMsg")?.as_str().map(str::to_string)
}
