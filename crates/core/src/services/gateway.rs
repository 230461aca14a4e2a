//! Retail gateway service - typed operations over the CRM transport.
//!
//! Every operation issues exactly one outbound request. Requests are
//! admitted through a [`ConcurrencyLimiter`] shared by all operations of a
//! gateway instance; excess requests queue rather than fail. Nothing is
//! cached and nothing is retried.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::limiter::ConcurrencyLimiter;
use crate::error::{GatewayError, GatewayResult, UpstreamError};
use crate::metrics::{RequestTimer, record_request};
use crate::models::{Order, OrdersFilter, OrdersPage, Pagination, ReferenceEntry};
use crate::ports::CrmTransport;
use crate::query::to_query_string;

/// Default cap on simultaneous CRM requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;

const ORDERS_ENDPOINT: &str = "/orders";
const ORDER_STATUSES_ENDPOINT: &str = "/reference/statuses";
const PRODUCT_STATUSES_ENDPOINT: &str = "/reference/product-statuses";
const DELIVERY_TYPES_ENDPOINT: &str = "/reference/delivery-types";

/// `GET /orders` body.
#[derive(Deserialize)]
struct OrdersEnvelope {
    orders: Vec<Order>,
    pagination: Pagination,
}

/// `GET /orders` body when only the list matters.
#[derive(Deserialize)]
struct OrderListEnvelope {
    orders: Vec<Order>,
}

// =============================================================================
// RetailGateway
// =============================================================================

/// Typed access to the retail CRM.
///
/// The gateway holds no per-request state; it can be shared behind an
/// `Arc` by any number of concurrent callers.
pub struct RetailGateway {
    transport: Arc<dyn CrmTransport>,
    limiter: ConcurrencyLimiter,
}

impl RetailGateway {
    /// Create a gateway admitting at most `max_concurrent_requests`
    /// simultaneous CRM requests.
    pub fn new(
        transport: Arc<dyn CrmTransport>,
        max_concurrent_requests: usize,
    ) -> GatewayResult<Self> {
        Ok(Self {
            transport,
            limiter: ConcurrencyLimiter::new(max_concurrent_requests)?,
        })
    }

    /// The limiter guarding this gateway's requests.
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Fetch a page of orders.
    #[instrument(skip_all, fields(page = filter.and_then(|f| f.page)))]
    pub async fn orders(&self, filter: Option<&OrdersFilter>) -> GatewayResult<OrdersPage> {
        let query = match filter {
            Some(filter) => encode_filter(filter)?,
            None => String::new(),
        };

        let envelope: OrdersEnvelope = self.fetch(ORDERS_ENDPOINT, &query).await?;

        debug!(
            count = envelope.orders.len(),
            current_page = envelope.pagination.current_page,
            total_pages = envelope.pagination.total_page_count,
            "Orders fetched"
        );

        Ok(OrdersPage {
            orders: envelope.orders,
            pagination: envelope.pagination,
        })
    }

    /// Look up a single order by its internal identifier.
    ///
    /// Returns `Ok(None)` when the CRM has no such order. A non-numeric
    /// `id` is rejected before any request is made.
    #[instrument(skip(self))]
    pub async fn find_order(&self, id: &str) -> GatewayResult<Option<Order>> {
        let id = parse_order_id(id)?;
        let query = encode_filter(&OrdersFilter::by_ids(vec![id]))?;

        let envelope: OrderListEnvelope = self.fetch(ORDERS_ENDPOINT, &query).await?;
        let order = envelope.orders.into_iter().next();

        debug!(found = order.is_some(), "Order lookup finished");
        Ok(order)
    }

    /// Order status vocabulary.
    pub async fn order_statuses(&self) -> GatewayResult<Vec<ReferenceEntry>> {
        self.fetch_reference(ORDER_STATUSES_ENDPOINT, "statuses").await
    }

    /// Product (order item) status vocabulary.
    pub async fn product_statuses(&self) -> GatewayResult<Vec<ReferenceEntry>> {
        self.fetch_reference(PRODUCT_STATUSES_ENDPOINT, "productStatuses")
            .await
    }

    /// Delivery type vocabulary.
    pub async fn delivery_types(&self) -> GatewayResult<Vec<ReferenceEntry>> {
        self.fetch_reference(DELIVERY_TYPES_ENDPOINT, "deliveryTypes")
            .await
    }

    /// Fetch a reference endpoint and extract `property` from its body.
    ///
    /// The CRM returns reference data as an object keyed by code; a plain
    /// array is accepted too. Entries keep the upstream order.
    #[instrument(skip(self))]
    async fn fetch_reference(
        &self,
        endpoint: &str,
        property: &str,
    ) -> GatewayResult<Vec<ReferenceEntry>> {
        let mut body = self.request(endpoint, "").await?;

        let entries = match body.get_mut(property).map(Value::take) {
            Some(Value::Array(items)) => items,
            Some(Value::Object(by_code)) => by_code.into_iter().map(|(_, entry)| entry).collect(),
            _ => {
                return Err(decode_error(
                    endpoint,
                    format!("missing `{}` list", property),
                ));
            }
        };

        let entries = entries
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ReferenceEntry>, _>>()
            .map_err(|e| decode_error(endpoint, e.to_string()))?;

        debug!(count = entries.len(), "Reference entries fetched");
        Ok(entries)
    }

    /// Issue a request and decode the body into `T`.
    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, query: &str) -> GatewayResult<T> {
        let body = self.request(endpoint, query).await?;
        serde_json::from_value(body).map_err(|e| decode_error(endpoint, e.to_string()))
    }

    /// One admitted round trip to the CRM.
    async fn request(&self, endpoint: &str, query: &str) -> GatewayResult<Value> {
        let _permit = self.limiter.acquire().await?;
        let _timer = RequestTimer::new(endpoint);

        debug!(endpoint, query, "CRM request");

        match self.transport.get(endpoint, query).await {
            Ok(Some(Value::Null)) | Ok(None) => {
                record_request(endpoint, "empty");
                warn!(endpoint, "CRM returned an empty body");
                Err(UpstreamError::EmptyResponse {
                    endpoint: endpoint.to_string(),
                }
                .into())
            }
            Ok(Some(body)) => {
                record_request(endpoint, "ok");
                Ok(body)
            }
            Err(e) => {
                record_request(endpoint, failure_outcome(&e));
                warn!(endpoint, error = %e, "CRM request failed");
                Err(e.into())
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn encode_filter(filter: &OrdersFilter) -> GatewayResult<String> {
    to_query_string(filter).map_err(|e| GatewayError::InvalidArgument(e.to_string()))
}

/// Parse an order identifier as a positive integer.
fn parse_order_id(raw: &str) -> GatewayResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(GatewayError::InvalidArgument(format!(
            "order id must be a positive integer, got {:?}",
            raw
        ))),
    }
}

/// `crm_requests_total` outcome label for a failed transport call.
fn failure_outcome(error: &UpstreamError) -> &'static str {
    match error {
        UpstreamError::Status { .. } => "status",
        UpstreamError::Decode { .. } => "decode",
        UpstreamError::EmptyResponse { .. } => "empty",
        UpstreamError::Transport(_) | UpstreamError::ClientBuild(_) => "transport",
    }
}

fn decode_error(endpoint: &str, message: String) -> GatewayError {
    warn!(endpoint, %message, "Unexpected CRM response shape");
    UpstreamError::Decode {
        endpoint: endpoint.to_string(),
        message,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::error::UpstreamResult;

    /// Replays scripted bodies and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<UpstreamResult<Option<Value>>>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedTransport {
        fn with(responses: Vec<UpstreamResult<Option<Value>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::default(),
            })
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CrmTransport for ScriptedTransport {
        async fn get(&self, path: &str, query: &str) -> UpstreamResult<Option<Value>> {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_string(), query.to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        }
    }

    fn gateway(transport: Arc<ScriptedTransport>) -> RetailGateway {
        RetailGateway::new(transport, DEFAULT_MAX_CONCURRENT_REQUESTS).unwrap()
    }

    fn orders_body(ids: &[i64]) -> Value {
        let orders: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "id": id, "number": format!("{}A", id) }))
            .collect();
        json!({
            "success": true,
            "orders": orders,
            "pagination": { "limit": 20, "totalCount": ids.len(), "currentPage": 1, "totalPageCount": 1 }
        })
    }

    #[tokio::test]
    async fn test_orders_passes_filter_and_pagination() {
        let transport = ScriptedTransport::with(vec![Ok(Some(orders_body(&[1, 2])))]);
        let gateway = gateway(transport.clone());

        let page = gateway
            .orders(Some(&OrdersFilter::page(2)))
            .await
            .unwrap();

        assert_eq!(page.orders.len(), 2);
        assert_eq!(page.orders[1].number.as_deref(), Some("2A"));
        assert_eq!(page.pagination.total_count, 2);
        assert_eq!(
            transport.calls(),
            vec![("/orders".to_string(), "page=2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_orders_without_filter_sends_empty_query() {
        let transport = ScriptedTransport::with(vec![Ok(Some(orders_body(&[])))]);
        gateway(transport.clone()).orders(None).await.unwrap();
        assert_eq!(transport.calls()[0].1, "");
    }

    #[tokio::test]
    async fn test_orders_rejects_malformed_body() {
        let transport = ScriptedTransport::with(vec![Ok(Some(json!({ "orders": "nope" })))]);
        let err = gateway(transport).orders(None).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Upstream(UpstreamError::Decode { .. })
        ));
    }

    // Test critique: premier élément si trouvé, None sinon - jamais d'erreur
    #[tokio::test]
    async fn test_find_order_returns_first_match() {
        let transport = ScriptedTransport::with(vec![Ok(Some(orders_body(&[42, 43])))]);
        let gateway = gateway(transport.clone());

        let order = gateway.find_order("42").await.unwrap().unwrap();

        assert_eq!(order.id, 42);
        assert_eq!(
            transport.calls(),
            vec![("/orders".to_string(), "filter[ids][0]=42".to_string())]
        );
    }

    #[tokio::test]
    async fn test_find_order_absent_when_list_empty() {
        let transport = ScriptedTransport::with(vec![Ok(Some(json!({ "orders": [] })))]);
        assert!(gateway(transport).find_order(" 7 ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_order_rejects_non_numeric_id_locally() {
        let transport = ScriptedTransport::with(vec![]);
        let gateway = gateway(transport.clone());

        for raw in ["abc", "", "1.5", "0", "-3"] {
            let err = gateway.find_order(raw).await.unwrap_err();
            assert!(matches!(err, GatewayError::InvalidArgument(_)), "{raw}");
        }
        // Aucune requête envoyée
        assert!(transport.calls().is_empty());
    }

    // Test critique: toutes les opérations échouent sur un corps vide
    #[tokio::test]
    async fn test_every_operation_fails_on_empty_body() {
        let transport = ScriptedTransport::with(vec![
            Ok(None),
            Ok(Some(Value::Null)),
            Ok(None),
            Ok(None),
            Ok(None),
        ]);
        let gateway = gateway(transport.clone());

        let results = vec![
            gateway.orders(None).await.map(|_| ()),
            gateway.find_order("1").await.map(|_| ()),
            gateway.order_statuses().await.map(|_| ()),
            gateway.product_statuses().await.map(|_| ()),
            gateway.delivery_types().await.map(|_| ()),
        ];

        for result in results {
            assert!(matches!(
                result,
                Err(GatewayError::Upstream(UpstreamError::EmptyResponse { .. }))
            ));
        }
        assert_eq!(transport.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_reference_object_values_keep_upstream_order() {
        let transport = ScriptedTransport::with(vec![Ok(Some(json!({
            "success": true,
            "statuses": {
                "new": { "code": "new", "name": "New", "active": true, "group": "new" },
                "assembling": { "code": "assembling", "name": "Assembling", "ordering": 20 },
                "complete": { "code": "complete", "name": "Complete", "color": "#00ff00" }
            }
        })))]);
        let gateway = gateway(transport.clone());

        let statuses = gateway.order_statuses().await.unwrap();

        let codes: Vec<_> = statuses.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, ["new", "assembling", "complete"]);
        assert_eq!(statuses[0].group.as_deref(), Some("new"));
        assert_eq!(statuses[2].attributes["color"], json!("#00ff00"));
        assert_eq!(transport.calls()[0].0, "/reference/statuses");
    }

    #[tokio::test]
    async fn test_reference_endpoints_and_properties() {
        let transport = ScriptedTransport::with(vec![
            Ok(Some(json!({ "productStatuses": [{ "code": "in-stock", "name": "In stock" }] }))),
            Ok(Some(json!({ "deliveryTypes": { "courier": { "code": "courier", "name": "Courier" } } }))),
        ]);
        let gateway = gateway(transport.clone());

        let products = gateway.product_statuses().await.unwrap();
        let deliveries = gateway.delivery_types().await.unwrap();

        assert_eq!(products[0].code, "in-stock");
        assert_eq!(deliveries[0].name, "Courier");
        let paths: Vec<_> = transport.calls().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            ["/reference/product-statuses", "/reference/delivery-types"]
        );
    }

    #[tokio::test]
    async fn test_reference_missing_property_is_decode_error() {
        let transport = ScriptedTransport::with(vec![Ok(Some(json!({ "success": true })))]);
        let err = gateway(transport).delivery_types().await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Upstream(UpstreamError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let transport = ScriptedTransport::with(vec![Err(UpstreamError::Transport(
            "timed out".into(),
        ))]);
        let err = gateway(transport).orders(None).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    // Test critique: une requête en échec libère sa place
    #[tokio::test]
    async fn test_failed_request_releases_its_slot() {
        let transport = ScriptedTransport::with(vec![
            Err(UpstreamError::Transport("connection reset".into())),
            Ok(Some(orders_body(&[5]))),
        ]);
        let gateway = RetailGateway::new(transport.clone(), 1).unwrap();

        assert!(gateway.orders(None).await.is_err());
        assert_eq!(gateway.limiter().in_flight(), 0);

        let page = tokio::time::timeout(Duration::from_secs(1), gateway.orders(None))
            .await
            .expect("second request should be admitted")
            .unwrap();

        assert_eq!(page.orders[0].id, 5);
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(gateway.limiter().in_flight(), 0);
    }

    #[test]
    fn test_failure_outcome_labels() {
        let decode = UpstreamError::Decode {
            endpoint: "/orders".into(),
            message: "expected value".into(),
        };
        let status = UpstreamError::Status {
            endpoint: "/orders".into(),
            status: 503,
            message: "Service Unavailable".into(),
        };

        assert_eq!(failure_outcome(&decode), "decode");
        assert_eq!(failure_outcome(&status), "status");
        assert_eq!(failure_outcome(&UpstreamError::Transport("reset".into())), "transport");
    }

    #[test]
    fn test_zero_concurrency_is_config_error() {
        let transport = ScriptedTransport::with(vec![]);
        assert!(matches!(
            RetailGateway::new(transport, 0),
            Err(GatewayError::Config(_))
        ));
    }

    /// Sleeps on every request and tracks peak concurrency.
    #[derive(Default)]
    struct SlowTransport {
        active: AtomicUsize,
        peak: AtomicUsize,
        served: AtomicUsize,
    }

    #[async_trait]
    impl CrmTransport for SlowTransport {
        async fn get(&self, _path: &str, _query: &str) -> UpstreamResult<Option<Value>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.served.fetch_add(1, Ordering::SeqCst);
            Ok(Some(json!({ "orders": [], "statuses": [] })))
        }
    }

    // Test critique: la limite s'applique à toutes les opérations confondues
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_limit_shared_across_operations() {
        let transport = Arc::new(SlowTransport::default());
        let gateway = Arc::new(RetailGateway::new(transport.clone(), 2).unwrap());

        let tasks: Vec<_> = (0..12)
            .map(|i| {
                let gateway = gateway.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        gateway.find_order("1").await.map(|_| ())
                    } else {
                        gateway.order_statuses().await.map(|_| ())
                    }
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(transport.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(transport.served.load(Ordering::SeqCst), 12);
        assert_eq!(gateway.limiter().in_flight(), 0);
    }
}
