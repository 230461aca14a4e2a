//! GraphQL schema definition.
//!
//! This module exposes the order and reference lookups of the retail
//! gateway. Resolvers forward gateway results verbatim, or wrapped in a
//! pagination envelope for `getOrders`.

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Result, Schema};

use retailer_core::models::OrdersFilter;
use retailer_core::services::RetailGateway;

use crate::types::RetailSchema;

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score (DoS protection).
/// Each field has a default complexity of 1, nested objects multiply.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Build the GraphQL schema around a gateway instance.
///
/// Includes query depth and complexity limits for DoS protection.
pub fn build_schema(gateway: Arc<RetailGateway>) -> RetailSchema {
    Schema::build(RetailQuery, EmptyMutation, EmptySubscription)
        .data(gateway)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

// -----------------------------------------------------------------------------
// Query Root
// -----------------------------------------------------------------------------

/// Query root: orders and reference vocabularies.
#[derive(Default)]
pub struct RetailQuery;

#[Object]
impl RetailQuery {
    /// Get an order by its CRM identifier.
    async fn order<'ctx>(&self, ctx: &Context<'ctx>, number: String) -> Result<Option<Order>> {
        let gateway = ctx.data::<Arc<RetailGateway>>()?;

        let order = gateway.find_order(&number).await?;
        Ok(order.map(Order::from))
    }

    /// List orders, one CRM page at a time.
    async fn get_orders<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        page: Option<i32>,
    ) -> Result<OrdersResponse> {
        let gateway = ctx.data::<Arc<RetailGateway>>()?;

        let filter = match validate_page(page)? {
            Some(page) => OrdersFilter::page(page),
            None => OrdersFilter::default(),
        };

        let page = gateway.orders(Some(&filter)).await?;

        Ok(OrdersResponse {
            orders: page.orders.into_iter().map(Order::from).collect(),
            pagination: page.pagination.into(),
        })
    }

    /// Order status vocabulary.
    async fn order_statuses<'ctx>(&self, ctx: &Context<'ctx>) -> Result<Vec<ReferenceEntry>> {
        let gateway = ctx.data::<Arc<RetailGateway>>()?;

        let entries = gateway.order_statuses().await?;
        Ok(entries.into_iter().map(ReferenceEntry::from).collect())
    }

    /// Order item status vocabulary.
    async fn product_statuses<'ctx>(&self, ctx: &Context<'ctx>) -> Result<Vec<ReferenceEntry>> {
        let gateway = ctx.data::<Arc<RetailGateway>>()?;

        let entries = gateway.product_statuses().await?;
        Ok(entries.into_iter().map(ReferenceEntry::from).collect())
    }

    /// Delivery type vocabulary.
    async fn delivery_types<'ctx>(&self, ctx: &Context<'ctx>) -> Result<Vec<ReferenceEntry>> {
        let gateway = ctx.data::<Arc<RetailGateway>>()?;

        let entries = gateway.delivery_types().await?;
        Ok(entries.into_iter().map(ReferenceEntry::from).collect())
    }
}

// -----------------------------------------------------------------------------
// GraphQL Types
// -----------------------------------------------------------------------------

/// Order type.
#[derive(async_graphql::SimpleObject)]
pub struct Order {
    pub id: i64,
    pub number: Option<String>,
    pub external_id: Option<String>,
    pub status: Option<String>,
    pub order_type: Option<String>,
    pub order_method: Option<String>,
    pub site: Option<String>,
    pub created_at: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub summ: Option<f64>,
    pub total_summ: Option<f64>,
    pub delivery: Option<OrderDelivery>,
    pub items: Vec<OrderItem>,
    /// Remaining CRM fields, untouched.
    pub attributes: serde_json::Value,
}

impl From<retailer_core::models::Order> for Order {
    fn from(o: retailer_core::models::Order) -> Self {
        Self {
            id: o.id,
            number: o.number,
            external_id: o.external_id,
            status: o.status,
            order_type: o.order_type,
            order_method: o.order_method,
            site: o.site,
            created_at: o.created_at,
            first_name: o.first_name,
            last_name: o.last_name,
            phone: o.phone,
            email: o.email,
            summ: o.summ,
            total_summ: o.total_summ,
            delivery: o.delivery.map(OrderDelivery::from),
            items: o.items.into_iter().map(OrderItem::from).collect(),
            attributes: serde_json::Value::Object(o.attributes),
        }
    }
}

/// Delivery block of an order.
#[derive(async_graphql::SimpleObject)]
pub struct OrderDelivery {
    pub code: Option<String>,
    pub cost: Option<f64>,
    /// Free-text address.
    pub address: Option<String>,
}

impl From<retailer_core::models::OrderDelivery> for OrderDelivery {
    fn from(d: retailer_core::models::OrderDelivery) -> Self {
        Self {
            code: d.code,
            cost: d.cost,
            address: d.address.and_then(|a| a.text),
        }
    }
}

/// Order line item.
#[derive(async_graphql::SimpleObject)]
pub struct OrderItem {
    pub id: i64,
    pub status: Option<String>,
    pub quantity: Option<f64>,
    pub initial_price: Option<f64>,
    pub offer: Option<Offer>,
}

impl From<retailer_core::models::OrderItem> for OrderItem {
    fn from(i: retailer_core::models::OrderItem) -> Self {
        Self {
            id: i.id,
            status: i.status,
            quantity: i.quantity,
            initial_price: i.initial_price,
            offer: i.offer.map(|o| Offer {
                id: o.id,
                external_id: o.external_id,
                name: o.name,
                article: o.article,
            }),
        }
    }
}

/// Catalog offer.
#[derive(async_graphql::SimpleObject)]
pub struct Offer {
    pub id: Option<i64>,
    pub external_id: Option<String>,
    pub name: Option<String>,
    pub article: Option<String>,
}

/// Upstream pagination block.
#[derive(async_graphql::SimpleObject)]
pub struct Pagination {
    pub limit: i32,
    pub total_count: i64,
    pub current_page: i32,
    pub total_page_count: i32,
}

impl From<retailer_core::models::Pagination> for Pagination {
    fn from(p: retailer_core::models::Pagination) -> Self {
        Self {
            limit: saturate_i32(p.limit),
            total_count: i64::try_from(p.total_count).unwrap_or(i64::MAX),
            current_page: saturate_i32(p.current_page),
            total_page_count: saturate_i32(p.total_page_count),
        }
    }
}

// GraphQL `Int` is 32-bit; out-of-range counts clamp instead of wrapping.
fn saturate_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// A page of orders with its pagination block.
#[derive(async_graphql::SimpleObject)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

/// Reference vocabulary entry.
#[derive(async_graphql::SimpleObject)]
pub struct ReferenceEntry {
    pub code: String,
    pub name: String,
    pub active: Option<bool>,
    pub ordering: Option<i64>,
    pub group: Option<String>,
    pub attributes: serde_json::Value,
}

impl From<retailer_core::models::ReferenceEntry> for ReferenceEntry {
    fn from(e: retailer_core::models::ReferenceEntry) -> Self {
        Self {
            code: e.code,
            name: e.name,
            active: e.active,
            ordering: e.ordering,
            group: e.group,
            attributes: serde_json::Value::Object(e.attributes),
        }
    }
}

// -----------------------------------------------------------------------------
// Helpers & Validation
// -----------------------------------------------------------------------------

/// Map the optional `page` argument to a CRM page number.
///
/// A missing or zero page means "first page" and sends no `page` parameter.
fn validate_page(page: Option<i32>) -> Result<Option<u32>> {
    match page {
        None | Some(0) => Ok(None),
        Some(p) if p < 0 => Err(async_graphql::Error::new(format!(
            "page must be positive, got {}",
            p
        ))),
        Some(p) => Ok(Some(p as u32)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use retailer_core::error::UpstreamResult;
    use retailer_core::ports::CrmTransport;

    /// Canned CRM: answers by path, remembers query strings.
    #[derive(Default)]
    struct CannedCrm {
        empty: bool,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CrmTransport for CannedCrm {
        async fn get(&self, path: &str, query: &str) -> UpstreamResult<Option<Value>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.empty {
                return Ok(None);
            }

            let body = match (path, query) {
                ("/orders", "filter[ids][0]=404") => json!({ "orders": [] }),
                ("/orders", _) => json!({
                    "orders": [{
                        "id": 42,
                        "number": "42A",
                        "totalSumm": 990.0,
                        "customerComment": "leave at the door",
                        "delivery": { "code": "courier", "address": { "text": "Main st. 1" } },
                        "items": [{ "id": 1, "quantity": 2, "offer": { "name": "Mug" } }]
                    }],
                    "pagination": { "limit": 20, "totalCount": 21, "currentPage": 2, "totalPageCount": 2 }
                }),
                ("/reference/statuses", _) => json!({
                    "statuses": { "new": { "code": "new", "name": "New", "group": "new" } }
                }),
                ("/reference/product-statuses", _) => json!({
                    "productStatuses": [{ "code": "shipped", "name": "Shipped" }]
                }),
                ("/reference/delivery-types", _) => json!({
                    "deliveryTypes": { "courier": { "code": "courier", "name": "Courier" } }
                }),
                _ => Value::Null,
            };
            Ok(Some(body))
        }
    }

    fn schema_with(crm: Arc<CannedCrm>) -> RetailSchema {
        build_schema(Arc::new(RetailGateway::new(crm, 4).unwrap()))
    }

    #[tokio::test]
    async fn test_order_query_maps_fields() {
        let schema = schema_with(Arc::default());

        let res = schema
            .execute(
                r#"{ order(number: "42") {
                    id number totalSumm attributes
                    delivery { code address }
                    items { quantity offer { name } }
                } }"#,
            )
            .await;

        assert!(res.errors.is_empty(), "{:?}", res.errors);
        let data = res.data.into_json().unwrap();
        assert_eq!(data["order"]["number"], json!("42A"));
        assert_eq!(data["order"]["totalSumm"], json!(990.0));
        assert_eq!(data["order"]["delivery"]["address"], json!("Main st. 1"));
        assert_eq!(data["order"]["items"][0]["offer"]["name"], json!("Mug"));
        assert_eq!(
            data["order"]["attributes"]["customerComment"],
            json!("leave at the door")
        );
    }

    #[tokio::test]
    async fn test_order_not_found_is_null() {
        let res = schema_with(Arc::default())
            .execute(r#"{ order(number: "404") { id } }"#)
            .await;

        assert!(res.errors.is_empty());
        assert_eq!(res.data.into_json().unwrap()["order"], Value::Null);
    }

    #[tokio::test]
    async fn test_order_with_non_numeric_id_errors() {
        let crm = Arc::new(CannedCrm::default());
        let res = schema_with(crm.clone())
            .execute(r#"{ order(number: "abc") { id } }"#)
            .await;

        assert_eq!(res.errors.len(), 1);
        assert!(res.errors[0].message.contains("Invalid argument"));
        assert!(crm.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_orders_wraps_pagination() {
        let crm = Arc::new(CannedCrm::default());
        let schema = schema_with(crm.clone());

        let res = schema
            .execute("{ getOrders(page: 2) { orders { id } pagination { totalCount currentPage totalPageCount } } }")
            .await;
        assert!(res.errors.is_empty(), "{:?}", res.errors);
        let data = res.data.into_json().unwrap();
        assert_eq!(data["getOrders"]["orders"][0]["id"], json!(42));
        assert_eq!(data["getOrders"]["pagination"]["totalCount"], json!(21));

        schema.execute("{ getOrders { orders { id } } }").await;

        assert_eq!(*crm.queries.lock().unwrap(), vec!["page=2".to_string(), String::new()]);
    }

    #[tokio::test]
    async fn test_reference_queries() {
        let res = schema_with(Arc::default())
            .execute("{ orderStatuses { code name group } productStatuses { code } deliveryTypes { name } }")
            .await;

        assert!(res.errors.is_empty(), "{:?}", res.errors);
        let data = res.data.into_json().unwrap();
        assert_eq!(data["orderStatuses"][0]["group"], json!("new"));
        assert_eq!(data["productStatuses"][0]["code"], json!("shipped"));
        assert_eq!(data["deliveryTypes"][0]["name"], json!("Courier"));
    }

    // Test critique: un corps vide remonte comme erreur GraphQL
    #[tokio::test]
    async fn test_empty_upstream_body_surfaces_as_error() {
        let crm = Arc::new(CannedCrm {
            empty: true,
            ..Default::default()
        });
        let res = schema_with(crm)
            .execute("{ getOrders { orders { id } } }")
            .await;

        assert_eq!(res.errors.len(), 1);
        assert!(res.errors[0].message.contains("empty response"));
    }

    #[test]
    fn test_pagination_clamps_out_of_range_values() {
        let pagination = Pagination::from(retailer_core::models::Pagination {
            limit: 20,
            total_count: u64::MAX,
            current_page: u32::MAX,
            total_page_count: i32::MAX as u32 + 1,
        });

        assert_eq!(pagination.limit, 20);
        assert_eq!(pagination.total_count, i64::MAX);
        assert_eq!(pagination.current_page, i32::MAX);
        assert_eq!(pagination.total_page_count, i32::MAX);
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(None).unwrap(), None);
        // 0 = première page, sans paramètre
        assert_eq!(validate_page(Some(0)).unwrap(), None);
        assert_eq!(validate_page(Some(3)).unwrap(), Some(3));
        assert!(validate_page(Some(-1)).is_err());
    }
}
