//! Domain models mirroring the retail CRM's REST representations.
//!
//! Only the fields the gateway or its callers read are typed. Everything
//! else the CRM sends is kept verbatim in `attributes`, so nothing is lost
//! on the way through.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Orders
// =============================================================================

/// A CRM order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Internal CRM identifier.
    pub id: i64,
    /// Human-facing order number (e.g. "1042A").
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    /// Status code (see the `statuses` reference).
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub order_method: Option<String>,
    /// Store code the order belongs to.
    #[serde(default)]
    pub site: Option<String>,
    /// Creation time as sent by the CRM (`Y-m-d H:i:s`).
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Sum of items, before discounts and delivery.
    #[serde(default)]
    pub summ: Option<f64>,
    /// Total order amount.
    #[serde(default)]
    pub total_summ: Option<f64>,
    #[serde(default)]
    pub delivery: Option<OrderDelivery>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Untyped upstream fields.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Delivery block of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDelivery {
    /// Delivery type code (see the `deliveryTypes` reference).
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub address: Option<DeliveryAddress>,
}

/// Delivery address. The CRM always provides a free-text rendition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    #[serde(default)]
    pub text: Option<String>,
}

/// A line item of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    /// Product status code (see the `productStatuses` reference).
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub initial_price: Option<f64>,
    #[serde(default)]
    pub offer: Option<Offer>,
}

/// Catalog offer referenced by an order item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub article: Option<String>,
}

// =============================================================================
// Pagination
// =============================================================================

/// Pagination block returned with list endpoints.
///
/// Passed through as-is; the gateway never recomputes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Page size.
    pub limit: u32,
    /// Total number of matching records.
    pub total_count: u64,
    /// Current page, starting at 1.
    pub current_page: u32,
    pub total_page_count: u32,
}

/// One page of orders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrdersPage {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

// =============================================================================
// Reference data
// =============================================================================

/// Entry of a reference vocabulary (order status, product status,
/// delivery type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    /// Symbolic code used in orders.
    pub code: String,
    /// Display label.
    pub name: String,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub ordering: Option<i64>,
    /// Status group (order statuses only).
    #[serde(default)]
    pub group: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

// =============================================================================
// Filters
// =============================================================================

/// Query options for the orders collection.
///
/// Serialized into nested query parameters (`filter[ids][0]=7&page=2`).
/// `None` fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrdersFilter {
    pub filter: Option<OrderCriteria>,
    pub page: Option<u32>,
}

/// Filter criteria nested under `filter[...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderCriteria {
    pub ids: Option<Vec<i64>>,
}

impl OrdersFilter {
    /// Filter selecting a single page.
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }

    /// Filter selecting orders by internal identifier.
    pub fn by_ids(ids: Vec<i64>) -> Self {
        Self {
            filter: Some(OrderCriteria { ids: Some(ids) }),
            ..Default::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
