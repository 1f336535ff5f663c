//! Order model
//!
//! Orders snapshot product name/price at creation time and never re-read
//! them afterwards. `status` and `status_history` are written only by the
//! order service's transition function.

use super::serde_helpers;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use surrealdb::RecordId;

// =============================================================================
// Status enums
// =============================================================================

/// Order lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    PaymentFailed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::PaymentFailed => "payment_failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Fulfillment state mirrored from the order status on
/// processing/shipped/delivered transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    Standard,
    Express,
    Overnight,
    Pickup,
}

// =============================================================================
// Embedded values
// =============================================================================

/// One entry of the append-only status log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: i64,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
}

/// Line item with price and name snapshotted at order creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(with = "serde_helpers::record_id")]
    pub product: RecordId,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
    pub variant_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: String,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub reference: Option<String>,
    pub refunded_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub method: ShippingMethod,
    pub status: FulfillmentStatus,
    pub estimated_delivery: i64,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub address: ShippingAddress,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderMetadata {
    /// Links the order back to the reservation batch that backed it.
    pub stock_reservation_id: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    pub order_number: String,
    #[serde(with = "serde_helpers::record_id")]
    pub user: RecordId,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub payment: PaymentInfo,
    pub shipping: ShippingInfo,
    #[serde(default)]
    pub metadata: OrderMetadata,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

// =============================================================================
// API request types
// =============================================================================

/// One requested line of a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: String,
    pub quantity: i32,
    pub variant_id: Option<String>,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub user_id: String,
    pub items: Vec<OrderItemInput>,
    pub shipping_address: ShippingAddress,
    pub payment_method_id: String,
    pub shipping_method: ShippingMethod,
    pub notes: Option<String>,
}
