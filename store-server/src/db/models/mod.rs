//! Data models
//!
//! Documents persisted in SurrealDB plus their embedded values and the
//! API request payloads that create them.

pub mod order;
pub mod product;
pub mod serde_helpers;
pub mod user;

pub use order::{
    FulfillmentStatus, Order, OrderCreate, OrderItem, OrderItemInput, OrderMetadata, OrderStatus,
    PaymentInfo, PaymentStatus, ShippingAddress, ShippingInfo, ShippingMethod, StatusHistoryEntry,
};
pub use product::{Product, ProductCreate, Reservation, Stock, StockStatus, VariantStock};
pub use user::{User, UserCreate};
