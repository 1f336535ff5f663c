//! Order orchestration errors

use crate::db::models::OrderStatus;
use crate::db::repository::RepoError;
use crate::stock::{BatchFailure, StockError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("insufficient stock for {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: String,
        available: i32,
        requested: i32,
    },

    #[error("invalid quantity {quantity} for {product_id}")]
    InvalidQuantity { product_id: String, quantity: i32 },

    #[error("stock reservation failed for {} item(s)", .failures.len())]
    ReservationFailed { failures: Vec<BatchFailure> },

    #[error("payment failed for order {order_number}")]
    PaymentFailed {
        order_id: String,
        order_number: String,
    },

    #[error("order cannot be cancelled from status {current}")]
    NotCancellable { current: OrderStatus },

    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}
