//! API routes
//!
//! - [`health`] - liveness and component checks
//! - [`products`] - catalog management
//! - [`stock`] - stock snapshot queries
//! - [`orders`] - checkout and order lifecycle

pub mod health;
pub mod orders;
pub mod products;
pub mod stock;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

use crate::core::ServerState;
use axum::Router;

/// Build the Axum router (without state)
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(products::router())
        .merge(stock::router())
        .merge(orders::router())
}
