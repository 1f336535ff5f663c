//! Order API module
//!
//! Checkout and lifecycle management. All mutations go through the
//! order service; handlers never touch the stock ledger directly.

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", order_routes())
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", patch(handler::update_status))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/user/{user_id}", get(handler::list_by_user))
}
