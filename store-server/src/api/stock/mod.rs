//! Stock API module

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/stock/{product_id}", get(handler::snapshot))
}
