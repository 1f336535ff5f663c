//! Stock API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::core::ServerState;
use crate::db::models::StockStatus;
use crate::db::repository::ProductRepository;
use crate::utils::{AppError, AppResult};

/// Point-in-time view of one product's ledger.
#[derive(Serialize)]
pub struct StockSnapshot {
    pub product_id: String,
    pub quantity: i32,
    pub reserved: i32,
    pub available: i32,
    pub status: StockStatus,
    pub track_quantity: bool,
    pub active_reservations: usize,
}

/// GET /api/stock/{product_id}
pub async fn snapshot(
    State(state): State<ServerState>,
    Path(product_id): Path<String>,
) -> AppResult<Json<StockSnapshot>> {
    let repo = ProductRepository::new(state.db.clone());
    let product = repo
        .find_by_id(&product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))?;

    let stock = &product.stock;
    Ok(Json(StockSnapshot {
        product_id: product.id_string(),
        quantity: stock.quantity,
        reserved: stock.reserved,
        available: stock.available(),
        status: stock.status_label(),
        track_quantity: stock.track_quantity,
        active_reservations: stock.reservations.len(),
    }))
}
