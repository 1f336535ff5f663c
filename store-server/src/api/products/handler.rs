//! Product API handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::models::{Product, ProductCreate};
use crate::db::repository::ProductRepository;
use crate::utils::{AppError, AppResult};

/// GET /api/products - list active products
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Product>>> {
    let repo = ProductRepository::new(state.db.clone());
    let products = repo.find_all().await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let repo = ProductRepository::new(state.db.clone());
    let product = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;
    Ok(Json(product))
}

/// POST /api/products
pub async fn create(
    State(state): State<ServerState>,
    Json(data): Json<ProductCreate>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let repo = ProductRepository::new(state.db.clone());
    let product = repo.create(data).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Deserialize)]
pub struct RestockRequest {
    pub quantity: i32,
}

/// POST /api/products/{id}/restock - add received units to the shelf
pub async fn restock(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> AppResult<Json<Product>> {
    if req.quantity <= 0 {
        return Err(AppError::Validation(format!(
            "restock quantity must be positive, got {}",
            req.quantity
        )));
    }
    let repo = ProductRepository::new(state.db.clone());
    let product = repo
        .restock(&ProductRepository::record_id(&id), req.quantity)
        .await?;
    Ok(Json(product))
}
