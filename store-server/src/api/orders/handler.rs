//! Order API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::models::{Order, OrderCreate, OrderStatus};
use crate::orders::{CancelOutcome, CheckoutResult};
use crate::utils::AppResult;

fn default_limit() -> i64 {
    50
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// POST /api/orders - run the full checkout
pub async fn create(
    State(state): State<ServerState>,
    Json(data): Json<OrderCreate>,
) -> AppResult<(StatusCode, Json<CheckoutResult>)> {
    let service = state.order_service();
    let result = service.create_order(data).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/orders - list orders, newest first
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let service = state.order_service();
    let orders = service.list_orders(query.limit, query.offset).await?;
    Ok(Json(orders))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let service = state.order_service();
    let order = service.get_order(&id).await?;
    Ok(Json(order))
}

/// GET /api/orders/user/{user_id}
pub async fn list_by_user(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let service = state.order_service();
    let orders = service
        .list_user_orders(&user_id, query.limit, query.offset)
        .await?;
    Ok(Json(orders))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
}

/// PATCH /api/orders/{id}/status
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<Order>> {
    let service = state.order_service();
    let order = service
        .update_status(&id, req.status, req.notes.as_deref(), req.updated_by.as_deref())
        .await?;
    Ok(Json(order))
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    pub updated_by: Option<String>,
}

/// POST /api/orders/{id}/cancel
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    req: Option<Json<CancelRequest>>,
) -> AppResult<Json<CancelOutcome>> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let service = state.order_service();
    let outcome = service.cancel_order(&id, req.updated_by.as_deref()).await?;
    Ok(Json(outcome))
}
