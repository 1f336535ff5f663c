//! Unified Error Handling
//!
//! Application-wide error type, response envelope, and conversions from
//! the domain error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::db::repository::RepoError;
use crate::orders::OrderError;
use crate::stock::StockError;

/// Unified API response structure
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Business Logic Errors ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    // ========== System Errors ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Not found (404)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.as_str()),

            // Conflict (409)
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E0004", msg.as_str()),

            // Validation / business failure (400)
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9002", "Database error")
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9001", "Internal server error")
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        });

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type AppResult<T> = Result<T, AppError>;

// ========== Conversions from domain error types ==========

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<StockError> for AppError {
    fn from(e: StockError) -> Self {
        match e {
            StockError::ProductNotFound(_) | StockError::VariantNotFound { .. } => {
                AppError::NotFound(e.to_string())
            }
            StockError::InsufficientStock { .. }
            | StockError::InsufficientReservedStock { .. }
            | StockError::ReservationNotFound { .. }
            | StockError::InvalidQuantity(_)
            | StockError::BatchFailed { .. } => AppError::Validation(e.to_string()),
            StockError::Contention { .. } => AppError::Conflict(e.to_string()),
            StockError::Repo(r) => r.into(),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::UserNotFound(_)
            | OrderError::ProductNotFound(_)
            | OrderError::OrderNotFound(_) => AppError::NotFound(e.to_string()),
            OrderError::InsufficientStock { .. }
            | OrderError::InvalidQuantity { .. }
            | OrderError::ReservationFailed { .. }
            | OrderError::PaymentFailed { .. }
            | OrderError::NotCancellable { .. }
            | OrderError::InvalidTransition { .. } => AppError::Validation(e.to_string()),
            OrderError::Stock(s) => s.into(),
            OrderError::Repo(r) => r.into(),
        }
    }
}

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}
