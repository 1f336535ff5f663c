//! Shared utilities: error envelope, logging, time helpers

pub mod error;
pub mod logger;

pub use error::{AppError, AppResponse, AppResult, ok};

/// Current time as unix milliseconds.
///
/// All persisted timestamps in this service use this representation.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
