//! Server lifecycle errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result type for server startup and shutdown paths
pub type Result<T> = std::result::Result<T, ServerError>;
