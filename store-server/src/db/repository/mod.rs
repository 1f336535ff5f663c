//! Repository Module
//!
//! CRUD and conditional-update operations over the embedded SurrealDB
//! tables. Repositories own all SurrealQL; business rules live in the
//! service layer.

pub mod order;
pub mod product;
pub mod sequence;
pub mod user;

pub use order::OrderRepository;
pub use product::ProductRepository;
pub use sequence::OrderSequenceRepository;
pub use user::UserRepository;

use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Build a [`RecordId`] from either the "table:id" form or a bare key.
pub fn record_id(table: &str, id: &str) -> RecordId {
    if id.contains(':')
        && let Ok(parsed) = id.parse::<RecordId>()
    {
        return parsed;
    }
    RecordId::from_table_key(table, id)
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
