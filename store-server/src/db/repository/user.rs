//! User Repository

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{User, UserCreate};
use crate::utils::now_millis;
use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const USER_TABLE: &str = "user";

#[derive(Clone)]
pub struct UserRepository {
    base: BaseRepository,
}

impl UserRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub fn record_id(id: &str) -> RecordId {
        record_id(USER_TABLE, id)
    }

    /// Find user by id (accepts "user:xyz" or a bare key)
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        let user: Option<User> = self.base.db().select(Self::record_id(id)).await?;
        Ok(user)
    }

    /// Create a new user record
    pub async fn create(&self, data: UserCreate) -> RepoResult<User> {
        let user = User {
            id: None,
            email: data.email,
            name: data.name,
            is_active: true,
            created_at: now_millis(),
        };
        let created: Option<User> = self.base.db().create(USER_TABLE).content(user).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create user".to_string()))
    }
}
