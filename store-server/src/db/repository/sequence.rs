//! Daily order-number sequence
//!
//! One record per calendar day, incremented with a single UPSERT so two
//! orders created in the same instant can never read the same value.
//! (Counting existing orders for the day would race.)

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const SEQUENCE_TABLE: &str = "order_sequence";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SequenceRecord {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    id: Option<RecordId>,
    day: String,
    value: i64,
}

#[derive(Clone)]
pub struct OrderSequenceRepository {
    base: BaseRepository,
}

impl OrderSequenceRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Atomically claim the next sequence number for `day` (YYMMDD).
    pub async fn next(&self, day: &str) -> RepoResult<i64> {
        let mut result = self
            .base
            .db()
            .query(
                "UPSERT type::thing($tb, $day) \
                 SET day = $day, value = (value ?? 0) + 1 RETURN AFTER",
            )
            .bind(("tb", SEQUENCE_TABLE))
            .bind(("day", day.to_string()))
            .await?;
        let records: Vec<SequenceRecord> = result.take(0)?;
        records
            .into_iter()
            .next()
            .map(|r| r.value)
            .ok_or_else(|| RepoError::Database("Failed to advance order sequence".to_string()))
    }
}
