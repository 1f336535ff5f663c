//! Order Repository
//!
//! Status and history writes are targeted SET queries rather than whole
//! document replacement: `status_history += $entry` keeps the log
//! append-only at the storage level.

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{Order, OrderStatus, PaymentInfo, ShippingInfo, StatusHistoryEntry};
use crate::utils::now_millis;
use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const ORDER_TABLE: &str = "order";

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub fn record_id(id: &str) -> RecordId {
        record_id(ORDER_TABLE, id)
    }

    /// Persist a new order
    pub async fn create(&self, order: Order) -> RepoResult<Order> {
        let created: Option<Order> = self.base.db().create(ORDER_TABLE).content(order).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Find order by id (accepts "order:xyz" or a bare key)
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let order: Option<Order> = self.base.db().select(Self::record_id(id)).await?;
        Ok(order)
    }

    /// List orders, newest first
    pub async fn find_all(&self, limit: i64, offset: i64) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM order ORDER BY created_at DESC LIMIT $limit START $offset")
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// List a user's orders, newest first
    pub async fn find_by_user(&self, user: &RecordId, limit: i64, offset: i64) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query(
                "SELECT * FROM order WHERE user = $user \
                 ORDER BY created_at DESC LIMIT $limit START $offset",
            )
            .bind(("user", user.clone()))
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Write a status transition: new status plus exactly one appended
    /// history entry, in one statement.
    pub async fn update_status(
        &self,
        id: &RecordId,
        status: OrderStatus,
        entry: StatusHistoryEntry,
    ) -> RepoResult<Order> {
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $id SET status = $status, status_history += $entry, \
                 updated_at = $ts RETURN AFTER",
            )
            .bind(("id", id.clone()))
            .bind(("status", status))
            .bind(("entry", entry))
            .bind(("ts", now_millis()))
            .await?;
        let orders: Vec<Order> = result.take(0)?;
        orders
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", id)))
    }

    /// Replace the payment block
    pub async fn update_payment(&self, id: &RecordId, payment: PaymentInfo) -> RepoResult<Order> {
        let mut result = self
            .base
            .db()
            .query("UPDATE $id SET payment = $payment, updated_at = $ts RETURN AFTER")
            .bind(("id", id.clone()))
            .bind(("payment", payment))
            .bind(("ts", now_millis()))
            .await?;
        let orders: Vec<Order> = result.take(0)?;
        orders
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", id)))
    }

    /// Replace the shipping block
    pub async fn update_shipping(&self, id: &RecordId, shipping: ShippingInfo) -> RepoResult<Order> {
        let mut result = self
            .base
            .db()
            .query("UPDATE $id SET shipping = $shipping, updated_at = $ts RETURN AFTER")
            .bind(("id", id.clone()))
            .bind(("shipping", shipping))
            .bind(("ts", now_millis()))
            .await?;
        let orders: Vec<Order> = result.take(0)?;
        orders
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", id)))
    }
}
