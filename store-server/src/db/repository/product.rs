//! Product Repository
//!
//! Holds the one concurrency-control primitive in the system:
//! [`ProductRepository::cas_stock`], a predicate-qualified UPDATE that
//! succeeds only when `stock_version` still matches. A single SurrealQL
//! statement executes as one transaction, so the version check and the
//! stock write are atomic with respect to every other writer.

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{Product, ProductCreate, Stock};
use crate::utils::now_millis;
use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const PRODUCT_TABLE: &str = "product";

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub fn record_id(id: &str) -> RecordId {
        record_id(PRODUCT_TABLE, id)
    }

    /// Find all active products
    pub async fn find_all(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product WHERE is_active = true ORDER BY name")
            .await?
            .take(0)?;
        Ok(products)
    }

    /// Find product by id (accepts "product:xyz" or a bare key)
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        let product: Option<Product> = self.base.db().select(Self::record_id(id)).await?;
        Ok(product)
    }

    /// Create a new product
    pub async fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        if data.quantity < 0 {
            return Err(RepoError::Validation("quantity cannot be negative".into()));
        }

        let mut stock = Stock::new(data.quantity);
        stock.track_quantity = data.track_quantity.unwrap_or(true);
        stock.low_stock_threshold = data.low_stock_threshold.unwrap_or(0);
        stock.variants = data.variants.unwrap_or_default();

        let product = Product {
            id: None,
            name: data.name,
            sku: data.sku,
            description: data.description,
            price: data.price,
            is_active: true,
            stock,
            stock_version: 0,
            created_at: now_millis(),
        };

        let created: Option<Product> = self
            .base
            .db()
            .create(PRODUCT_TABLE)
            .content(product)
            .await?;
        created.ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }

    /// Conditionally replace a product's stock record.
    ///
    /// The write applies only if `stock_version` still equals `expected`;
    /// returns `None` when another writer got there first (or the record
    /// is gone) — the caller re-reads and re-evaluates its precondition.
    pub async fn cas_stock(
        &self,
        id: &RecordId,
        expected: i64,
        stock: Stock,
    ) -> RepoResult<Option<Product>> {
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $id SET stock = $stock, stock_version = $next \
                 WHERE stock_version = $expected RETURN AFTER",
            )
            .bind(("id", id.clone()))
            .bind(("stock", stock))
            .bind(("next", expected + 1))
            .bind(("expected", expected))
            .await?;
        let products: Vec<Product> = result.take(0)?;
        Ok(products.into_iter().next())
    }

    /// Unconditional physical restock, used when a cancelled order puts
    /// sold units back on the shelf. Those units are no longer tracked as
    /// reserved, so no availability predicate applies — but the version
    /// still bumps so concurrent conditional writers re-read.
    pub async fn restock(&self, id: &RecordId, quantity: i32) -> RepoResult<Product> {
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $id SET stock.quantity += $qty, stock_version += 1 \
                 RETURN AFTER",
            )
            .bind(("id", id.clone()))
            .bind(("qty", quantity))
            .await?;
        let products: Vec<Product> = result.take(0)?;
        products
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))
    }

    /// Products holding at least one reservation past its expiry.
    pub async fn find_with_expired_reservations(&self, now: i64) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query(
                "SELECT * FROM product \
                 WHERE stock.track_quantity = true \
                 AND count(stock.reservations[WHERE expires_at < $now]) > 0",
            )
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(products)
    }
}
