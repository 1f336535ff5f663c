//! Reservation Engine
//!
//! Every operation follows the same discipline: read the product, check
//! the precondition, apply a pure mutation to the ledger, then write it
//! back with [`ProductRepository::cas_stock`] — a conditional update that
//! only lands if nobody else wrote in between. Losing the conditional
//! write means re-reading and re-checking, so two callers racing for the
//! last unit resolve to exactly one success and one `InsufficientStock`.
//!
//! No in-process lock is involved; the engine stays correct when the
//! server is horizontally scaled over one shared store.

use crate::db::models::{OrderItemInput, Reservation};
use crate::db::repository::{ProductRepository, RepoError};
use serde::Serialize;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Default reservation lease: 15 minutes.
pub const DEFAULT_RESERVATION_TTL_SECS: u64 = 900;

/// Upper bound on conditional-write retries per operation. Each lost race
/// corresponds to another writer landing on the same product, so this is
/// only reachable under pathological contention.
const MAX_CAS_ATTEMPTS: u32 = 128;

/// One failed line of a batch reservation.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub product_id: String,
    pub reason: String,
}

/// Stock reservation errors
#[derive(Debug, Error)]
pub enum StockError {
    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("variant {variant_id} not found on product {product_id}")]
    VariantNotFound {
        product_id: String,
        variant_id: String,
    },

    #[error("insufficient stock for {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: String,
        available: i32,
        requested: i32,
    },

    #[error("insufficient reserved stock on {product_id} for user {user_id} ({requested} units)")]
    InsufficientReservedStock {
        product_id: String,
        user_id: String,
        requested: i32,
    },

    #[error("no matching reservation on {product_id} for user {user_id}")]
    ReservationNotFound {
        product_id: String,
        user_id: String,
    },

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("stock reservation failed for {} item(s)", .failures.len())]
    BatchFailed { failures: Vec<BatchFailure> },

    #[error("conditional update contention on {product_id}")]
    Contention { product_id: String },

    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Outcome of one expired-reservation sweep.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepOutcome {
    pub products_updated: usize,
    pub total_released: i64,
}

/// Atomic reserve / confirm / release / expire over the stock ledger.
#[derive(Clone)]
pub struct ReservationEngine {
    products: ProductRepository,
    ttl_ms: i64,
}

impl ReservationEngine {
    pub fn new(db: Surreal<Db>, ttl: Duration) -> Self {
        Self {
            products: ProductRepository::new(db),
            ttl_ms: ttl.as_millis() as i64,
        }
    }

    /// Place a time-limited hold on `quantity` units.
    ///
    /// Products that do not track quantity always succeed with no ledger
    /// effect. Otherwise the availability check and the write are one
    /// atomic step from the point of view of every other caller.
    pub async fn reserve(
        &self,
        product_id: &str,
        quantity: i32,
        variant_id: Option<&str>,
        user_id: &str,
        session_id: &str,
    ) -> Result<Reservation, StockError> {
        if quantity <= 0 {
            return Err(StockError::InvalidQuantity(quantity));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let product = self
                .products
                .find_by_id(product_id)
                .await?
                .ok_or_else(|| StockError::ProductNotFound(product_id.to_string()))?;

            if !product.stock.track_quantity {
                return Ok(Reservation::new(
                    user_id,
                    session_id,
                    quantity,
                    variant_id.map(String::from),
                    self.ttl_ms,
                ));
            }

            if let Some(vid) = variant_id {
                // Open holds on this variant count against it, same as
                // `reserved` counts against the top-level quantity.
                let available = product.stock.variant_available(vid).ok_or_else(|| {
                    StockError::VariantNotFound {
                        product_id: product_id.to_string(),
                        variant_id: vid.to_string(),
                    }
                })?;
                if available < quantity {
                    return Err(StockError::InsufficientStock {
                        product_id: product_id.to_string(),
                        available,
                        requested: quantity,
                    });
                }
            }

            let available = product.stock.available();
            if available < quantity {
                return Err(StockError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested: quantity,
                });
            }

            let reservation = Reservation::new(
                user_id,
                session_id,
                quantity,
                variant_id.map(String::from),
                self.ttl_ms,
            );
            let mut next = product.stock.clone();
            next.apply_reserve(reservation.clone());

            let id = product
                .id
                .clone()
                .ok_or_else(|| RepoError::Database("product record has no id".into()))?;
            if self
                .products
                .cas_stock(&id, product.stock_version, next)
                .await?
                .is_some()
            {
                tracing::debug!(
                    product = %product_id,
                    user = %user_id,
                    quantity,
                    "stock reserved"
                );
                return Ok(reservation);
            }
            // Lost the conditional write; re-read and re-check.
        }

        Err(StockError::Contention {
            product_id: product_id.to_string(),
        })
    }

    /// Reserve every item or none of them.
    ///
    /// The store has no multi-key transaction, so a failed line triggers a
    /// compensating `release` of every reservation already made in this
    /// batch. Rollback failures are logged, never rethrown — partial
    /// cleanup must not cascade into a second failure.
    pub async fn reserve_batch(
        &self,
        items: &[OrderItemInput],
        user_id: &str,
        session_id: &str,
    ) -> Result<Vec<Reservation>, StockError> {
        let mut reserved: Vec<(&OrderItemInput, Reservation)> = Vec::with_capacity(items.len());
        let mut failures: Vec<BatchFailure> = Vec::new();

        for item in items {
            match self
                .reserve(
                    &item.product_id,
                    item.quantity,
                    item.variant_id.as_deref(),
                    user_id,
                    session_id,
                )
                .await
            {
                Ok(reservation) => reserved.push((item, reservation)),
                Err(e) => failures.push(BatchFailure {
                    product_id: item.product_id.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            return Ok(reserved.into_iter().map(|(_, r)| r).collect());
        }

        for (item, _) in &reserved {
            if let Err(e) = self
                .release(
                    &item.product_id,
                    item.quantity,
                    item.variant_id.as_deref(),
                    user_id,
                    "batch_rollback",
                )
                .await
            {
                tracing::warn!(
                    product = %item.product_id,
                    error = %e,
                    "failed to roll back batch reservation"
                );
            }
        }

        tracing::info!(
            user = %user_id,
            failed = failures.len(),
            rolled_back = reserved.len(),
            "batch reservation failed, holds released"
        );
        Err(StockError::BatchFailed { failures })
    }

    /// Convert a matching reservation into a permanent stock decrement.
    ///
    /// Irreversible through this engine; a cancelled order restores stock
    /// via a direct quantity increment instead.
    pub async fn confirm(
        &self,
        product_id: &str,
        quantity: i32,
        variant_id: Option<&str>,
        order_id: &str,
        user_id: &str,
    ) -> Result<(), StockError> {
        if quantity <= 0 {
            return Err(StockError::InvalidQuantity(quantity));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let product = self
                .products
                .find_by_id(product_id)
                .await?
                .ok_or_else(|| StockError::ProductNotFound(product_id.to_string()))?;

            if !product.stock.track_quantity {
                return Ok(());
            }

            let idx = product
                .stock
                .find_reservation(user_id, quantity, variant_id)
                .filter(|_| product.stock.reserved >= quantity)
                .ok_or_else(|| StockError::InsufficientReservedStock {
                    product_id: product_id.to_string(),
                    user_id: user_id.to_string(),
                    requested: quantity,
                })?;

            let mut next = product.stock.clone();
            next.apply_confirm(idx);

            let id = product
                .id
                .clone()
                .ok_or_else(|| RepoError::Database("product record has no id".into()))?;
            if self
                .products
                .cas_stock(&id, product.stock_version, next)
                .await?
                .is_some()
            {
                tracing::info!(
                    product = %product_id,
                    order = %order_id,
                    quantity,
                    "reservation confirmed, stock decremented"
                );
                return Ok(());
            }
        }

        Err(StockError::Contention {
            product_id: product_id.to_string(),
        })
    }

    /// Cancel a matching reservation, returning its units to available
    /// stock without a sale.
    pub async fn release(
        &self,
        product_id: &str,
        quantity: i32,
        variant_id: Option<&str>,
        user_id: &str,
        reason: &str,
    ) -> Result<(), StockError> {
        if quantity <= 0 {
            return Err(StockError::InvalidQuantity(quantity));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let product = self
                .products
                .find_by_id(product_id)
                .await?
                .ok_or_else(|| StockError::ProductNotFound(product_id.to_string()))?;

            if !product.stock.track_quantity {
                return Ok(());
            }

            let idx = product
                .stock
                .find_reservation(user_id, quantity, variant_id)
                .ok_or_else(|| StockError::ReservationNotFound {
                    product_id: product_id.to_string(),
                    user_id: user_id.to_string(),
                })?;

            let mut next = product.stock.clone();
            next.apply_release(idx);

            let id = product
                .id
                .clone()
                .ok_or_else(|| RepoError::Database("product record has no id".into()))?;
            if self
                .products
                .cas_stock(&id, product.stock_version, next)
                .await?
                .is_some()
            {
                tracing::info!(
                    product = %product_id,
                    user = %user_id,
                    quantity,
                    reason = %reason,
                    "reservation released"
                );
                return Ok(());
            }
        }

        Err(StockError::Contention {
            product_id: product_id.to_string(),
        })
    }

    /// Release every reservation past its expiry.
    ///
    /// One conditional write per affected product (not one per
    /// reservation) to keep write contention down. Only entries matched by
    /// expiry are ever removed, so this is safe to run concurrently with
    /// reserve/confirm/release.
    pub async fn cleanup_expired(&self) -> Result<SweepOutcome, StockError> {
        let now = crate::utils::now_millis();
        let candidates = self.products.find_with_expired_reservations(now).await?;

        let mut outcome = SweepOutcome::default();
        'products: for candidate in candidates {
            let Some(id) = candidate.id.clone() else {
                continue;
            };
            let product_id = candidate.id_string();

            for _ in 0..MAX_CAS_ATTEMPTS {
                // Re-read on every attempt: the set of expired entries may
                // have changed since the candidate scan.
                let Some(product) = self.products.find_by_id(&product_id).await? else {
                    continue 'products;
                };
                let mut next = product.stock.clone();
                let released = next.take_expired(now);
                if released == 0 {
                    continue 'products;
                }

                match self.products.cas_stock(&id, product.stock_version, next).await {
                    Ok(Some(_)) => {
                        outcome.products_updated += 1;
                        outcome.total_released += i64::from(released);
                        continue 'products;
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(product = %product_id, error = %e, "expiry sweep write failed");
                        continue 'products;
                    }
                }
            }
            tracing::warn!(product = %product_id, "expiry sweep gave up under contention");
        }

        Ok(outcome)
    }
}
