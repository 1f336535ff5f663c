//! Product model and stock ledger
//!
//! The `Stock` value embedded in every product is the ledger the
//! reservation engine operates on. Everything here is pure data
//! manipulation; the atomic read-modify-write discipline lives in
//! `stock::ReservationEngine`.

use super::serde_helpers;
use crate::utils::now_millis;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use uuid::Uuid;

// =============================================================================
// Reservations
// =============================================================================

/// A time-limited hold on stock units for one user/session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub quantity: i32,
    pub variant_id: Option<String>,
    pub reserved_at: i64,
    pub expires_at: i64,
}

impl Reservation {
    pub fn new(
        user_id: &str,
        session_id: &str,
        quantity: i32,
        variant_id: Option<String>,
        ttl_ms: i64,
    ) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            quantity,
            variant_id,
            reserved_at: now,
            expires_at: now + ttl_ms,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

// =============================================================================
// Stock ledger
// =============================================================================

/// Derived availability label
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

/// Per-variant physical quantity.
///
/// Kept inside `Stock` so variant decrements ride the same conditional
/// write as the top-level quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantStock {
    pub variant_id: String,
    pub name: String,
    pub quantity: i32,
}

/// Per-product stock record.
///
/// Invariants after every successful ledger operation:
/// - `reserved <= quantity`
/// - `sum(reservations[].quantity) == reserved`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub quantity: i32,
    pub reserved: i32,
    #[serde(
        default = "serde_helpers::default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub track_quantity: bool,
    #[serde(default)]
    pub low_stock_threshold: i32,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    #[serde(default)]
    pub variants: Vec<VariantStock>,
}

impl Stock {
    pub fn new(quantity: i32) -> Self {
        Self {
            quantity,
            reserved: 0,
            track_quantity: true,
            low_stock_threshold: 0,
            reservations: Vec::new(),
            variants: Vec::new(),
        }
    }

    /// Units a new reservation may claim.
    pub fn available(&self) -> i32 {
        self.quantity - self.reserved
    }

    pub fn status_label(&self) -> StockStatus {
        let available = self.available();
        if available <= 0 {
            StockStatus::OutOfStock
        } else if available <= self.low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn variant(&self, variant_id: &str) -> Option<&VariantStock> {
        self.variants.iter().find(|v| v.variant_id == variant_id)
    }

    /// Units of a variant not yet claimed by an open reservation.
    ///
    /// `None` when the variant does not exist on this product.
    pub fn variant_available(&self, variant_id: &str) -> Option<i32> {
        let variant = self.variant(variant_id)?;
        let held: i32 = self
            .reservations
            .iter()
            .filter(|r| r.variant_id.as_deref() == Some(variant_id))
            .map(|r| r.quantity)
            .sum();
        Some(variant.quantity - held)
    }

    /// Index of the reservation matching (user, quantity, variant), if any.
    pub fn find_reservation(
        &self,
        user_id: &str,
        quantity: i32,
        variant_id: Option<&str>,
    ) -> Option<usize> {
        self.reservations.iter().position(|r| {
            r.user_id == user_id && r.quantity == quantity && r.variant_id.as_deref() == variant_id
        })
    }

    /// Record a hold. Caller has already checked availability.
    pub fn apply_reserve(&mut self, reservation: Reservation) {
        self.reserved += reservation.quantity;
        self.reservations.push(reservation);
    }

    /// Convert the reservation at `idx` into a permanent decrement.
    pub fn apply_confirm(&mut self, idx: usize) {
        let reservation = self.reservations.remove(idx);
        self.quantity -= reservation.quantity;
        self.reserved -= reservation.quantity;
        if let Some(variant_id) = reservation.variant_id.as_deref()
            && let Some(variant) = self.variants.iter_mut().find(|v| v.variant_id == variant_id)
        {
            variant.quantity -= reservation.quantity;
        }
    }

    /// Cancel the reservation at `idx`, returning its units to available stock.
    pub fn apply_release(&mut self, idx: usize) {
        let reservation = self.reservations.remove(idx);
        self.reserved -= reservation.quantity;
    }

    /// Remove every reservation past its expiry; returns the released quantity.
    pub fn take_expired(&mut self, now: i64) -> i32 {
        let mut released = 0;
        self.reservations.retain(|r| {
            if r.is_expired(now) {
                released += r.quantity;
                false
            } else {
                true
            }
        });
        self.reserved -= released;
        released
    }

    /// Ledger consistency check, used by tests and debug assertions.
    pub fn is_consistent(&self) -> bool {
        let held: i32 = self.reservations.iter().map(|r| r.quantity).sum();
        held == self.reserved && self.reserved <= self.quantity && self.reserved >= 0
    }
}

// =============================================================================
// Product
// =============================================================================

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(
        default = "serde_helpers::default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub is_active: bool,
    pub stock: Stock,
    /// Compare-and-swap token: bumped by every stock write.
    pub stock_version: i64,
    pub created_at: i64,
}

impl Product {
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub track_quantity: Option<bool>,
    pub low_stock_threshold: Option<i32>,
    pub variants: Option<Vec<VariantStock>>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(user: &str, qty: i32) -> Reservation {
        Reservation::new(user, "session-1", qty, None, 60_000)
    }

    #[test]
    fn available_and_status_labels() {
        let mut stock = Stock::new(10);
        stock.low_stock_threshold = 3;
        assert_eq!(stock.available(), 10);
        assert_eq!(stock.status_label(), StockStatus::InStock);

        stock.apply_reserve(reservation("u1", 8));
        assert_eq!(stock.available(), 2);
        assert_eq!(stock.status_label(), StockStatus::LowStock);

        stock.apply_reserve(reservation("u2", 2));
        assert_eq!(stock.available(), 0);
        assert_eq!(stock.status_label(), StockStatus::OutOfStock);
        assert!(stock.is_consistent());
    }

    #[test]
    fn confirm_decrements_quantity_and_reserved() {
        let mut stock = Stock::new(5);
        stock.apply_reserve(reservation("u1", 3));

        let idx = stock.find_reservation("u1", 3, None).unwrap();
        stock.apply_confirm(idx);

        assert_eq!(stock.quantity, 2);
        assert_eq!(stock.reserved, 0);
        assert!(stock.reservations.is_empty());
        assert!(stock.is_consistent());
    }

    #[test]
    fn confirm_decrements_variant_quantity() {
        let mut stock = Stock::new(5);
        stock.variants.push(VariantStock {
            variant_id: "v-red".into(),
            name: "Red".into(),
            quantity: 3,
        });
        stock.apply_reserve(Reservation::new("u1", "s1", 2, Some("v-red".into()), 60_000));

        let idx = stock.find_reservation("u1", 2, Some("v-red")).unwrap();
        stock.apply_confirm(idx);

        assert_eq!(stock.quantity, 3);
        assert_eq!(stock.variant("v-red").unwrap().quantity, 1);
        assert!(stock.is_consistent());
    }

    #[test]
    fn release_returns_units_without_sale() {
        let mut stock = Stock::new(5);
        stock.apply_reserve(reservation("u1", 3));

        let idx = stock.find_reservation("u1", 3, None).unwrap();
        stock.apply_release(idx);

        assert_eq!(stock.quantity, 5);
        assert_eq!(stock.reserved, 0);
        assert!(stock.is_consistent());
    }

    #[test]
    fn take_expired_releases_only_stale_holds() {
        let mut stock = Stock::new(10);
        let mut stale = reservation("u1", 4);
        stale.expires_at = now_millis() - 1_000;
        stock.apply_reserve(stale);
        stock.apply_reserve(reservation("u2", 2));

        let released = stock.take_expired(now_millis());
        assert_eq!(released, 4);
        assert_eq!(stock.reserved, 2);
        assert_eq!(stock.reservations.len(), 1);
        assert!(stock.is_consistent());

        // second pass is a no-op
        assert_eq!(stock.take_expired(now_millis()), 0);
    }

    #[test]
    fn variant_availability_counts_open_holds() {
        let mut stock = Stock::new(10);
        stock.variants.push(VariantStock {
            variant_id: "v-red".into(),
            name: "Red".into(),
            quantity: 3,
        });

        assert_eq!(stock.variant_available("v-red"), Some(3));
        assert_eq!(stock.variant_available("v-blue"), None);

        stock.apply_reserve(Reservation::new("u1", "s1", 2, Some("v-red".into()), 60_000));
        assert_eq!(stock.variant_available("v-red"), Some(1));

        // un-varianted holds do not count against the variant
        stock.apply_reserve(reservation("u2", 4));
        assert_eq!(stock.variant_available("v-red"), Some(1));

        let idx = stock.find_reservation("u1", 2, Some("v-red")).unwrap();
        stock.apply_confirm(idx);
        assert_eq!(stock.variant_available("v-red"), Some(1));
        assert!(stock.variant("v-red").unwrap().quantity >= 0);
    }

    #[test]
    fn find_reservation_matches_variant() {
        let mut stock = Stock::new(10);
        stock.apply_reserve(Reservation::new("u1", "s1", 2, Some("v1".into()), 60_000));
        stock.apply_reserve(reservation("u1", 2));

        assert_eq!(stock.find_reservation("u1", 2, Some("v1")), Some(0));
        assert_eq!(stock.find_reservation("u1", 2, None), Some(1));
        assert_eq!(stock.find_reservation("u1", 3, None), None);
    }
}
