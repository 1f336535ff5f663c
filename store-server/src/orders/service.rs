//! Order Service
//!
//! Drives the checkout saga: validate, hold stock, persist, charge,
//! then either confirm the holds or compensate by releasing them. The
//! stock ledger is the only shared mutable state; everything here that
//! touches it goes through the reservation engine's conditional writes,
//! so the service itself needs no locking.
//!
//! Status transitions are funneled through a single private function
//! that validates the move, appends exactly one history entry, and runs
//! the side effects for the target state.

use super::error::OrderError;
use super::status;
use super::totals;
use crate::db::models::{
    FulfillmentStatus, Order, OrderCreate, OrderItem, OrderMetadata, OrderStatus, PaymentInfo,
    PaymentStatus, ShippingInfo, StatusHistoryEntry, User,
};
use crate::db::repository::{
    OrderRepository, OrderSequenceRepository, ProductRepository, UserRepository,
};
use crate::notify::NotificationSink;
use crate::payment::{ChargeOutcome, ChargeRequest, PaymentGateway};
use crate::stock::{ReservationEngine, StockError};
use crate::utils::now_millis;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use uuid::Uuid;

const MS_PER_DAY: i64 = 86_400_000;

/// Successful checkout: the persisted order plus the gateway verdict.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub payment: ChargeOutcome,
    pub stock_reservation_id: String,
}

/// Outcome of a cancellation, reported back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub order: Order,
    pub refund_processed: bool,
    pub stock_restored: bool,
}

/// What actually happened while applying a transition's side effects.
#[derive(Debug, Clone, Copy, Default)]
struct TransitionEffects {
    stock_restore_failures: usize,
}

pub struct OrderService {
    orders: OrderRepository,
    products: ProductRepository,
    users: UserRepository,
    sequences: OrderSequenceRepository,
    engine: ReservationEngine,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSink>,
    currency: String,
}

impl OrderService {
    pub fn new(
        db: Surreal<Db>,
        engine: ReservationEngine,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSink>,
        currency: String,
    ) -> Self {
        Self {
            orders: OrderRepository::new(db.clone()),
            products: ProductRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            sequences: OrderSequenceRepository::new(db),
            engine,
            gateway,
            notifier,
            currency,
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Create an order end to end: validate user and items, reserve stock
    /// for every line (all or nothing), persist the pending order, charge
    /// the payment method, then confirm or release the holds depending on
    /// the gateway verdict.
    pub async fn create_order(&self, data: OrderCreate) -> Result<CheckoutResult, OrderError> {
        let user = self
            .users
            .find_by_id(&data.user_id)
            .await?
            .ok_or_else(|| OrderError::UserNotFound(data.user_id.clone()))?;

        // Reservations are keyed by user id; canonicalize it so a later
        // release matches no matter which form the client sent.
        let data = OrderCreate {
            user_id: user
                .id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| UserRepository::record_id(&data.user_id).to_string()),
            ..data
        };

        let items = self.snapshot_items(&data).await?;
        let totals = totals::calculate(&items, data.shipping_method);

        // One reservation id per checkout; it doubles as the session key
        // the engine matches holds against.
        let reservation_id = Uuid::new_v4().to_string();
        match self
            .engine
            .reserve_batch(&data.items, &data.user_id, &reservation_id)
            .await
        {
            Ok(_) => {}
            Err(StockError::BatchFailed { failures }) => {
                return Err(OrderError::ReservationFailed { failures });
            }
            Err(e) => return Err(e.into()),
        }

        let order_number = self.next_order_number().await?;
        let order = match self
            .persist_pending_order(&data, &user, items, &totals, &order_number, &reservation_id)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                // The holds are orphaned if we bail here; give them back
                // rather than waiting for the expiry sweep.
                self.release_items(&data, "order_persist_failed").await;
                return Err(e);
            }
        };

        let charge = self
            .gateway
            .charge(ChargeRequest {
                amount: totals.total,
                currency: self.currency.clone(),
                customer_ref: data.user_id.clone(),
                payment_method_id: data.payment_method_id.clone(),
                order_number: order_number.clone(),
            })
            .await;

        match charge {
            Ok(outcome) if outcome.success => {
                let order = self.finalize_paid_order(order, &data, &outcome).await?;
                Ok(CheckoutResult {
                    order,
                    payment: outcome,
                    stock_reservation_id: reservation_id,
                })
            }
            Ok(outcome) => {
                tracing::warn!(
                    order = %order_number,
                    status = %outcome.status,
                    "payment declined"
                );
                self.fail_payment(order, &data).await
            }
            Err(e) => {
                tracing::error!(order = %order_number, error = %e, "payment gateway error");
                self.fail_payment(order, &data).await
            }
        }
    }

    /// Resolve each requested line against the catalog, snapshotting name,
    /// sku, and price. Availability is checked here only to fail fast with
    /// a precise error; the authoritative check happens inside the
    /// engine's conditional write.
    async fn snapshot_items(&self, data: &OrderCreate) -> Result<Vec<OrderItem>, OrderError> {
        let mut items = Vec::with_capacity(data.items.len());
        for input in &data.items {
            if input.quantity <= 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: input.product_id.clone(),
                    quantity: input.quantity,
                });
            }

            let product = self
                .products
                .find_by_id(&input.product_id)
                .await?
                .ok_or_else(|| OrderError::ProductNotFound(input.product_id.clone()))?;

            if product.stock.track_quantity {
                let available = product.stock.available();
                if available < input.quantity {
                    return Err(OrderError::InsufficientStock {
                        product_id: input.product_id.clone(),
                        available,
                        requested: input.quantity,
                    });
                }
            }

            let id = product
                .id
                .clone()
                .unwrap_or_else(|| ProductRepository::record_id(&input.product_id));
            items.push(OrderItem {
                product: id,
                name: product.name.clone(),
                sku: product.sku.clone(),
                price: product.price,
                quantity: input.quantity,
                total: totals::line_total(product.price, input.quantity),
                variant_id: input.variant_id.clone(),
            });
        }
        Ok(items)
    }

    async fn persist_pending_order(
        &self,
        data: &OrderCreate,
        user: &User,
        items: Vec<OrderItem>,
        totals: &totals::OrderTotals,
        order_number: &str,
        reservation_id: &str,
    ) -> Result<Order, OrderError> {
        let now = now_millis();
        let user_id = user
            .id
            .clone()
            .unwrap_or_else(|| UserRepository::record_id(&data.user_id));

        let order = Order {
            id: None,
            order_number: order_number.to_string(),
            user: user_id,
            items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping_fee: totals.shipping_fee,
            total: totals.total,
            status: OrderStatus::Pending,
            status_history: vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                timestamp: now,
                notes: Some("awaiting payment".to_string()),
                updated_by: None,
            }],
            payment: PaymentInfo {
                method: "card".to_string(),
                status: PaymentStatus::Pending,
                amount: totals.total,
                reference: None,
                refunded_at: None,
            },
            shipping: ShippingInfo {
                method: data.shipping_method,
                status: FulfillmentStatus::Pending,
                estimated_delivery: now + data.shipping_method.transit_days() * MS_PER_DAY,
                tracking_number: None,
                shipped_at: None,
                delivered_at: None,
                address: data.shipping_address.clone(),
            },
            metadata: OrderMetadata {
                stock_reservation_id: Some(reservation_id.to_string()),
            },
            notes: data.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        Ok(self.orders.create(order).await?)
    }

    /// Payment succeeded: mark the order confirmed, record the charge, and
    /// turn every hold into a permanent decrement. A confirm failure on one
    /// line is logged and skipped — the charge already went through, so the
    /// order must not fail here; the ledger discrepancy surfaces in logs.
    async fn finalize_paid_order(
        &self,
        order: Order,
        data: &OrderCreate,
        outcome: &ChargeOutcome,
    ) -> Result<Order, OrderError> {
        let order = self
            .transition(order, OrderStatus::Confirmed, Some("payment completed"), None)
            .await?;

        let id = order
            .id
            .clone()
            .unwrap_or_else(|| OrderRepository::record_id(&order.id_string()));
        let mut payment = order.payment.clone();
        payment.status = PaymentStatus::Completed;
        payment.reference = outcome.reference.clone();
        let order = self.orders.update_payment(&id, payment).await?;

        for item in &data.items {
            if let Err(e) = self
                .engine
                .confirm(
                    &item.product_id,
                    item.quantity,
                    item.variant_id.as_deref(),
                    &order.id_string(),
                    &data.user_id,
                )
                .await
            {
                tracing::error!(
                    order = %order.order_number,
                    product = %item.product_id,
                    error = %e,
                    "failed to confirm reservation for paid order"
                );
            }
        }

        Ok(order)
    }

    /// Payment declined or errored: park the order in `payment_failed` and
    /// give every hold back. Release failures are logged, not rethrown —
    /// the expiry sweep mops up whatever is left.
    async fn fail_payment(
        &self,
        order: Order,
        data: &OrderCreate,
    ) -> Result<CheckoutResult, OrderError> {
        let order_id = order.id_string();
        let order_number = order.order_number.clone();

        let order = match self
            .transition(order, OrderStatus::PaymentFailed, Some("payment declined"), None)
            .await
        {
            Ok(order) => Some(order),
            Err(e) => {
                tracing::error!(order = %order_number, error = %e, "failed to mark payment failure");
                None
            }
        };

        self.release_items(data, "payment_failed").await;

        if let Some(order) = order {
            let id = order
                .id
                .clone()
                .unwrap_or_else(|| OrderRepository::record_id(&order_id));
            let mut payment = order.payment.clone();
            payment.status = PaymentStatus::Failed;
            if let Err(e) = self.orders.update_payment(&id, payment).await {
                tracing::error!(order = %order_number, error = %e, "failed to record payment status");
            }
        }

        Err(OrderError::PaymentFailed {
            order_id,
            order_number,
        })
    }

    /// Best-effort release of every line's hold.
    async fn release_items(&self, data: &OrderCreate, reason: &str) {
        for item in &data.items {
            if let Err(e) = self
                .engine
                .release(
                    &item.product_id,
                    item.quantity,
                    item.variant_id.as_deref(),
                    &data.user_id,
                    reason,
                )
                .await
            {
                tracing::warn!(
                    product = %item.product_id,
                    reason = %reason,
                    error = %e,
                    "failed to release reservation"
                );
            }
        }
    }

    // =========================================================================
    // Status transitions
    // =========================================================================

    /// Move an order to `to`, validating the transition and running its
    /// side effects.
    pub async fn update_status(
        &self,
        order_id: &str,
        to: OrderStatus,
        notes: Option<&str>,
        updated_by: Option<&str>,
    ) -> Result<Order, OrderError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        self.transition(order, to, notes, updated_by).await
    }

    /// Cancel an order from any cancellable state, restoring stock and
    /// refunding a completed payment.
    pub async fn cancel_order(
        &self,
        order_id: &str,
        updated_by: Option<&str>,
    ) -> Result<CancelOutcome, OrderError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;

        if !status::cancellable(order.status) {
            return Err(OrderError::NotCancellable {
                current: order.status,
            });
        }

        let refund_expected = order.payment.status == PaymentStatus::Completed;
        let (order, effects) = self
            .transition_with_effects(order, OrderStatus::Cancelled, Some("cancelled"), updated_by)
            .await?;

        Ok(CancelOutcome {
            refund_processed: refund_expected,
            stock_restored: effects.stock_restore_failures == 0,
            order,
        })
    }

    async fn transition(
        &self,
        order: Order,
        to: OrderStatus,
        notes: Option<&str>,
        updated_by: Option<&str>,
    ) -> Result<Order, OrderError> {
        self.transition_with_effects(order, to, notes, updated_by)
            .await
            .map(|(order, _)| order)
    }

    /// The single write path for order status. Validates the move, appends
    /// one history entry, applies the target state's side effects, then
    /// notifies — notification failures are logged and swallowed.
    async fn transition_with_effects(
        &self,
        order: Order,
        to: OrderStatus,
        notes: Option<&str>,
        updated_by: Option<&str>,
    ) -> Result<(Order, TransitionEffects), OrderError> {
        let from = order.status;
        if !status::can_transition(from, to) {
            return Err(OrderError::InvalidTransition { from, to });
        }

        let id = order
            .id
            .clone()
            .unwrap_or_else(|| OrderRepository::record_id(&order.id_string()));
        let entry = StatusHistoryEntry {
            status: to,
            timestamp: now_millis(),
            notes: notes.map(String::from),
            updated_by: updated_by.map(String::from),
        };
        let updated = self.orders.update_status(&id, to, entry).await?;

        tracing::info!(
            order = %updated.order_number,
            from = %from,
            to = %to,
            "order status updated"
        );

        let (updated, effects) = self.apply_side_effects(updated, from, to).await?;

        if let Err(e) = self.notifier.order_status_changed(&updated, from).await {
            tracing::warn!(order = %updated.order_number, error = %e, "notification failed");
        }

        Ok((updated, effects))
    }

    async fn apply_side_effects(
        &self,
        order: Order,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(Order, TransitionEffects), OrderError> {
        let effects = TransitionEffects::default();
        match to {
            OrderStatus::Processing => {
                let order = self
                    .update_fulfillment(order, |s| s.status = FulfillmentStatus::Processing)
                    .await?;
                Ok((order, effects))
            }
            OrderStatus::Shipped => {
                let order = self
                    .update_fulfillment(order, |s| {
                        s.status = FulfillmentStatus::Shipped;
                        s.shipped_at = Some(now_millis());
                        s.tracking_number = Some(tracking_number());
                    })
                    .await?;
                Ok((order, effects))
            }
            OrderStatus::Delivered => {
                let order = self
                    .update_fulfillment(order, |s| {
                        s.status = FulfillmentStatus::Delivered;
                        s.delivered_at = Some(now_millis());
                    })
                    .await?;
                Ok((order, effects))
            }
            OrderStatus::Cancelled => self.compensate_cancellation(order, from).await,
            OrderStatus::Refunded => Ok((self.process_refund(order).await?, effects)),
            _ => Ok((order, effects)),
        }
    }

    async fn update_fulfillment<F>(&self, order: Order, apply: F) -> Result<Order, OrderError>
    where
        F: FnOnce(&mut ShippingInfo),
    {
        let id = order
            .id
            .clone()
            .unwrap_or_else(|| OrderRepository::record_id(&order.id_string()));
        let mut shipping = order.shipping.clone();
        apply(&mut shipping);
        Ok(self.orders.update_shipping(&id, shipping).await?)
    }

    /// Put the units back. A pending order still holds reservations, so
    /// they are released; a paid order already converted its holds into
    /// decrements, so the quantities are restocked directly. Either way a
    /// completed payment gets refunded. Per-item failures are logged and
    /// the rest of the compensation proceeds.
    async fn compensate_cancellation(
        &self,
        order: Order,
        from: OrderStatus,
    ) -> Result<(Order, TransitionEffects), OrderError> {
        let mut effects = TransitionEffects::default();
        for item in &order.items {
            let product_id = item.product.to_string();
            let result = if from == OrderStatus::Pending {
                self.engine
                    .release(
                        &product_id,
                        item.quantity,
                        item.variant_id.as_deref(),
                        &order.user.to_string(),
                        "order_cancelled",
                    )
                    .await
                    .map(|_| ())
            } else {
                self.products
                    .restock(&item.product, item.quantity)
                    .await
                    .map(|_| ())
                    .map_err(StockError::from)
            };
            if let Err(e) = result {
                effects.stock_restore_failures += 1;
                tracing::error!(
                    order = %order.order_number,
                    product = %product_id,
                    error = %e,
                    "failed to restore stock on cancellation"
                );
            }
        }

        let order = if order.payment.status == PaymentStatus::Completed {
            self.process_refund(order).await?
        } else {
            order
        };
        Ok((order, effects))
    }

    /// Refund a completed payment through the gateway and mark the payment
    /// block refunded. A gateway failure is logged; the local payment state
    /// still flips so the order does not get charged twice on retry.
    async fn process_refund(&self, order: Order) -> Result<Order, OrderError> {
        if order.payment.status != PaymentStatus::Completed {
            return Ok(order);
        }

        if let Some(reference) = &order.payment.reference {
            match self.gateway.refund(reference, None).await {
                Ok(refund) => {
                    tracing::info!(
                        order = %order.order_number,
                        refund = %refund.refund_ref,
                        "payment refunded"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        order = %order.order_number,
                        error = %e,
                        "refund request failed"
                    );
                }
            }
        }

        let id = order
            .id
            .clone()
            .unwrap_or_else(|| OrderRepository::record_id(&order.id_string()));
        let mut payment = order.payment.clone();
        payment.status = PaymentStatus::Refunded;
        payment.refunded_at = Some(now_millis());
        Ok(self.orders.update_payment(&id, payment).await?)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    pub async fn list_orders(&self, limit: i64, offset: i64) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.find_all(limit, offset).await?)
    }

    pub async fn list_user_orders(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, OrderError> {
        let user = UserRepository::record_id(user_id);
        Ok(self.orders.find_by_user(&user, limit, offset).await?)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// `ORD` + YYMMDD + zero-padded per-day sequence, e.g. `ORD2608300001`.
    async fn next_order_number(&self) -> Result<String, OrderError> {
        let day = Utc::now().format("%y%m%d").to_string();
        let seq = self.sequences.next(&day).await?;
        Ok(format!("ORD{day}{seq:04}"))
    }
}

/// Opaque carrier tracking reference, e.g. `TRK48291047X7Q2M9`.
fn tracking_number() -> String {
    const CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    let millis = now_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    format!("TRK{tail}{suffix}")
}
