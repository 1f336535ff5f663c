//! Notification sink
//!
//! Order status changes are pushed to an external notification service
//! (email, webhooks). Delivery is best-effort: the order service logs a
//! sink failure and never rolls back the transition that triggered it.

use crate::db::models::{Order, OrderStatus};
use async_trait::async_trait;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn order_status_changed(
        &self,
        order: &Order,
        previous: OrderStatus,
    ) -> anyhow::Result<()>;
}

/// Default sink: structured log lines only.
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn order_status_changed(
        &self,
        order: &Order,
        previous: OrderStatus,
    ) -> anyhow::Result<()> {
        tracing::info!(
            order = %order.order_number,
            from = %previous,
            to = %order.status,
            "order status changed"
        );
        Ok(())
    }
}
