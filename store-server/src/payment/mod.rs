//! Payment gateway interface
//!
//! The orchestrator treats payment as an opaque synchronous charge/refund
//! API. A declined charge comes back as `ChargeOutcome { success: false }`;
//! transport-level failures surface as `PaymentError` — the order service
//! routes both through the same compensating-release path.

pub mod mock;
pub mod stripe;

pub use mock::RecordingGateway;
pub use stripe::StripeGateway;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment transport error: {0}")]
    Transport(String),

    #[error("payment gateway error: {0}")]
    Gateway(String),
}

/// Charge request forwarded to the gateway.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount: Decimal,
    pub currency: String,
    pub customer_ref: String,
    pub payment_method_id: String,
    pub order_number: String,
}

/// Gateway verdict on a charge attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeOutcome {
    pub success: bool,
    pub reference: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundOutcome {
    pub refund_ref: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, PaymentError>;

    /// Refund a previous charge, fully when `amount` is `None`.
    async fn refund(
        &self,
        payment_ref: &str,
        amount: Option<Decimal>,
    ) -> Result<RefundOutcome, PaymentError>;
}
