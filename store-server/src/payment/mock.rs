//! In-process payment gateway for tests and local development.
//!
//! Outcomes are scripted per call; every charge and refund is recorded so
//! tests can assert on what the orchestrator actually sent.

use super::{ChargeOutcome, ChargeRequest, PaymentError, PaymentGateway, RefundOutcome};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Approve,
    Decline,
    TransportError,
}

pub struct RecordingGateway {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    default_outcome: ScriptedOutcome,
    charges: Mutex<Vec<ChargeRequest>>,
    refunds: Mutex<Vec<(String, Option<Decimal>)>>,
    counter: AtomicU64,
}

impl RecordingGateway {
    fn with_default(default_outcome: ScriptedOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_outcome,
            charges: Mutex::new(Vec::new()),
            refunds: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Gateway that approves every charge.
    pub fn approving() -> Self {
        Self::with_default(ScriptedOutcome::Approve)
    }

    /// Gateway that declines every charge.
    pub fn declining() -> Self {
        Self::with_default(ScriptedOutcome::Decline)
    }

    /// Gateway whose charge calls fail at the transport level.
    pub fn erroring() -> Self {
        Self::with_default(ScriptedOutcome::TransportError)
    }

    /// Queue an outcome for the next charge, overriding the default.
    pub fn push_outcome(&self, outcome: ScriptedOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.charges.lock().unwrap().clone()
    }

    pub fn refunds(&self) -> Vec<(String, Option<Decimal>)> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, PaymentError> {
        self.charges.lock().unwrap().push(request);
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_outcome);
        let n = self.counter.fetch_add(1, Ordering::SeqCst);

        match outcome {
            ScriptedOutcome::Approve => Ok(ChargeOutcome {
                success: true,
                reference: Some(format!("ch_mock_{n}")),
                status: "succeeded".to_string(),
            }),
            ScriptedOutcome::Decline => Ok(ChargeOutcome {
                success: false,
                reference: None,
                status: "card_declined".to_string(),
            }),
            ScriptedOutcome::TransportError => {
                Err(PaymentError::Transport("connection reset".to_string()))
            }
        }
    }

    async fn refund(
        &self,
        payment_ref: &str,
        amount: Option<Decimal>,
    ) -> Result<RefundOutcome, PaymentError> {
        self.refunds
            .lock()
            .unwrap()
            .push((payment_ref.to_string(), amount));
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(RefundOutcome {
            refund_ref: format!("re_mock_{n}"),
        })
    }
}
