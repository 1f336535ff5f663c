//! Stripe integration via REST API (no SDK dependency)

use super::{ChargeOutcome, ChargeRequest, PaymentError, PaymentGateway, RefundOutcome};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

const API_BASE: &str = "https://api.stripe.com/v1";

/// Payment gateway backed by Stripe PaymentIntents.
pub struct StripeGateway {
    secret_key: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key,
            client: reqwest::Client::new(),
        }
    }
}

/// Stripe wants amounts in minor units (cents).
fn minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| PaymentError::Gateway(format!("amount out of range: {amount}")))
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, PaymentError> {
        let amount = minor_units(request.amount)?;
        let resp: serde_json::Value = self
            .client
            .post(format!("{API_BASE}/payment_intents"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.to_string()),
                ("currency", request.currency.clone()),
                ("payment_method", request.payment_method_id.clone()),
                ("confirm", "true".to_string()),
                ("metadata[order_number]", request.order_number.clone()),
                ("metadata[customer_ref]", request.customer_ref.clone()),
            ])
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        // Card declines come back as an error object with a code; treat
        // them as an unsuccessful outcome rather than a transport fault.
        if let Some(err) = resp.get("error") {
            let status = err["code"]
                .as_str()
                .or_else(|| err["type"].as_str())
                .unwrap_or("card_error")
                .to_string();
            return Ok(ChargeOutcome {
                success: false,
                reference: None,
                status,
            });
        }

        let status = resp["status"].as_str().unwrap_or("unknown").to_string();
        Ok(ChargeOutcome {
            success: status == "succeeded",
            reference: resp["id"].as_str().map(String::from),
            status,
        })
    }

    async fn refund(
        &self,
        payment_ref: &str,
        amount: Option<Decimal>,
    ) -> Result<RefundOutcome, PaymentError> {
        let mut form = vec![("payment_intent", payment_ref.to_string())];
        if let Some(amount) = amount {
            form.push(("amount", minor_units(amount)?.to_string()));
        }

        let resp: serde_json::Value = self
            .client
            .post(format!("{API_BASE}/refunds"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        resp["id"]
            .as_str()
            .map(|id| RefundOutcome {
                refund_ref: id.to_string(),
            })
            .ok_or_else(|| PaymentError::Gateway(format!("Stripe refund failed: {resp}")))
    }
}
