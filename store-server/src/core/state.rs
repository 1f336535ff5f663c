//! Server state
//!
//! Everything a handler needs, behind cheap clones: the database handle,
//! the payment gateway, and the notification sink. Services are built on
//! demand from these — they hold no state of their own beyond the
//! handles, so constructing one per request costs nothing.

use crate::core::Config;
use crate::db::DbService;
use crate::notify::{LogNotifier, NotificationSink};
use crate::orders::OrderService;
use crate::payment::{PaymentGateway, RecordingGateway, StripeGateway};
use crate::stock::ReservationEngine;
use crate::utils::AppError;
use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl ServerState {
    /// Open the database and wire up the gateway and notifier.
    pub async fn initialize(config: Config) -> Result<Self, AppError> {
        let db_path = config.database_dir();
        let db_path = db_path
            .to_str()
            .ok_or_else(|| AppError::Internal("non-UTF8 database path".to_string()))?;
        let db_service = DbService::new(db_path).await?;

        let gateway: Arc<dyn PaymentGateway> = match &config.stripe_secret_key {
            Some(key) => Arc::new(StripeGateway::new(key.clone())),
            None => {
                if config.is_production() {
                    return Err(AppError::Internal(
                        "STRIPE_SECRET_KEY is required in production".to_string(),
                    ));
                }
                tracing::warn!("STRIPE_SECRET_KEY not set; using in-process payment gateway");
                Arc::new(RecordingGateway::approving())
            }
        };

        Ok(Self {
            config,
            db: db_service.db,
            gateway,
            notifier: Arc::new(LogNotifier),
        })
    }

    /// State over an existing database handle, used by tests.
    pub fn with_db(
        config: Config,
        db: Surreal<Db>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            db,
            gateway,
            notifier,
        }
    }

    pub fn reservation_engine(&self) -> ReservationEngine {
        ReservationEngine::new(self.db.clone(), self.config.reservation_ttl())
    }

    pub fn order_service(&self) -> OrderService {
        OrderService::new(
            self.db.clone(),
            self.reservation_engine(),
            self.gateway.clone(),
            self.notifier.clone(),
            self.config.currency.clone(),
        )
    }
}
