//! Store Server — stock reservation and order orchestration
//!
//! # Architecture
//!
//! - **Stock ledger** (`db`): per-product quantity, active holds, and a
//!   version counter, stored in embedded SurrealDB
//! - **Reservation engine** (`stock`): atomic reserve / confirm / release
//!   / expire built on conditional version-checked writes
//! - **Order orchestration** (`orders`): the checkout saga and the order
//!   status state machine
//! - **Payment** (`payment`): Stripe over plain REST, plus an in-process
//!   gateway for tests
//! - **HTTP API** (`api`): RESTful routes over Axum
//!
//! # Module structure
//!
//! ```text
//! store-server/src/
//! ├── core/          # config, state, server lifecycle
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # models and repositories
//! ├── stock/         # reservation engine and expiry sweeper
//! ├── orders/        # checkout and status transitions
//! ├── payment/       # gateway trait and implementations
//! ├── notify/        # status-change notification sink
//! └── utils/         # errors, logging, time
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod notify;
pub mod orders;
pub mod payment;
pub mod stock;
pub mod utils;

// Re-export common types
pub use crate::core::{Config, Server, ServerState};
pub use orders::{OrderError, OrderService};
pub use stock::{ReservationEngine, StockError};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Load `.env`, create the working directory layout, and initialize
/// logging. Call once before anything else.
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    let log_dir = config.log_dir();
    init_logger_with_file(&level, config.is_production(), log_dir.to_str())?;

    Ok(())
}
