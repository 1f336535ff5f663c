//! Server configuration
//!
//! All settings come from environment variables with sane defaults:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/storefront | data and log root |
//! | HTTP_PORT | 3000 | HTTP API port |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | RESERVATION_TTL_SECS | 900 | stock hold lease |
//! | SWEEP_INTERVAL_SECS | 3600 | expired-hold sweep cadence |
//! | CURRENCY | usd | charge currency |
//! | STRIPE_SECRET_KEY | (unset) | enables the Stripe gateway |

use crate::stock::{DEFAULT_RESERVATION_TTL_SECS, DEFAULT_SWEEP_INTERVAL_SECS};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the database and logs
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Reservation lease in seconds
    pub reservation_ttl_secs: u64,
    /// Expiry sweep interval in seconds
    pub sweep_interval_secs: u64,
    /// ISO currency code for charges
    pub currency: String,
    /// Stripe API key; when unset, charges go through the in-process
    /// recording gateway (development only)
    pub stripe_secret_key: Option<String>,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/storefront".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            reservation_ttl_secs: std::env::var("RESERVATION_TTL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_RESERVATION_TTL_SECS),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "usd".into()),
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY").ok(),
        }
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("db")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn reservation_ttl(&self) -> Duration {
        Duration::from_secs(self.reservation_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Create the working directory layout if it does not exist yet.
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
