//! Stock reservation subsystem
//!
//! - [`engine`] — atomic reserve / confirm / release / expire operations
//!   over the per-product stock ledger
//! - [`sweeper`] — background task releasing reservations past their TTL

pub mod engine;
pub mod sweeper;

pub use engine::{
    BatchFailure, DEFAULT_RESERVATION_TTL_SECS, ReservationEngine, StockError, SweepOutcome,
};
pub use sweeper::DEFAULT_SWEEP_INTERVAL_SECS;
