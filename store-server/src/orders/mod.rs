//! Order orchestration
//!
//! - `status`: the order lifecycle state machine
//! - `totals`: pure money math over snapshotted items
//! - `service`: the checkout saga and status transition driver

pub mod error;
pub mod service;
pub mod status;
pub mod totals;

pub use error::OrderError;
pub use service::{CancelOutcome, CheckoutResult, OrderService};
pub use totals::OrderTotals;
