//! Core module — configuration, state, server lifecycle
//!
//! - [`Config`] - environment-driven configuration
//! - [`ServerState`] - shared handler state
//! - [`Server`] - HTTP server
//! - [`ServerError`] - lifecycle errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
