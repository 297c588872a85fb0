//! Retail Insights Auth Gateway
//!
//! JWT bearer authentication and admin gating for the Retail Insights API.
//! The binary in `main.rs` wires these modules to an axum server; tests and
//! downstream routers use them directly.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;

pub use config::Settings;
