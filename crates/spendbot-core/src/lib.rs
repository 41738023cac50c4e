//! Core domain + application logic for the Telegram expense tracker.
//!
//! This crate is intentionally framework-agnostic. Telegram, Postgres, the HTTP API and
//! the remote analysis endpoint live behind ports (traits) implemented in adapter crates.

pub mod analysis;
pub mod bot;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod rate_limit;
pub mod store;

pub use errors::{Error, Result};
