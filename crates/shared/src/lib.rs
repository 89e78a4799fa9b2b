//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common pieces used across all other crates:
//! - Minor-unit conversion for decimal amounts
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseBackend, DatabaseConfig, LedgerConfig};
pub use error::AppError;
