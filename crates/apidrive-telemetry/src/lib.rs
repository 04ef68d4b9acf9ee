//! Logging for apidrive.
//!
//! The library crates only emit `tracing` events, using the standard event
//! names in [`events`] and the `log_*!` macros. Installing a subscriber is
//! left to the application:
//!
//! ```ignore
//! use apidrive_telemetry::{init_logging, LogFormat, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("debug")
//!     .with_log_format(LogFormat::Pretty);
//! init_logging(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig, LOG_FORMAT_ENV, LOG_LEVEL_ENV};
pub use logging::{events, init_logging};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging, usually because a global subscriber
    /// is already installed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}
