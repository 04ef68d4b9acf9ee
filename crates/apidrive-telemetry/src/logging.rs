//! Structured logging with JSON or pretty output.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global logging subscriber.
///
/// `RUST_LOG` wins over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter)?,
        LogFormat::Pretty => init_pretty_logging(filter, config.ansi)?,
    }

    tracing::debug!(
        service = %config.service_name,
        format = ?config.log_format,
        "logging initialized"
    );
    Ok(())
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter, ansi: bool) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .pretty()
        .with_ansi(ansi)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// A document was loaded and compiled.
    pub const DOCUMENT_LOADED: &str = "document_loaded";

    /// A request was handed to the transport.
    pub const OPERATION_DISPATCHED: &str = "operation_dispatched";

    /// A response matched a declared status.
    pub const RESPONSE_RECEIVED: &str = "response_received";

    /// A response status was not declared by the operation.
    pub const UNEXPECTED_RESPONSE: &str = "unexpected_response";

    /// A request or response body failed model validation.
    pub const VALIDATION_FAILURE: &str = "validation_failure";

    /// Credentials were injected into a request.
    pub const SECURITY_APPLIED: &str = "security_applied";

    /// The transport failed before a response was received.
    pub const TRANSPORT_ERROR: &str = "transport_error";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to keep the `event` field consistent.
#[macro_export]
macro_rules! log_document_loaded {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::DOCUMENT_LOADED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_operation_dispatched {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::OPERATION_DISPATCHED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_response_received {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::RESPONSE_RECEIVED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_unexpected_response {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::UNEXPECTED_RESPONSE,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_validation_failure {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::VALIDATION_FAILURE,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_security_applied {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::SECURITY_APPLIED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_transport_error {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::TRANSPORT_ERROR,
            $($field)*
        )
    };
}
