//! Logging configuration for applications embedding apidrive.

use std::env;

/// Environment variable read by [`TelemetryConfig::from_env`] for the level.
pub const LOG_LEVEL_ENV: &str = "APIDRIVE_LOG";

/// Environment variable read by [`TelemetryConfig::from_env`] for the format.
pub const LOG_FORMAT_ENV: &str = "APIDRIVE_LOG_FORMAT";

/// How events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl LogFormat {
    /// Case-insensitive; `None` for anything but `json` or `pretty`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Recorded on the initialization event (default: "apidrive").
    pub service_name: String,

    /// `EnvFilter` directive, e.g. `info` or `apidrive=debug,reqwest=warn`.
    /// `RUST_LOG` takes precedence when set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Colour codes in pretty output.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "apidrive".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `APIDRIVE_LOG` and `APIDRIVE_LOG_FORMAT`.
    /// An unrecognized format value keeps the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = env::var(LOG_LEVEL_ENV) {
            if !level.trim().is_empty() {
                config.log_level = level;
            }
        }
        if let Some(format) = env::var(LOG_FORMAT_ENV)
            .ok()
            .as_deref()
            .and_then(LogFormat::parse)
        {
            config.log_format = format;
        }
        config
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}
