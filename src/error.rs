// BENCHRIG ERROR TYPES
// PARSE ERRORS NEVER LEAVE THE TELEMETRY LAYER. CONFIG ERRORS ABORT STARTUP.

use thiserror::Error;

/// Telemetry decode failures. Sources map these to `None`.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// Artifact missing or empty (transport failure looks the same)
    #[error("artifact is empty or missing")]
    Empty,

    /// Expected line or counter not present
    #[error("no '{0}' line found")]
    MissingLine(&'static str),

    /// Field present but not numeric
    #[error("bad number for {field}: {value:?}")]
    BadNumber { field: &'static str, value: String },

    /// CSV header has no matching column
    #[error("no column matching '{0}'")]
    MissingColumn(&'static str),

    /// Column present but no row parsed
    #[error("no data rows for '{0}'")]
    NoRows(&'static str),
}

impl ParseError {
    pub fn bad_number(field: &'static str, value: impl Into<String>) -> Self {
        Self::BadNumber {
            field,
            value: value.into(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("host cannot be empty")]
    EmptyHost,

    #[error("ssh user cannot be empty")]
    EmptyUser,

    #[error("at least one server configuration is required")]
    NoConfigurations,

    #[error("duplicate configuration name: {0}")]
    DuplicateConfiguration(String),

    #[error("configuration name must be a plain token, got: {0:?}")]
    InvalidConfigurationName(String),

    #[error("at least one concurrency level is required")]
    NoConcurrencyLevels,

    #[error("concurrency levels must be positive")]
    ZeroConcurrency,

    #[error("duration must be greater than 0")]
    ZeroDuration,

    #[error("core budget must be at least 1")]
    ZeroCoreBudget,
}
