//! Error types for the power max tracker.
//!
//! This module defines typed errors for the different parts of the service.
//! Errors raised by collaborators (Home Assistant, InfluxDB, the state file)
//! are logged by the runtime and never stop tracking; errors raised by the
//! aggregation core ([`ReadingError`], [`ClockAnomaly`]) are recovered where
//! they occur.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error types.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type that encompasses all application errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// Home Assistant communication errors
    #[error("Home Assistant error")]
    Hass(#[from] HassError),

    /// InfluxDB and state file errors
    #[error("storage error")]
    Storage(#[from] StorageError),

    /// Generic errors that don't fit other categories
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable parsing failed
    #[error("failed to parse environment variables: {0}")]
    EnvParse(String),

    /// Required configuration value is missing
    #[error("missing required configuration: {0}")]
    Missing(String),

    /// Configuration value is invalid
    #[error("invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Home Assistant REST API errors.
#[derive(Error, Debug)]
pub enum HassError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication failed (401)
    #[error("authentication failed: invalid access token")]
    AuthFailed,

    /// Server returned an error status
    #[error("server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Response body could not be decoded
    #[error("failed to decode response for {entity_id}: {message}")]
    Decode { entity_id: String, message: String },
}

/// A raw value notification that could not be turned into a power reading.
///
/// Never propagated past the sanitizer: the reading becomes `Invalid` and the
/// error is only logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadingError {
    #[error("source is unavailable")]
    Unavailable,

    #[error("source state is unknown")]
    Unknown,

    #[error("source has no state")]
    Missing,

    #[error("failed to parse power from '{text}': {message}")]
    Unparsable { text: String, message: String },

    #[error("power value '{text}' is not finite")]
    NotFinite { text: String },
}

/// Clock irregularities observed by the hour accumulator.
///
/// Recovered locally by skipping the energy increment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClockAnomaly {
    #[error("reading is {seconds:.3}s after the previous one")]
    NonPositiveDelta { seconds: f64 },

    #[error("hour boundary fired {seconds:.3}s after the window opened")]
    EarlyBoundary { seconds: f64 },
}

/// InfluxDB and state persistence errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// InfluxDB client error
    #[error("InfluxDB error: {0}")]
    Client(#[from] influxdb2::RequestError),

    /// Invalid data point
    #[error("invalid data point: {0}")]
    InvalidDataPoint(String),

    /// State file could not be read or written
    #[error("state file I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file exists but does not contain a valid state
    #[error("state file {} is corrupt: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },
}

impl ConfigError {
    /// Creates a new environment parse error.
    pub fn env_parse(err: impl std::fmt::Display) -> Self {
        Self::EnvParse(err.to_string())
    }

    /// Creates a new missing configuration error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }

    /// Creates a new invalid configuration error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl HassError {
    /// Creates a server error from HTTP status and response body.
    pub fn server_error(status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            Self::AuthFailed
        } else {
            Self::ServerError {
                status: status.as_u16(),
                message: body,
            }
        }
    }

    /// Creates a decode error.
    pub fn decode(entity_id: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            entity_id: entity_id.into(),
            message: err.to_string(),
        }
    }
}

impl ReadingError {
    /// Creates an unparsable value error.
    pub fn unparsable(text: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Unparsable {
            text: text.into(),
            message: err.to_string(),
        }
    }
}

impl StorageError {
    /// Creates a state file I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a corrupt state file error.
    pub fn corrupt(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
