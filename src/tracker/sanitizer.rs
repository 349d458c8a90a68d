//! Turns raw source notifications into power readings.

use crate::error::ReadingError;
use chrono::{DateTime, Local};

/// A sanitized power sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Non-negative power in watts, observed at `at`.
    Valid { watts: f64, at: DateTime<Local> },
    /// The notification carried no usable value.
    Invalid,
}

impl Reading {
    /// Watts of a valid reading, `0.0` otherwise.
    pub fn watts_or_zero(&self) -> f64 {
        match self {
            Reading::Valid { watts, .. } => *watts,
            Reading::Invalid => 0.0,
        }
    }
}

/// Parses a raw state into watts.
///
/// Sentinel states, missing payloads and anything that is not a finite
/// number are errors. Negative numbers are clamped to `0.0`.
pub fn parse_watts(raw: Option<&str>) -> Result<f64, ReadingError> {
    let text = raw.ok_or(ReadingError::Missing)?.trim();
    match text {
        "unavailable" => return Err(ReadingError::Unavailable),
        "unknown" => return Err(ReadingError::Unknown),
        "" => return Err(ReadingError::Missing),
        _ => {}
    }

    let value = text
        .parse::<f64>()
        .map_err(|e| ReadingError::unparsable(text, e))?;
    if !value.is_finite() {
        return Err(ReadingError::NotFinite {
            text: text.to_string(),
        });
    }

    Ok(value.max(0.0))
}

/// Sanitizes a raw notification. Never fails: bad input becomes [`Reading::Invalid`].
pub fn sanitize(source: &str, raw: Option<&str>, at: DateTime<Local>) -> Reading {
    match parse_watts(raw) {
        Ok(watts) => Reading::Valid { watts, at },
        Err(e) => {
            tracing::warn!(source = %source, error = %e, "Invalid power reading");
            Reading::Invalid
        }
    }
}
