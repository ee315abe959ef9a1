//! Custom error types for the fusion core
//!
//! Provides structured, typed errors instead of generic Box<dyn Error>

use thiserror::Error;

/// Top-level errors surfaced by the classifier, decision engine and monitor
#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid input for {field}: {value} ({reason})")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Alert store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Persistence errors raised by an `AlertStore` backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt store data: {0}")]
    Corrupt(String),
}

pub type FusionResult<T> = Result<T, FusionError>;

impl FusionError {
    pub fn invalid(field: &str, value: impl ToString, reason: &str) -> Self {
        FusionError::InvalidInput {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, FusionError::InvalidInput { .. })
    }
}

impl From<serde_yaml::Error> for FusionError {
    fn from(err: serde_yaml::Error) -> Self {
        FusionError::Config(err.to_string())
    }
}

/// Reject NaN and infinities before any range check
pub fn ensure_finite(field: &str, value: f64) -> FusionResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FusionError::invalid(field, value, "must be a finite number"))
    }
}

/// Fail fast when `value` lies outside the closed interval `[min, max]`
pub fn ensure_range(field: &str, value: f64, min: f64, max: f64) -> FusionResult<f64> {
    let value = ensure_finite(field, value)?;
    if value < min || value > max {
        return Err(FusionError::invalid(
            field,
            value,
            &format!("must be within [{}, {}]", min, max),
        ));
    }
    Ok(value)
}
