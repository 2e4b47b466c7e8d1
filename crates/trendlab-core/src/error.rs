//! Error taxonomy for the trading core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Core error type. Every fatal condition the core can detect is a variant
/// here; `WarmupUnderflow` is intentionally absent — per the design notes,
/// insufficient warm-up is handled internally as a HOLD tick, not an error.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data quality error for {symbol}: {reason}")]
    DataQuality { symbol: String, reason: String },

    #[error("alignment error: HTF bar series has {htf_bars} bars but {htf_features} feature records")]
    Alignment {
        htf_bars: usize,
        htf_features: usize,
    },

    #[error("state machine violation: attempted {attempted} while state was {current}")]
    StateMachineViolation {
        attempted: &'static str,
        current: &'static str,
    },

    #[error("bar provider error: {0}")]
    Provider(String),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn data_quality(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::DataQuality {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

/// A single issue surfaced by bar-sequence validation (`validate::check`).
/// Multiple issues are collected into one `CoreError::DataQuality` at the
/// call site rather than failing fast, so a caller can log every problem
/// found in one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum DataQualityIssue {
    DuplicateOpenTime {
        open_time: DateTime<Utc>,
    },
    OutOfOrder {
        open_time: DateTime<Utc>,
        previous_open_time: DateTime<Utc>,
    },
    InvalidOhlc {
        open_time: DateTime<Utc>,
        reason: String,
    },
    NonPositiveCloseTime {
        open_time: DateTime<Utc>,
    },
}
