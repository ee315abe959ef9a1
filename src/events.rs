use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{Regime, TradingSignal};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    ExtremeSentiment,
    SentimentDivergence,
    RegimeChange,
    HighConfidence,
    TradingSignal,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::ExtremeSentiment => "EXTREME_SENTIMENT",
            AlertType::SentimentDivergence => "SENTIMENT_DIVERGENCE",
            AlertType::RegimeChange => "REGIME_CHANGE",
            AlertType::HighConfidence => "HIGH_CONFIDENCE",
            AlertType::TradingSignal => "TRADING_SIGNAL",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    /// None for market-wide alerts
    pub ticker: Option<String>,
    pub message: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(
        alert_type: AlertType,
        severity: AlertSeverity,
        ticker: Option<String>,
        message: impl Into<String>,
        details: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            severity,
            ticker,
            message: message.into(),
            details,
            timestamp,
        }
    }
}

/// One row of the bounded alert history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertHistoryEntry {
    pub alert: AlertEvent,
    /// Ticker of the analysis that raised the alert, set even for market-wide alerts
    pub ticker: String,
    pub recorded_at: DateTime<Utc>,
}

// Global Event Enum
#[derive(Clone, Debug)]
pub enum Event {
    Alert(AlertEvent),
    Signal(TradingSignal),
    RegimeChanged {
        from: Regime,
        to: Regime,
        at: DateTime<Utc>,
    },
}
