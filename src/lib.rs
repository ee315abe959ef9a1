//! Signal Fusion - macro regime classification fused with sentiment
//!
//! This library classifies the macro regime from economic indicators,
//! combines it with an externally produced sentiment assessment into a
//! risk-adjusted trading signal, and raises alerts on notable conditions.

pub mod api;
pub mod bus;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod events;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use bus::EventBus;
pub use config::AppConfig;
pub use error::{FusionError, FusionResult, StoreError};
pub use events::{AlertEvent, AlertSeverity, AlertType, Event};
pub use services::alerts::{AlertMonitor, AnalysisBundle};
pub use services::regime::RegimeClassifier;
pub use services::signal::SignalDecisionEngine;
pub use types::{
    MacroIndicatorSet, MarketContext, Regime, RegimeClassification, SentimentAssessment,
    SentimentLabel, SignalAction, TradingSignal,
};

#[cfg(test)]
mod config_tests;
