//! Thresholds and weights used by the fusion core
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make the scoring rules easier to tune.

/// Macro regime voting thresholds
pub mod regime {
    /// VIX below this is calm (+2 bullish)
    pub const VIX_CALM: f64 = 20.0;
    /// VIX above this is stressed (+2 bearish)
    pub const VIX_STRESSED: f64 = 25.0;

    /// Unemployment below this is a strong labor market (+2 bullish)
    pub const UNEMPLOYMENT_STRONG: f64 = 4.5;
    /// Unemployment above this is a weak labor market (+2 bearish)
    pub const UNEMPLOYMENT_WEAK: f64 = 5.0;

    /// Inflation at or below this is near target (+2 bullish)
    pub const INFLATION_TARGET: f64 = 3.5;
    /// Inflation above this is high (+2 bearish)
    pub const INFLATION_HIGH: f64 = 4.0;

    /// Fed funds below this is accommodative (+1 bullish)
    pub const FED_RATE_NEUTRAL: f64 = 4.0;
    /// Fed funds above this is restrictive (+1 bearish)
    pub const FED_RATE_RESTRICTIVE: f64 = 5.0;

    /// GDP growth above this is strong (+1 bullish)
    pub const GDP_STRONG: f64 = 2.5;
    /// GDP growth below this is weak (+1 bearish)
    pub const GDP_WEAK: f64 = 1.0;

    pub const STRONG_VOTE: u32 = 2;
    pub const WEAK_VOTE: u32 = 1;

    /// Bullish ratio at or above this classifies BULL
    pub const BULL_RATIO: f64 = 0.65;
    /// Bullish ratio at or below this classifies BEAR
    pub const BEAR_RATIO: f64 = 0.35;

    /// Regime confidence above this upgrades a recommendation
    pub const STRONG_RECOMMENDATION_CONFIDENCE: f64 = 0.75;
}

/// Signal cascade, risk and sizing constants
pub mod signal {
    pub const STRONG_SCORE: f64 = 0.5;
    pub const STRONG_SENTIMENT_CONFIDENCE: f64 = 0.7;
    pub const STRONG_ALIGNMENT: f64 = 0.5;
    pub const STRONG_CONFIDENCE_CAP: f64 = 0.95;

    pub const MODERATE_SCORE: f64 = 0.2;
    pub const MODERATE_SENTIMENT_CONFIDENCE: f64 = 0.5;

    pub const CONTRARIAN_SCORE: f64 = 0.4;
    pub const CONTRARIAN_SENTIMENT_CONFIDENCE: f64 = 0.75;
    pub const CONTRARIAN_DISCOUNT: f64 = 0.7;

    pub const TRANSITION_SCORE: f64 = 0.3;
    pub const TRANSITION_SENTIMENT_CONFIDENCE: f64 = 0.7;
    pub const TRANSITION_DISCOUNT: f64 = 0.6;

    /// Floor on HOLD confidence
    pub const HOLD_CONFIDENCE_FLOOR: f64 = 0.4;

    /// Volatility that maps to a full risk factor of 1.0
    pub const VOLATILITY_CEILING: f64 = 0.5;

    pub const BEAR_BASE_RISK: f64 = 0.7;
    pub const TRANSITION_BASE_RISK: f64 = 0.5;
    pub const BULL_BASE_RISK: f64 = 0.3;

    pub const MIN_POSITION: u8 = 1;
    pub const MAX_POSITION: u8 = 10;

    pub const BULL_BUY_MULTIPLIER: f64 = 1.2;
    pub const BEAR_SELL_MULTIPLIER: f64 = 1.1;
    pub const TRANSITION_MULTIPLIER: f64 = 0.7;
    pub const CONTRARIAN_MULTIPLIER: f64 = 0.6;

    /// Override thresholds
    pub const BEAR_BUY_MIN_CONFIDENCE: f64 = 0.6;
    pub const BEAR_BUY_MAX_REGIME_CONFIDENCE: f64 = 0.8;
    pub const MAX_RISK: f64 = 0.8;
    pub const CONTRARIAN_REGIME_CONFIDENCE: f64 = 0.85;
    pub const MIN_CONFIDENCE: f64 = 0.4;

    pub const NO_OVERRIDES_NOTE: &str = "no overrides applied";
}

/// Alert monitor thresholds
pub mod alerts {
    /// |score| above this raises EXTREME_SENTIMENT
    pub const EXTREME_SENTIMENT_SCORE: f64 = 0.8;

    /// Sentiment confidence above this raises HIGH_CONFIDENCE
    pub const HIGH_CONFIDENCE: f64 = 0.9;

    /// Bounded history size (oldest evicted first)
    pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

    /// Window used for the recent-alert count in stats
    pub const RECENT_WINDOW_HOURS: i64 = 24;

    pub const REGIME_FILE: &str = "last_regime.json";
    pub const HISTORY_FILE: &str = "alert_history.json";
}

/// Report bands
pub mod report {
    pub const LOW_RISK_BELOW: f64 = 0.3;
    pub const MODERATE_RISK_BELOW: f64 = 0.6;

    pub const AGGRESSIVE_SIZE_ABOVE: u8 = 7;
    pub const MODERATE_SIZE_ABOVE: u8 = 4;
}

/// Overall verdict and sentiment/macro alignment in the analysis pipeline
pub mod verdict {
    pub const STRONG_SCORE: f64 = 0.3;
    pub const ALIGNMENT_SCORE: f64 = 0.2;
}
