use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_range, FusionError, FusionResult};

/// Round to three decimals; applied when result records are built.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Bull,
    Bear,
    Transition,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Bull => "BULL",
            Regime::Bear => "BEAR",
            Regime::Transition => "TRANSITION",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BULL" => Ok(Regime::Bull),
            "BEAR" => Ok(Regime::Bear),
            "TRANSITION" => Ok(Regime::Transition),
            _ => Err(FusionError::invalid("regime", s, "expected BULL|BEAR|TRANSITION")),
        }
    }
}

/// Snapshot of macro indicators. Absent fields cast no vote.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroIndicatorSet {
    pub vix: Option<f64>,
    pub unemployment_rate: Option<f64>,
    pub inflation_rate: Option<f64>,
    pub fed_funds_rate: Option<f64>,
    pub gdp_growth: Option<f64>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl MacroIndicatorSet {
    pub fn with_vix(mut self, vix: f64) -> Self {
        self.vix = Some(vix);
        self
    }

    pub fn with_unemployment(mut self, rate: f64) -> Self {
        self.unemployment_rate = Some(rate);
        self
    }

    pub fn with_inflation(mut self, rate: f64) -> Self {
        self.inflation_rate = Some(rate);
        self
    }

    pub fn with_fed_funds(mut self, rate: f64) -> Self {
        self.fed_funds_rate = Some(rate);
        self
    }

    pub fn with_gdp_growth(mut self, growth: f64) -> Self {
        self.gdp_growth = Some(growth);
        self
    }

    pub fn fetched_at(mut self, at: DateTime<Utc>) -> Self {
        self.fetched_at = Some(at);
        self
    }

    pub fn validate(&self) -> FusionResult<()> {
        if let Some(vix) = self.vix {
            ensure_range("vix", vix, 0.0, f64::MAX)?;
        }
        if let Some(v) = self.unemployment_rate {
            ensure_range("unemployment_rate", v, 0.0, 100.0)?;
        }
        if let Some(v) = self.inflation_rate {
            ensure_finite("inflation_rate", v)?;
        }
        if let Some(v) = self.fed_funds_rate {
            ensure_finite("fed_funds_rate", v)?;
        }
        if let Some(v) = self.gdp_growth {
            ensure_finite("gdp_growth", v)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegimeClassification {
    pub regime: Regime,
    pub confidence: f64,
    pub bullish_signals: u32,
    pub bearish_signals: u32,
    pub bullish_ratio: f64,
    pub reasoning: Vec<String>,
    pub source: MacroIndicatorSet,
}

impl RegimeClassification {
    /// Minimal classification for callers that only hold a regime label and confidence.
    pub fn from_parts(regime: Regime, confidence: f64) -> FusionResult<Self> {
        let classification = Self {
            regime,
            confidence,
            bullish_signals: 0,
            bearish_signals: 0,
            bullish_ratio: 0.0,
            reasoning: Vec::new(),
            source: MacroIndicatorSet::default(),
        };
        classification.validate()?;
        Ok(classification)
    }

    pub fn validate(&self) -> FusionResult<()> {
        ensure_range("regime.confidence", self.confidence, 0.0, 1.0)?;
        ensure_range("regime.bullish_ratio", self.bullish_ratio, 0.0, 1.0)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            _ => Err(FusionError::invalid(
                "sentiment.label",
                s,
                "expected positive|negative|neutral",
            )),
        }
    }
}

/// Output of the external sentiment model, consumed verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentAssessment {
    pub label: SentimentLabel,
    pub score: f64,
    pub confidence: f64,
}

impl SentimentAssessment {
    pub fn new(label: SentimentLabel, score: f64, confidence: f64) -> FusionResult<Self> {
        let sentiment = Self { label, score, confidence };
        sentiment.validate()?;
        Ok(sentiment)
    }

    pub fn validate(&self) -> FusionResult<()> {
        ensure_range("sentiment.score", self.score, -1.0, 1.0)?;
        ensure_range("sentiment.confidence", self.confidence, 0.0, 1.0)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    /// Annualized volatility, typically 0.1-0.5
    pub volatility: Option<f64>,
}

impl MarketContext {
    pub fn with_volatility(volatility: f64) -> Self {
        Self { volatility: Some(volatility) }
    }

    pub fn validate(&self) -> FusionResult<()> {
        if let Some(v) = self.volatility {
            ensure_range("market_context.volatility", v, 0.0, f64::MAX)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "BUY",
            SignalAction::Sell => "SELL",
            SignalAction::Hold => "HOLD",
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalAction {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(SignalAction::Buy),
            "SELL" => Ok(SignalAction::Sell),
            "HOLD" => Ok(SignalAction::Hold),
            _ => Err(FusionError::invalid("signal", s, "expected BUY|SELL|HOLD")),
        }
    }
}

/// Inputs a decision was made from, echoed on the signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalFactors {
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    pub sentiment_confidence: f64,
    pub regime: Regime,
    pub regime_confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub ticker: String,
    pub signal: SignalAction,
    /// Cascade result before validation overrides
    pub raw_signal: SignalAction,
    pub confidence: f64,
    pub risk_score: f64,
    /// 0 whenever `signal` is HOLD
    pub position_size: u8,
    /// Size computed from `raw_signal`
    pub raw_position_size: u8,
    pub reasoning: String,
    pub validation_notes: Vec<String>,
    pub factors: SignalFactors,
    pub timestamp: DateTime<Utc>,
}

impl TradingSignal {
    pub fn was_overridden(&self) -> bool {
        self.signal != self.raw_signal
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecommendationAction {
    Favorable,
    Caution,
    Avoid,
}

impl RecommendationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationAction::Favorable => "FAVORABLE",
            RecommendationAction::Caution => "CAUTION",
            RecommendationAction::Avoid => "AVOID",
        }
    }
}

impl fmt::Display for RecommendationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationAction {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FAVORABLE" => Ok(RecommendationAction::Favorable),
            "CAUTION" => Ok(RecommendationAction::Caution),
            "AVOID" => Ok(RecommendationAction::Avoid),
            _ => Err(FusionError::invalid(
                "recommendation",
                s,
                "expected FAVORABLE|CAUTION|AVOID",
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "MODERATE-LOW")]
    ModerateLow,
    #[serde(rename = "MODERATE")]
    Moderate,
    #[serde(rename = "MODERATE-HIGH")]
    ModerateHigh,
    #[serde(rename = "HIGH")]
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::ModerateLow => "MODERATE-LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::ModerateHigh => "MODERATE-HIGH",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: RecommendationAction,
    pub risk_level: RiskLevel,
    pub rationale: String,
    pub suggested_actions: Vec<String>,
    pub regime: Regime,
    pub confidence: f64,
}

/// The single persisted row used for regime change detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegimeState {
    pub regime: Regime,
    pub updated_at: DateTime<Utc>,
}

impl RegimeState {
    pub fn new(regime: Regime, updated_at: DateTime<Utc>) -> Self {
        Self { regime, updated_at }
    }
}
