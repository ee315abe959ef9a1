//! Macro regime classification.
//!
//! Each indicator casts a weighted bullish or bearish vote; the bullish share
//! of all votes decides BULL / BEAR / TRANSITION. Pure and deterministic:
//! freshness of the indicator snapshot is the caller's concern.

use tracing::{debug, info, warn};

use crate::constants::regime::*;
use crate::error::FusionResult;
use crate::types::{
    round3, MacroIndicatorSet, Recommendation, RecommendationAction, Regime, RegimeClassification,
    RiskLevel,
};

/// Outcome of a single indicator's vote.
#[derive(Clone, Debug, PartialEq)]
struct Vote {
    bullish: u32,
    bearish: u32,
    line: String,
}

impl Vote {
    fn bullish(weight: u32, line: String) -> Self {
        Self { bullish: weight, bearish: 0, line }
    }

    fn bearish(weight: u32, line: String) -> Self {
        Self { bullish: 0, bearish: weight, line }
    }

    fn neutral(line: String) -> Self {
        Self { bullish: 0, bearish: 0, line }
    }

    fn absent(name: &str) -> Self {
        Self::neutral(format!("○ {} unavailable; no signal", name))
    }
}

fn vote_vix(vix: Option<f64>) -> Vote {
    let Some(vix) = vix else {
        return Vote::absent("VIX");
    };
    if vix < VIX_CALM {
        Vote::bullish(STRONG_VOTE, format!("✓ Low volatility (VIX: {}) indicates stable bull market", vix))
    } else if vix > VIX_STRESSED {
        Vote::bearish(STRONG_VOTE, format!("✗ Elevated volatility (VIX: {}) signals market stress", vix))
    } else {
        Vote::neutral(format!("○ Moderate volatility (VIX: {}) is neutral", vix))
    }
}

fn vote_unemployment(rate: Option<f64>) -> Vote {
    let Some(rate) = rate else {
        return Vote::absent("Unemployment");
    };
    if rate < UNEMPLOYMENT_STRONG {
        Vote::bullish(STRONG_VOTE, format!("✓ Strong labor market (Unemployment: {}%)", rate))
    } else if rate > UNEMPLOYMENT_WEAK {
        Vote::bearish(STRONG_VOTE, format!("✗ Weak labor market (Unemployment: {}%)", rate))
    } else {
        // (4.5, 5.0] still counts as healthy
        Vote::bullish(WEAK_VOTE, format!("○ Healthy labor market (Unemployment: {}%)", rate))
    }
}

fn vote_inflation(rate: Option<f64>) -> Vote {
    let Some(rate) = rate else {
        return Vote::absent("Inflation");
    };
    if rate <= INFLATION_TARGET {
        Vote::bullish(STRONG_VOTE, format!("✓ Inflation near target (Inflation: {}%)", rate))
    } else if rate > INFLATION_HIGH {
        Vote::bearish(STRONG_VOTE, format!("✗ High inflation pressures (Inflation: {}%)", rate))
    } else {
        Vote::bearish(
            WEAK_VOTE,
            format!("○ Elevated but manageable inflation (Inflation: {}%)", rate),
        )
    }
}

fn vote_fed_rate(rate: Option<f64>) -> Vote {
    let Some(rate) = rate else {
        return Vote::absent("Fed funds rate");
    };
    if rate < FED_RATE_NEUTRAL {
        Vote::bullish(WEAK_VOTE, format!("✓ Accommodative Fed policy (Rate: {}%)", rate))
    } else if rate > FED_RATE_RESTRICTIVE {
        Vote::bearish(WEAK_VOTE, format!("✗ Restrictive Fed policy (Rate: {}%)", rate))
    } else {
        Vote::neutral(format!("○ Neutral Fed policy (Rate: {}%)", rate))
    }
}

fn vote_gdp(growth: Option<f64>) -> Vote {
    let Some(growth) = growth else {
        return Vote::absent("GDP growth");
    };
    if growth > GDP_STRONG {
        Vote::bullish(WEAK_VOTE, format!("✓ Strong economic growth (GDP: {}%)", growth))
    } else if growth < GDP_WEAK {
        Vote::bearish(WEAK_VOTE, format!("✗ Weak economic growth (GDP: {}%)", growth))
    } else {
        Vote::neutral(format!("○ Moderate economic growth (GDP: {}%)", growth))
    }
}

/// Bullish share of all votes; 0 when nothing voted.
pub fn bullish_ratio(bullish: u32, bearish: u32) -> f64 {
    let total = bullish + bearish;
    if total == 0 {
        0.0
    } else {
        bullish as f64 / total as f64
    }
}

/// Map a bullish ratio to a regime and its confidence.
pub fn regime_from_ratio(ratio: f64) -> (Regime, f64) {
    if ratio >= BULL_RATIO {
        (Regime::Bull, ratio)
    } else if ratio <= BEAR_RATIO {
        (Regime::Bear, 1.0 - ratio)
    } else {
        // Peaks at 1.0 when the vote is evenly split
        (Regime::Transition, 1.0 - (0.5 - ratio).abs() * 2.0)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RegimeClassifier;

impl RegimeClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, indicators: &MacroIndicatorSet) -> FusionResult<RegimeClassification> {
        classify(indicators)
    }

    pub fn recommend(&self, classification: &RegimeClassification) -> FusionResult<Recommendation> {
        recommend(classification)
    }
}

pub fn classify(indicators: &MacroIndicatorSet) -> FusionResult<RegimeClassification> {
    indicators.validate()?;

    let votes = [
        vote_vix(indicators.vix),
        vote_unemployment(indicators.unemployment_rate),
        vote_inflation(indicators.inflation_rate),
        vote_fed_rate(indicators.fed_funds_rate),
        vote_gdp(indicators.gdp_growth),
    ];

    let bullish: u32 = votes.iter().map(|v| v.bullish).sum();
    let bearish: u32 = votes.iter().map(|v| v.bearish).sum();
    let reasoning: Vec<String> = votes.into_iter().map(|v| v.line).collect();

    let ratio = bullish_ratio(bullish, bearish);
    if bullish + bearish == 0 {
        warn!("⚠️ [REGIME] No indicator cast a vote; zero ratio classifies as BEAR");
    }
    let (regime, confidence) = regime_from_ratio(ratio);

    debug!(
        "[REGIME] votes bullish={} bearish={} ratio={:.3}",
        bullish, bearish, ratio
    );
    info!("🌐 [REGIME] Classified {} (confidence: {:.3})", regime, confidence);

    Ok(RegimeClassification {
        regime,
        confidence: round3(confidence),
        bullish_signals: bullish,
        bearish_signals: bearish,
        bullish_ratio: round3(ratio),
        reasoning,
        source: indicators.clone(),
    })
}

fn actions(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

/// Positioning guidance for a regime classification.
pub fn recommend(classification: &RegimeClassification) -> FusionResult<Recommendation> {
    classification.validate()?;

    let strong = classification.confidence > STRONG_RECOMMENDATION_CONFIDENCE;
    let (action, risk_level, rationale, suggested_actions) = match (classification.regime, strong) {
        (Regime::Bull, true) => (
            RecommendationAction::Favorable,
            RiskLevel::Moderate,
            "Strong bullish signals across multiple indicators support risk-on positioning",
            actions(&[
                "Consider increasing equity exposure",
                "Focus on growth and cyclical sectors",
                "Earnings beats likely to be rewarded by market",
                "Look for momentum in high-beta names",
            ]),
        ),
        (Regime::Bull, false) => (
            RecommendationAction::Favorable,
            RiskLevel::ModerateLow,
            "Moderate bullish signals suggest selective risk-taking",
            actions(&[
                "Maintain equity exposure with quality bias",
                "Balance growth and value exposure",
                "Monitor earnings closely for confirmation",
                "Consider defensive hedges",
            ]),
        ),
        (Regime::Bear, true) => (
            RecommendationAction::Avoid,
            RiskLevel::High,
            "Strong bearish signals indicate significant downside risk",
            actions(&[
                "Reduce equity exposure significantly",
                "Focus on defensive sectors (utilities, staples)",
                "Earnings misses likely to be heavily punished",
                "Consider cash or fixed income allocation",
            ]),
        ),
        (Regime::Bear, false) => (
            RecommendationAction::Caution,
            RiskLevel::ModerateHigh,
            "Bearish signals warrant defensive positioning",
            actions(&[
                "Reduce equity exposure moderately",
                "Favor quality and dividend-paying stocks",
                "Be selective with earnings plays",
                "Maintain hedges and downside protection",
            ]),
        ),
        (Regime::Transition, _) => (
            RecommendationAction::Caution,
            RiskLevel::Moderate,
            "Mixed signals and regime uncertainty suggest reducing risk",
            actions(&[
                "Maintain neutral positioning",
                "Focus on high-conviction ideas only",
                "Earnings reactions may be unpredictable",
                "Wait for clearer regime confirmation",
                "Consider barbell strategy (quality + opportunistic)",
            ]),
        ),
    };

    info!(
        "🧭 [REGIME] Recommendation: {} (risk level: {})",
        action, risk_level
    );

    Ok(Recommendation {
        action,
        risk_level,
        rationale: rationale.to_string(),
        suggested_actions,
        regime: classification.regime,
        confidence: classification.confidence,
    })
}
