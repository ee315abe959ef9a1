//! Sentiment + regime fusion into a risk-adjusted trading signal.
//!
//! The decision runs in four steps: an ordered rule cascade picks the raw
//! signal, an independent risk score is averaged from the available factors,
//! a position size is derived, and a set of override rules may veto the raw
//! signal down to HOLD.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::constants::signal::*;
use crate::error::{FusionError, FusionResult};
use crate::types::{
    round3, MarketContext, Regime, RegimeClassification, SentimentAssessment, SignalAction,
    SignalFactors, TradingSignal,
};

/// Everything the cascade looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecisionInputs {
    pub score: f64,
    pub sentiment_confidence: f64,
    pub regime: Regime,
    pub regime_confidence: f64,
    pub alignment: f64,
}

impl DecisionInputs {
    pub fn new(sentiment: &SentimentAssessment, regime: &RegimeClassification) -> Self {
        Self {
            score: sentiment.score,
            sentiment_confidence: sentiment.confidence,
            regime: regime.regime,
            regime_confidence: regime.confidence,
            alignment: alignment_score(sentiment.score, regime.regime),
        }
    }

    fn mean_confidence(&self) -> f64 {
        (self.sentiment_confidence + self.regime_confidence) / 2.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawDecision {
    pub rule: &'static str,
    pub signal: SignalAction,
    pub confidence: f64,
    pub reasoning: String,
}

/// One branch of the cascade: a predicate and the decision it yields.
pub struct CascadeRule {
    pub name: &'static str,
    pub applies: fn(&DecisionInputs) -> bool,
    pub decide: fn(&DecisionInputs) -> RawDecision,
}

/// How far sentiment agrees with the regime's direction.
pub fn alignment_score(score: f64, regime: Regime) -> f64 {
    match regime {
        Regime::Bull => score,
        Regime::Bear => -score,
        Regime::Transition => score.abs() * 0.5,
    }
}

fn is_strong_buy(d: &DecisionInputs) -> bool {
    d.regime == Regime::Bull
        && d.score > STRONG_SCORE
        && d.sentiment_confidence > STRONG_SENTIMENT_CONFIDENCE
        && d.alignment > STRONG_ALIGNMENT
}

fn strong_buy(d: &DecisionInputs) -> RawDecision {
    RawDecision {
        rule: "strong_buy",
        signal: SignalAction::Buy,
        confidence: d.mean_confidence().min(STRONG_CONFIDENCE_CAP),
        reasoning: format!(
            "Strong BUY: Bullish regime ({:.0}% confidence) aligned with very positive sentiment ({:+.2}). \
             High conviction setup with alignment score {:.2}.",
            d.regime_confidence * 100.0,
            d.score,
            d.alignment
        ),
    }
}

fn is_moderate_buy(d: &DecisionInputs) -> bool {
    d.regime == Regime::Bull
        && d.score > MODERATE_SCORE
        && d.sentiment_confidence > MODERATE_SENTIMENT_CONFIDENCE
}

fn moderate_buy(d: &DecisionInputs) -> RawDecision {
    RawDecision {
        rule: "moderate_buy",
        signal: SignalAction::Buy,
        confidence: (d.sentiment_confidence + d.regime_confidence + d.alignment + 1.0) / 4.0,
        reasoning: format!(
            "Moderate BUY: Bullish regime with positive sentiment ({:+.2}). \
             Favorable macro conditions support upside potential.",
            d.score
        ),
    }
}

fn is_strong_sell(d: &DecisionInputs) -> bool {
    d.regime == Regime::Bear
        && d.score < -STRONG_SCORE
        && d.sentiment_confidence > STRONG_SENTIMENT_CONFIDENCE
        && d.alignment > STRONG_ALIGNMENT
}

fn strong_sell(d: &DecisionInputs) -> RawDecision {
    RawDecision {
        rule: "strong_sell",
        signal: SignalAction::Sell,
        confidence: d.mean_confidence().min(STRONG_CONFIDENCE_CAP),
        reasoning: format!(
            "Strong SELL: Bearish regime ({:.0}% confidence) aligned with very negative sentiment ({:+.2}). \
             High risk of downside with alignment score {:.2}.",
            d.regime_confidence * 100.0,
            d.score,
            d.alignment
        ),
    }
}

fn is_moderate_sell(d: &DecisionInputs) -> bool {
    d.regime == Regime::Bear
        && d.score < -MODERATE_SCORE
        && d.sentiment_confidence > MODERATE_SENTIMENT_CONFIDENCE
}

fn moderate_sell(d: &DecisionInputs) -> RawDecision {
    RawDecision {
        rule: "moderate_sell",
        signal: SignalAction::Sell,
        confidence: (d.sentiment_confidence + d.regime_confidence + d.alignment + 1.0) / 4.0,
        reasoning: format!(
            "Moderate SELL: Bearish regime with negative sentiment ({:+.2}). \
             Unfavorable macro conditions suggest caution.",
            d.score
        ),
    }
}

fn is_contrarian_buy(d: &DecisionInputs) -> bool {
    d.regime == Regime::Bear
        && d.score > CONTRARIAN_SCORE
        && d.sentiment_confidence > CONTRARIAN_SENTIMENT_CONFIDENCE
}

fn contrarian_buy(d: &DecisionInputs) -> RawDecision {
    RawDecision {
        rule: "contrarian_buy",
        signal: SignalAction::Buy,
        confidence: d.sentiment_confidence * CONTRARIAN_DISCOUNT,
        reasoning: format!(
            "Contrarian BUY: Strong positive sentiment ({:+.2}) diverges from bearish regime. \
             Potential opportunity if sentiment proves correct. HIGHER RISK - divergence trade.",
            d.score
        ),
    }
}

fn is_contrarian_sell(d: &DecisionInputs) -> bool {
    d.regime == Regime::Bull
        && d.score < -CONTRARIAN_SCORE
        && d.sentiment_confidence > CONTRARIAN_SENTIMENT_CONFIDENCE
}

fn contrarian_sell(d: &DecisionInputs) -> RawDecision {
    RawDecision {
        rule: "contrarian_sell",
        signal: SignalAction::Sell,
        confidence: d.sentiment_confidence * CONTRARIAN_DISCOUNT,
        reasoning: format!(
            "Contrarian SELL: Strong negative sentiment ({:+.2}) diverges from bullish regime. \
             Warning signal despite favorable macro. HIGHER RISK - divergence trade.",
            d.score
        ),
    }
}

fn is_cautious_buy(d: &DecisionInputs) -> bool {
    d.regime == Regime::Transition
        && d.score > TRANSITION_SCORE
        && d.sentiment_confidence > TRANSITION_SENTIMENT_CONFIDENCE
}

fn cautious_buy(d: &DecisionInputs) -> RawDecision {
    RawDecision {
        rule: "transition_buy",
        signal: SignalAction::Buy,
        confidence: d.sentiment_confidence * TRANSITION_DISCOUNT,
        reasoning: format!(
            "Cautious BUY: Positive sentiment ({:+.2}) in transitioning market. \
             Wait for regime clarity for higher conviction.",
            d.score
        ),
    }
}

fn is_cautious_sell(d: &DecisionInputs) -> bool {
    d.regime == Regime::Transition
        && d.score < -TRANSITION_SCORE
        && d.sentiment_confidence > TRANSITION_SENTIMENT_CONFIDENCE
}

fn cautious_sell(d: &DecisionInputs) -> RawDecision {
    RawDecision {
        rule: "transition_sell",
        signal: SignalAction::Sell,
        confidence: d.sentiment_confidence * TRANSITION_DISCOUNT,
        reasoning: format!(
            "Cautious SELL: Negative sentiment ({:+.2}) in transitioning market. \
             Macro uncertainty adds risk.",
            d.score
        ),
    }
}

/// Fallback when no cascade rule matches.
pub fn default_hold(d: &DecisionInputs) -> RawDecision {
    RawDecision {
        rule: "hold",
        signal: SignalAction::Hold,
        confidence: d.mean_confidence().max(HOLD_CONFIDENCE_FLOOR),
        reasoning: format!(
            "HOLD: Mixed signals - sentiment {:+.2}, regime {}. \
             Insufficient conviction for directional bet. Wait for clearer setup.",
            d.score, d.regime
        ),
    }
}

/// Ordered by priority; first match wins.
pub const CASCADE: [CascadeRule; 8] = [
    CascadeRule { name: "strong_buy", applies: is_strong_buy, decide: strong_buy },
    CascadeRule { name: "moderate_buy", applies: is_moderate_buy, decide: moderate_buy },
    CascadeRule { name: "strong_sell", applies: is_strong_sell, decide: strong_sell },
    CascadeRule { name: "moderate_sell", applies: is_moderate_sell, decide: moderate_sell },
    CascadeRule { name: "contrarian_buy", applies: is_contrarian_buy, decide: contrarian_buy },
    CascadeRule { name: "contrarian_sell", applies: is_contrarian_sell, decide: contrarian_sell },
    CascadeRule { name: "transition_buy", applies: is_cautious_buy, decide: cautious_buy },
    CascadeRule { name: "transition_sell", applies: is_cautious_sell, decide: cautious_sell },
];

pub fn determine_signal(inputs: &DecisionInputs) -> RawDecision {
    CASCADE
        .iter()
        .find(|rule| (rule.applies)(inputs))
        .map(|rule| (rule.decide)(inputs))
        .unwrap_or_else(|| default_hold(inputs))
}

/// Risk from sentiment pointing against the regime.
pub fn divergence_risk(score: f64, regime: Regime) -> f64 {
    match regime {
        Regime::Bull if score < 0.0 => score.abs(),
        Regime::Bear if score > 0.0 => score.abs(),
        Regime::Transition => score.abs() * 0.5,
        _ => 0.0,
    }
}

pub fn regime_base_risk(regime: Regime) -> f64 {
    match regime {
        Regime::Bear => BEAR_BASE_RISK,
        Regime::Transition => TRANSITION_BASE_RISK,
        Regime::Bull => BULL_BASE_RISK,
    }
}

/// Mean of the available risk factors, each in [0, 1].
pub fn risk_score(inputs: &DecisionInputs, context: Option<&MarketContext>) -> f64 {
    let mut factors = vec![
        1.0 - inputs.sentiment_confidence,
        1.0 - inputs.regime_confidence,
        divergence_risk(inputs.score, inputs.regime),
    ];
    if let Some(volatility) = context.and_then(|c| c.volatility) {
        factors.push((volatility / VOLATILITY_CEILING).min(1.0));
    }
    factors.push(regime_base_risk(inputs.regime));

    let mean = factors.iter().sum::<f64>() / factors.len() as f64;
    mean.clamp(0.0, 1.0)
}

pub fn regime_multiplier(signal: SignalAction, regime: Regime) -> f64 {
    match (regime, signal) {
        (Regime::Bull, SignalAction::Buy) => BULL_BUY_MULTIPLIER,
        (Regime::Bear, SignalAction::Sell) => BEAR_SELL_MULTIPLIER,
        (Regime::Transition, _) => TRANSITION_MULTIPLIER,
        _ => CONTRARIAN_MULTIPLIER,
    }
}

/// Suggested size on a 1-10 scale; 0 for HOLD.
pub fn position_size(signal: SignalAction, confidence: f64, risk: f64, regime: Regime) -> u8 {
    if signal == SignalAction::Hold {
        return 0;
    }
    let base = confidence * 10.0;
    let risk_adjustment = (1.0 - risk) * 5.0;
    let size = ((base + risk_adjustment) / 2.0 * regime_multiplier(signal, regime)).round_ties_even();
    size.clamp(MIN_POSITION as f64, MAX_POSITION as f64) as u8
}

/// The raw decision as seen by the override layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub signal: SignalAction,
    pub confidence: f64,
    pub risk: f64,
    pub regime: Regime,
    pub regime_confidence: f64,
}

pub struct OverrideRule {
    pub name: &'static str,
    pub fires: fn(&Candidate) -> bool,
    pub note: fn(&Candidate) -> String,
}

fn bear_buy_unconvincing(c: &Candidate) -> bool {
    c.regime == Regime::Bear
        && c.signal == SignalAction::Buy
        && (c.confidence < BEAR_BUY_MIN_CONFIDENCE || c.regime_confidence > BEAR_BUY_MAX_REGIME_CONFIDENCE)
}

fn bear_buy_unconvincing_note(_: &Candidate) -> String {
    "OVERRIDE: BUY signal downgraded to HOLD - bearish regime with insufficient confidence for contrarian position"
        .to_string()
}

fn risk_too_high(c: &Candidate) -> bool {
    c.risk > MAX_RISK && c.signal != SignalAction::Hold
}

fn risk_too_high_note(c: &Candidate) -> String {
    format!(
        "OVERRIDE: {} signal downgraded to HOLD - risk score too high ({:.2})",
        c.signal, c.risk
    )
}

fn sell_against_strong_bull(c: &Candidate) -> bool {
    c.regime == Regime::Bull
        && c.signal == SignalAction::Sell
        && c.regime_confidence > CONTRARIAN_REGIME_CONFIDENCE
}

fn sell_against_strong_bull_note(c: &Candidate) -> String {
    format!(
        "OVERRIDE: SELL signal downgraded to HOLD - contrarian to strong bullish regime ({:.0}% confidence)",
        c.regime_confidence * 100.0
    )
}

fn buy_against_strong_bear(c: &Candidate) -> bool {
    c.regime == Regime::Bear
        && c.signal == SignalAction::Buy
        && c.regime_confidence > CONTRARIAN_REGIME_CONFIDENCE
}

fn buy_against_strong_bear_note(c: &Candidate) -> String {
    format!(
        "OVERRIDE: BUY signal downgraded to HOLD - contrarian to strong bearish regime ({:.0}% confidence)",
        c.regime_confidence * 100.0
    )
}

fn confidence_too_low(c: &Candidate) -> bool {
    c.confidence < MIN_CONFIDENCE && c.signal != SignalAction::Hold
}

fn confidence_too_low_note(c: &Candidate) -> String {
    format!(
        "OVERRIDE: {} signal downgraded to HOLD - confidence too low ({:.0}%)",
        c.signal,
        c.confidence * 100.0
    )
}

/// Every rule is checked against the raw candidate; all matching notes are kept.
pub const OVERRIDES: [OverrideRule; 5] = [
    OverrideRule { name: "bear_buy_unconvincing", fires: bear_buy_unconvincing, note: bear_buy_unconvincing_note },
    OverrideRule { name: "risk_too_high", fires: risk_too_high, note: risk_too_high_note },
    OverrideRule { name: "sell_against_strong_bull", fires: sell_against_strong_bull, note: sell_against_strong_bull_note },
    OverrideRule { name: "buy_against_strong_bear", fires: buy_against_strong_bear, note: buy_against_strong_bear_note },
    OverrideRule { name: "confidence_too_low", fires: confidence_too_low, note: confidence_too_low_note },
];

/// Returns the final signal and the validation notes.
pub fn validate_signal(candidate: &Candidate) -> (SignalAction, Vec<String>) {
    let notes: Vec<String> = OVERRIDES
        .iter()
        .filter(|rule| (rule.fires)(candidate))
        .map(|rule| {
            debug!("[SIGNAL] override '{}' fired", rule.name);
            (rule.note)(candidate)
        })
        .collect();

    if notes.is_empty() {
        (candidate.signal, vec![NO_OVERRIDES_NOTE.to_string()])
    } else {
        (SignalAction::Hold, notes)
    }
}

fn normalize_ticker(ticker: &str) -> FusionResult<String> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(FusionError::invalid("ticker", ticker, "must not be empty"));
    }
    Ok(ticker.to_uppercase())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SignalDecisionEngine;

impl SignalDecisionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_signal(
        &self,
        ticker: &str,
        sentiment: &SentimentAssessment,
        regime: &RegimeClassification,
        context: Option<&MarketContext>,
    ) -> FusionResult<TradingSignal> {
        self.generate_signal_at(ticker, sentiment, regime, context, Utc::now())
    }

    /// Same as `generate_signal` with an explicit timestamp; identical inputs give identical output.
    pub fn generate_signal_at(
        &self,
        ticker: &str,
        sentiment: &SentimentAssessment,
        regime: &RegimeClassification,
        context: Option<&MarketContext>,
        now: DateTime<Utc>,
    ) -> FusionResult<TradingSignal> {
        let ticker = normalize_ticker(ticker)?;
        sentiment.validate()?;
        regime.validate()?;
        if let Some(ctx) = context {
            ctx.validate()?;
        }

        let inputs = DecisionInputs::new(sentiment, regime);
        let raw = determine_signal(&inputs);
        let risk = risk_score(&inputs, context);
        let raw_size = position_size(raw.signal, raw.confidence, risk, inputs.regime);

        let (signal, validation_notes) = validate_signal(&Candidate {
            signal: raw.signal,
            confidence: raw.confidence,
            risk,
            regime: inputs.regime,
            regime_confidence: inputs.regime_confidence,
        });

        let position_size = if signal == raw.signal { raw_size } else { 0 };
        if signal != raw.signal {
            warn!(
                "🛡️ [SIGNAL] {} {} downgraded to HOLD ({} override(s))",
                ticker,
                raw.signal,
                validation_notes.len()
            );
        }

        info!(
            "📊 [SIGNAL] {}: {} via {} (confidence: {:.2}, risk: {:.2}, position: {}/10)",
            ticker, signal, raw.rule, raw.confidence, risk, position_size
        );

        Ok(TradingSignal {
            ticker,
            signal,
            raw_signal: raw.signal,
            confidence: round3(raw.confidence),
            risk_score: round3(risk),
            position_size,
            raw_position_size: raw_size,
            reasoning: raw.reasoning,
            validation_notes,
            factors: SignalFactors {
                sentiment_score: sentiment.score,
                sentiment_label: sentiment.label,
                sentiment_confidence: sentiment.confidence,
                regime: regime.regime,
                regime_confidence: regime.confidence,
            },
            timestamp: now,
        })
    }
}
