use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bus::EventBus;
use crate::constants::verdict::{ALIGNMENT_SCORE, STRONG_SCORE};
use crate::error::FusionResult;
use crate::events::{AlertEvent, Event};
use crate::services::alerts::{AlertMonitor, AnalysisBundle};
use crate::services::regime::RegimeClassifier;
use crate::services::reporting::SignalReporter;
use crate::services::signal::SignalDecisionEngine;
use crate::types::{
    MacroIndicatorSet, MarketContext, Recommendation, Regime, RegimeClassification,
    SentimentAssessment, TradingSignal,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub sentiment: SentimentAssessment,
    pub indicators: MacroIndicatorSet,
    #[serde(default)]
    pub context: Option<MarketContext>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "NEUTRAL/WATCH")]
    Watch,
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::StrongBuy => "STRONG BUY",
            Verdict::Buy => "BUY",
            Verdict::StrongSell => "STRONG SELL",
            Verdict::Sell => "SELL",
            Verdict::Watch => "NEUTRAL/WATCH",
            Verdict::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse verdict from sentiment score and regime alone, with its reasoning.
pub fn overall_verdict(score: f64, regime: Regime) -> (Verdict, &'static str) {
    match regime {
        Regime::Bull if score > STRONG_SCORE => (
            Verdict::StrongBuy,
            "Bullish macro regime + positive earnings sentiment = favorable setup",
        ),
        Regime::Bull if score > 0.0 => (
            Verdict::Buy,
            "Bullish macro regime supports moderately positive earnings",
        ),
        Regime::Bear if score < -STRONG_SCORE => (
            Verdict::StrongSell,
            "Bearish macro regime + negative earnings sentiment = high risk",
        ),
        Regime::Bear if score < 0.0 => (
            Verdict::Sell,
            "Bearish macro regime amplifies negative earnings sentiment",
        ),
        Regime::Bear if score > STRONG_SCORE => (
            Verdict::Watch,
            "Positive earnings may not overcome bearish macro headwinds",
        ),
        Regime::Bull if score < -STRONG_SCORE => (
            Verdict::Watch,
            "Bullish macro offset by disappointing earnings",
        ),
        _ => (Verdict::Neutral, "Mixed signals warrant cautious approach"),
    }
}

pub fn alignment_label(score: f64, regime: Regime) -> &'static str {
    match regime {
        Regime::Bull if score > ALIGNMENT_SCORE => {
            "ALIGNED - Positive earnings confirm bullish macro environment"
        }
        Regime::Bear if score < -ALIGNMENT_SCORE => {
            "ALIGNED - Negative earnings confirm bearish macro concerns"
        }
        Regime::Bull if score < -ALIGNMENT_SCORE => {
            "DIVERGENT - Negative earnings contradict bullish macro (WARNING)"
        }
        Regime::Bear if score > ALIGNMENT_SCORE => {
            "DIVERGENT - Positive earnings diverge from bearish macro (OPPORTUNITY?)"
        }
        _ => "NEUTRAL - No strong alignment or divergence",
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub ticker: String,
    pub classification: RegimeClassification,
    pub recommendation: Recommendation,
    pub signal: TradingSignal,
    pub alerts: Vec<AlertEvent>,
    pub verdict: Verdict,
    pub verdict_reasoning: String,
    pub alignment: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Runs classify → recommend → signal → alerts for one ticker.
#[derive(Clone)]
pub struct AnalysisPipeline {
    classifier: RegimeClassifier,
    engine: SignalDecisionEngine,
    monitor: AlertMonitor,
    reporter: SignalReporter,
    bus: Option<EventBus>,
}

impl AnalysisPipeline {
    pub fn new(monitor: AlertMonitor, reporter: SignalReporter) -> Self {
        Self {
            classifier: RegimeClassifier::new(),
            engine: SignalDecisionEngine::new(),
            monitor,
            reporter,
            bus: None,
        }
    }

    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn monitor(&self) -> &AlertMonitor {
        &self.monitor
    }

    pub fn reporter(&self) -> &SignalReporter {
        &self.reporter
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> FusionResult<AnalysisReport> {
        self.analyze_at(request, Utc::now()).await
    }

    pub async fn analyze_at(
        &self,
        request: &AnalysisRequest,
        now: DateTime<Utc>,
    ) -> FusionResult<AnalysisReport> {
        let classification = self.classifier.classify(&request.indicators)?;
        let recommendation = self.classifier.recommend(&classification)?;
        let signal = self.engine.generate_signal_at(
            &request.ticker,
            &request.sentiment,
            &classification,
            request.context.as_ref(),
            now,
        )?;
        self.reporter.record(&signal);
        if let Some(bus) = &self.bus {
            bus.notify(Event::Signal(signal.clone()));
        }

        let bundle = AnalysisBundle::new(&signal.ticker, request.sentiment, &classification)
            .with_recommendation(&recommendation);
        let alerts = self.monitor.check_alerts_at(&bundle, now).await?.alerts;

        let score = request.sentiment.score;
        let (verdict, reasoning) = overall_verdict(score, classification.regime);
        info!(
            "🧭 [PIPELINE] {}: {} ({} regime, signal {}, {} alert(s))",
            signal.ticker,
            verdict,
            classification.regime,
            signal.signal,
            alerts.len()
        );

        Ok(AnalysisReport {
            ticker: signal.ticker.clone(),
            alignment: alignment_label(score, classification.regime).to_string(),
            classification,
            recommendation,
            signal,
            alerts,
            verdict,
            verdict_reasoning: reasoning.to_string(),
            analyzed_at: now,
        })
    }
}
