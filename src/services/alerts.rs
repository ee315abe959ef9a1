//! Stateful alert monitor.
//!
//! `evaluate_alerts` is the pure rule set: it takes a finished analysis and the
//! previously persisted regime and returns the alerts plus the regime state to
//! persist. `AlertMonitor` wraps it with the persistence handle, serializing
//! every read-modify-write of the shared regime row and bounded history.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::bus::EventBus;
use crate::constants::alerts::*;
use crate::data::store::AlertStore;
use crate::error::{FusionError, FusionResult};
use crate::events::{AlertEvent, AlertHistoryEntry, AlertSeverity, AlertType, Event};
use crate::types::{
    Recommendation, RecommendationAction, Regime, RegimeClassification, RegimeState, RiskLevel,
    SentimentAssessment, SentimentLabel,
};

/// A completed analysis as seen by the monitor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub ticker: String,
    pub sentiment: SentimentAssessment,
    pub regime: Regime,
    pub regime_confidence: Option<f64>,
    pub recommendation: Option<RecommendationAction>,
    pub risk_level: Option<RiskLevel>,
}

impl AnalysisBundle {
    pub fn new(ticker: &str, sentiment: SentimentAssessment, classification: &RegimeClassification) -> Self {
        Self {
            ticker: ticker.trim().to_uppercase(),
            sentiment,
            regime: classification.regime,
            regime_confidence: Some(classification.confidence),
            recommendation: None,
            risk_level: None,
        }
    }

    pub fn with_recommendation(mut self, recommendation: &Recommendation) -> Self {
        self.recommendation = Some(recommendation.action);
        self.risk_level = Some(recommendation.risk_level);
        self
    }

    /// Copy with the ticker trimmed and uppercased, the form history is keyed by.
    pub fn normalized(&self) -> Self {
        Self {
            ticker: self.ticker.trim().to_uppercase(),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> FusionResult<()> {
        if self.ticker.trim().is_empty() {
            return Err(FusionError::invalid("ticker", &self.ticker, "must not be empty"));
        }
        self.sentiment.validate()?;
        if let Some(confidence) = self.regime_confidence {
            crate::error::ensure_range("regime_confidence", confidence, 0.0, 1.0)?;
        }
        Ok(())
    }
}

/// Result of one alert evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertCheck {
    pub alerts: Vec<AlertEvent>,
    pub new_state: RegimeState,
    /// Set when `new_state` differs from the prior state and must be written
    pub state_changed: bool,
}

fn extreme_sentiment(bundle: &AnalysisBundle, now: DateTime<Utc>) -> Option<AlertEvent> {
    let score = bundle.sentiment.score;
    if score.abs() <= EXTREME_SENTIMENT_SCORE {
        return None;
    }
    let mood = if score > 0.0 { "VERY BULLISH" } else { "VERY BEARISH" };
    Some(AlertEvent::new(
        AlertType::ExtremeSentiment,
        AlertSeverity::High,
        Some(bundle.ticker.clone()),
        format!("{} shows {} sentiment", bundle.ticker, mood),
        json!({
            "sentiment_score": score,
            "sentiment_label": bundle.sentiment.label,
            "confidence": bundle.sentiment.confidence,
        }),
        now,
    ))
}

fn sentiment_divergence(bundle: &AnalysisBundle, now: DateTime<Utc>) -> Option<AlertEvent> {
    let reason = match (bundle.regime, bundle.sentiment.label) {
        (Regime::Bull, SentimentLabel::Negative) => "Negative sentiment in BULL market",
        (Regime::Bear, SentimentLabel::Positive) => "Positive sentiment in BEAR market",
        _ => return None,
    };
    Some(AlertEvent::new(
        AlertType::SentimentDivergence,
        AlertSeverity::Medium,
        Some(bundle.ticker.clone()),
        format!("{}: Sentiment diverges from macro regime", bundle.ticker),
        json!({
            "sentiment": bundle.sentiment.label,
            "regime": bundle.regime,
            "reason": reason,
        }),
        now,
    ))
}

fn regime_change(
    bundle: &AnalysisBundle,
    prior: Option<&RegimeState>,
    now: DateTime<Utc>,
) -> Option<AlertEvent> {
    let prior = prior?;
    if prior.regime == bundle.regime {
        return None;
    }
    Some(AlertEvent::new(
        AlertType::RegimeChange,
        AlertSeverity::Critical,
        None,
        format!("Macro regime changed: {} → {}", prior.regime, bundle.regime),
        json!({
            "old_regime": prior.regime,
            "new_regime": bundle.regime,
            "confidence": bundle.regime_confidence,
        }),
        now,
    ))
}

fn high_confidence(bundle: &AnalysisBundle, now: DateTime<Utc>) -> Option<AlertEvent> {
    let confidence = bundle.sentiment.confidence;
    if confidence <= HIGH_CONFIDENCE {
        return None;
    }
    Some(AlertEvent::new(
        AlertType::HighConfidence,
        AlertSeverity::Low,
        Some(bundle.ticker.clone()),
        format!("{}: Very confident analysis ({:.0}%)", bundle.ticker, confidence * 100.0),
        json!({
            "confidence": confidence,
            "sentiment": bundle.sentiment.label,
            "score": bundle.sentiment.score,
        }),
        now,
    ))
}

fn trading_signal(bundle: &AnalysisBundle, now: DateTime<Utc>) -> Option<AlertEvent> {
    let action = bundle.recommendation?;
    let severity = match action {
        RecommendationAction::Favorable => AlertSeverity::Medium,
        RecommendationAction::Avoid => AlertSeverity::High,
        RecommendationAction::Caution => return None,
    };
    Some(AlertEvent::new(
        AlertType::TradingSignal,
        severity,
        Some(bundle.ticker.clone()),
        format!("{}: {} trading conditions", bundle.ticker, action),
        json!({
            "recommendation": action,
            "regime": bundle.regime,
            "sentiment": bundle.sentiment.label,
            "risk_level": bundle.risk_level.map(|r| r.as_str()).unwrap_or("UNKNOWN"),
        }),
        now,
    ))
}

/// Evaluate every alert rule independently. A missing prior state sets the
/// baseline without raising REGIME_CHANGE.
pub fn evaluate_alerts(
    bundle: &AnalysisBundle,
    prior: Option<&RegimeState>,
    now: DateTime<Utc>,
) -> AlertCheck {
    let alerts: Vec<AlertEvent> = [
        extreme_sentiment(bundle, now),
        sentiment_divergence(bundle, now),
        regime_change(bundle, prior, now),
        high_confidence(bundle, now),
        trading_signal(bundle, now),
    ]
    .into_iter()
    .flatten()
    .collect();

    let (new_state, state_changed) = match prior {
        Some(state) if state.regime == bundle.regime => (*state, false),
        _ => (RegimeState::new(bundle.regime, now), true),
    };

    AlertCheck {
        alerts,
        new_state,
        state_changed,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStats {
    pub total_alerts: usize,
    pub alerts_by_type: BTreeMap<AlertType, usize>,
    pub alerts_by_severity: BTreeMap<AlertSeverity, usize>,
    pub recent_24h: usize,
}

/// Counts over a history snapshot, relative to `now`.
pub fn compute_stats(history: &[AlertHistoryEntry], now: DateTime<Utc>) -> AlertStats {
    let cutoff = now - Duration::hours(RECENT_WINDOW_HOURS);
    let mut stats = AlertStats {
        total_alerts: history.len(),
        ..AlertStats::default()
    };
    for entry in history {
        *stats.alerts_by_type.entry(entry.alert.alert_type).or_insert(0) += 1;
        *stats.alerts_by_severity.entry(entry.alert.severity).or_insert(0) += 1;
        if entry.recorded_at >= cutoff {
            stats.recent_24h += 1;
        }
    }
    stats
}

#[derive(Clone)]
pub struct AlertMonitor {
    store: Arc<dyn AlertStore>,
    history_limit: usize,
    bus: Option<EventBus>,
    // Held across each check so regime detection and history bounds stay consistent
    check_lock: Arc<Mutex<()>>,
}

impl AlertMonitor {
    pub fn new(store: Arc<dyn AlertStore>, history_limit: usize) -> Self {
        Self {
            store,
            history_limit,
            bus: None,
            check_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub async fn check_alerts(&self, bundle: &AnalysisBundle) -> FusionResult<AlertCheck> {
        self.check_alerts_at(bundle, Utc::now()).await
    }

    /// Load the prior regime, evaluate, then commit history and regime in one
    /// store operation, all under one lock. A failed commit leaves both as
    /// they were and is returned to the caller.
    pub async fn check_alerts_at(
        &self,
        bundle: &AnalysisBundle,
        now: DateTime<Utc>,
    ) -> FusionResult<AlertCheck> {
        let bundle = bundle.normalized();
        bundle.validate()?;
        let _guard = self.check_lock.lock().await;

        let prior = self.store.load_regime().await.map_err(|e| {
            error!("❌ [ALERTS] Failed to load regime state: {}", e);
            FusionError::from(e)
        })?;
        if prior.is_none() {
            info!("📌 [ALERTS] No stored regime; {} becomes the baseline", bundle.regime);
        }

        let check = evaluate_alerts(&bundle, prior.as_ref(), now);

        let entries: Vec<AlertHistoryEntry> = check
            .alerts
            .iter()
            .map(|alert| AlertHistoryEntry {
                alert: alert.clone(),
                ticker: bundle.ticker.clone(),
                recorded_at: now,
            })
            .collect();
        let regime = check.state_changed.then_some(check.new_state);
        if !entries.is_empty() || regime.is_some() {
            let evicted = self
                .store
                .commit(&entries, regime, self.history_limit)
                .await
                .map_err(|e| {
                    error!("❌ [ALERTS] Failed to persist alert check: {}", e);
                    FusionError::from(e)
                })?;
            if evicted > 0 {
                info!("🧹 [ALERTS] Evicted {} oldest alert(s) from history", evicted);
            }
        }

        if let (Some(bus), Some(prior)) = (&self.bus, prior) {
            if prior.regime != check.new_state.regime {
                bus.notify(Event::RegimeChanged {
                    from: prior.regime,
                    to: check.new_state.regime,
                    at: now,
                });
            }
        }
        if let Some(bus) = &self.bus {
            for alert in &check.alerts {
                bus.notify(Event::Alert(alert.clone()));
            }
        }

        for alert in &check.alerts {
            match alert.severity {
                AlertSeverity::Critical | AlertSeverity::High => {
                    warn!("🚨 [ALERTS] [{}] {}: {}", alert.severity, alert.alert_type, alert.message)
                }
                _ => info!("🔔 [ALERTS] [{}] {}: {}", alert.severity, alert.alert_type, alert.message),
            }
        }
        info!("[ALERTS] Found {} alert(s) for {}", check.alerts.len(), bundle.ticker);

        Ok(check)
    }

    /// Most recent entries first, optionally filtered by ticker.
    pub async fn history(&self, limit: usize, ticker: Option<&str>) -> FusionResult<Vec<AlertHistoryEntry>> {
        let history = self.store.list().await?;
        let ticker = ticker.map(|t| t.trim().to_uppercase());
        Ok(history
            .into_iter()
            .rev()
            .filter(|entry| ticker.as_ref().map_or(true, |t| &entry.ticker == t))
            .take(limit)
            .collect())
    }

    pub async fn stats(&self) -> FusionResult<AlertStats> {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> FusionResult<AlertStats> {
        let history = self.store.list().await?;
        Ok(compute_stats(&history, now))
    }

    pub async fn current_regime(&self) -> FusionResult<Option<RegimeState>> {
        Ok(self.store.load_regime().await?)
    }
}
