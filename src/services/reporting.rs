use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::report::*;
use crate::types::{SignalAction, TradingSignal};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub buys: u64,
    pub sells: u64,
    pub holds: u64,
    /// Signals the validation layer forced to HOLD
    pub overridden: u64,
    pub last_signal: Option<SignalAction>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub total_signals: u64,
    pub buys: u64,
    pub sells: u64,
    pub holds: u64,
    pub overridden: u64,
    pub per_ticker: HashMap<String, TickerSummary>,
}

/// Caller-owned, unbounded history of generated signals keyed by ticker.
#[derive(Clone, Default)]
pub struct SignalReporter {
    history: Arc<DashMap<String, Vec<TradingSignal>>>,
}

impl SignalReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, signal: &TradingSignal) {
        self.history
            .entry(signal.ticker.clone())
            .or_default()
            .push(signal.clone());
    }

    /// Most recent signals for one ticker, newest first.
    pub fn history(&self, ticker: &str, limit: usize) -> Vec<TradingSignal> {
        self.history
            .get(&ticker.trim().to_uppercase())
            .map(|signals| signals.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Most recent signals across all tickers, newest first.
    pub fn recent(&self, limit: usize) -> Vec<TradingSignal> {
        let mut all: Vec<TradingSignal> = self
            .history
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(limit);
        all
    }

    pub fn len(&self) -> usize {
        self.history.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        self.history.clear();
        info!("🧹 [REPORT] Signal history reset");
    }

    pub fn summary(&self) -> SignalSummary {
        let mut summary = SignalSummary::default();
        for entry in self.history.iter() {
            let ticker = summary.per_ticker.entry(entry.key().clone()).or_default();
            for signal in entry.value() {
                match signal.signal {
                    SignalAction::Buy => ticker.buys += 1,
                    SignalAction::Sell => ticker.sells += 1,
                    SignalAction::Hold => ticker.holds += 1,
                }
                if signal.was_overridden() {
                    ticker.overridden += 1;
                }
            }
            ticker.last_signal = entry.value().last().map(|s| s.signal);
        }
        for ticker in summary.per_ticker.values() {
            summary.buys += ticker.buys;
            summary.sells += ticker.sells;
            summary.holds += ticker.holds;
            summary.overridden += ticker.overridden;
        }
        summary.total_signals = summary.buys + summary.sells + summary.holds;
        summary
    }
}

pub fn risk_band(risk: f64) -> &'static str {
    if risk < LOW_RISK_BELOW {
        "LOW"
    } else if risk < MODERATE_RISK_BELOW {
        "MODERATE"
    } else {
        "HIGH"
    }
}

pub fn sizing_band(position_size: u8) -> &'static str {
    if position_size > AGGRESSIVE_SIZE_ABOVE {
        "AGGRESSIVE - High conviction setup"
    } else if position_size > MODERATE_SIZE_ABOVE {
        "MODERATE - Standard position"
    } else if position_size > 0 {
        "CONSERVATIVE - Lower conviction or higher risk"
    } else {
        "ZERO - No position recommended"
    }
}

/// Human-readable trading thesis for one signal.
pub fn render_report(signal: &TradingSignal, company: Option<&str>) -> String {
    let rule = "=".repeat(80);
    let sub = "-".repeat(80);
    let company = company.unwrap_or(&signal.ticker);
    let factors = &signal.factors;
    let mut lines: Vec<String> = Vec::new();

    lines.push(rule.clone());
    lines.push(format!("TRADING SIGNAL REPORT: {} ({})", company, signal.ticker));
    lines.push(rule.clone());
    lines.push(String::new());

    let marker = match signal.signal {
        SignalAction::Buy => "🟢",
        SignalAction::Sell => "🔴",
        SignalAction::Hold => "🟡",
    };
    lines.push("SIGNAL SUMMARY".to_string());
    lines.push(sub.clone());
    lines.push(format!("{} Signal: {}", marker, signal.signal));
    lines.push(format!("   Confidence: {:.0}%", signal.confidence * 100.0));
    lines.push(format!("   Position Size: {}/10", signal.position_size));
    lines.push(format!("   Risk Score: {:.0}%", signal.risk_score * 100.0));
    lines.push(String::new());

    lines.push("THESIS".to_string());
    lines.push(sub.clone());
    lines.push(signal.reasoning.clone());
    lines.push(String::new());

    lines.push("ANALYSIS FACTORS".to_string());
    lines.push(sub.clone());
    lines.push(format!(
        "Sentiment Score: {:+.3} ({})",
        factors.sentiment_score, factors.sentiment_label
    ));
    lines.push(format!("Sentiment Confidence: {:.0}%", factors.sentiment_confidence * 100.0));
    lines.push(format!("Macro Regime: {}", factors.regime));
    lines.push(format!("Macro Confidence: {:.0}%", factors.regime_confidence * 100.0));
    lines.push(String::new());

    lines.push("RISK ASSESSMENT".to_string());
    lines.push(sub.clone());
    lines.push(format!(
        "Risk Level: {} ({:.0}%)",
        risk_band(signal.risk_score),
        signal.risk_score * 100.0
    ));
    lines.push(format!("Position Sizing: {}", sizing_band(signal.position_size)));
    lines.push(String::new());

    if signal.was_overridden() {
        lines.push("⚠️  RISK MANAGEMENT OVERRIDES".to_string());
        lines.push(sub.clone());
        lines.push(format!("Raw signal: {} (size {}/10)", signal.raw_signal, signal.raw_position_size));
        lines.extend(signal.validation_notes.iter().cloned());
        lines.push(String::new());
    }

    lines.push("SUGGESTED ACTIONS".to_string());
    lines.push(sub);
    match signal.signal {
        SignalAction::Buy => {
            lines.push(format!(
                "1. Consider buying {} with {}% of intended allocation",
                signal.ticker,
                u32::from(signal.position_size) * 10
            ));
            lines.push("2. Set stop-loss based on recent support levels".to_string());
            lines.push("3. Monitor sentiment trends for confirmation".to_string());
            if signal.risk_score > MODERATE_RISK_BELOW {
                lines.push("4. ⚠️  HIGH RISK: Consider scaling into position".to_string());
            }
        }
        SignalAction::Sell => {
            lines.push(format!("1. Consider selling or reducing {} position", signal.ticker));
            if signal.position_size > 5 {
                lines.push("2. Exit aggressively - high conviction bearish signal".to_string());
            } else {
                lines.push("2. Scale out gradually to reduce risk".to_string());
            }
            lines.push("3. Monitor for trend reversal signals".to_string());
        }
        SignalAction::Hold => {
            lines.push("1. Maintain current position or stay sidelined".to_string());
            lines.push("2. Wait for clearer signals before taking action".to_string());
            lines.push("3. Monitor for sentiment or macro regime changes".to_string());
            lines.push("4. Set alerts for key technical levels".to_string());
        }
    }
    lines.push(String::new());

    lines.push(rule.clone());
    lines.push(format!("Report Generated: {}", signal.timestamp.to_rfc3339()));
    lines.push(rule);

    lines.join("\n")
}
