//! Unit tests for alert evaluation and the stateful monitor.

#[cfg(test)]
mod alerts_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    use crate::bus::EventBus;
    use crate::data::store::{AlertStore, FileAlertStore, MemoryAlertStore, StoreResult};
    use crate::error::{FusionError, StoreError};
    use crate::events::{AlertHistoryEntry, AlertSeverity, AlertType, Event};
    use crate::services::alerts::*;
    use crate::services::regime::recommend;
    use crate::types::{Regime, RegimeClassification, RegimeState, SentimentAssessment, SentimentLabel};

    fn bundle(ticker: &str, score: f64, confidence: f64, regime: Regime) -> AnalysisBundle {
        let label = if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };
        let sentiment = SentimentAssessment::new(label, score, confidence).unwrap();
        let classification = RegimeClassification::from_parts(regime, 0.8).unwrap();
        AnalysisBundle::new(ticker, sentiment, &classification)
    }

    fn quiet(ticker: &str, regime: Regime) -> AnalysisBundle {
        bundle(ticker, 0.0, 0.5, regime)
    }

    fn types(alerts: &[crate::events::AlertEvent]) -> Vec<AlertType> {
        alerts.iter().map(|a| a.alert_type).collect()
    }

    fn memory_monitor(limit: usize) -> AlertMonitor {
        AlertMonitor::new(Arc::new(MemoryAlertStore::new(limit)), limit)
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    #[async_trait]
    impl AlertStore for BrokenStore {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn load_regime(&self) -> StoreResult<Option<RegimeState>> {
            Ok(None)
        }

        async fn save_regime(&self, _state: RegimeState) -> StoreResult<()> {
            Err(StoreError::Corrupt("disk full".to_string()))
        }

        async fn list(&self) -> StoreResult<Vec<AlertHistoryEntry>> {
            Ok(Vec::new())
        }

        async fn commit(
            &self,
            _entries: &[AlertHistoryEntry],
            _regime: Option<RegimeState>,
            _max: usize,
        ) -> StoreResult<usize> {
            Err(StoreError::Corrupt("disk full".to_string()))
        }
    }

    /// Memory store whose next commit fails when `fail_next` is set.
    struct FlakyStore {
        inner: MemoryAlertStore,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl AlertStore for FlakyStore {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn load_regime(&self) -> StoreResult<Option<RegimeState>> {
            self.inner.load_regime().await
        }

        async fn save_regime(&self, state: RegimeState) -> StoreResult<()> {
            self.inner.save_regime(state).await
        }

        async fn list(&self) -> StoreResult<Vec<AlertHistoryEntry>> {
            self.inner.list().await
        }

        async fn commit(
            &self,
            entries: &[AlertHistoryEntry],
            regime: Option<RegimeState>,
            max: usize,
        ) -> StoreResult<usize> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Corrupt("write interrupted".to_string()));
            }
            self.inner.commit(entries, regime, max).await
        }
    }

    // ============= Rule Evaluation Tests =============

    #[test]
    fn test_extreme_positive_sentiment() {
        let check = evaluate_alerts(&bundle("aapl", 0.85, 0.6, Regime::Bull), None, Utc::now());

        assert_eq!(types(&check.alerts), vec![AlertType::ExtremeSentiment]);
        let alert = &check.alerts[0];
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.ticker.as_deref(), Some("AAPL"));
        assert_eq!(alert.message, "AAPL shows VERY BULLISH sentiment");
        assert_eq!(alert.details["sentiment_label"], "positive");
    }

    #[test]
    fn test_extreme_sentiment_threshold_is_exclusive() {
        let check = evaluate_alerts(&bundle("AAPL", 0.8, 0.6, Regime::Bull), None, Utc::now());
        assert!(check.alerts.is_empty());

        let check = evaluate_alerts(&bundle("AAPL", -0.81, 0.6, Regime::Bear), None, Utc::now());
        assert_eq!(check.alerts[0].message, "AAPL shows VERY BEARISH sentiment");
    }

    #[test]
    fn test_sentiment_divergence() {
        let check = evaluate_alerts(&bundle("MSFT", -0.4, 0.6, Regime::Bull), None, Utc::now());

        assert_eq!(types(&check.alerts), vec![AlertType::SentimentDivergence]);
        assert_eq!(check.alerts[0].severity, AlertSeverity::Medium);
        assert_eq!(check.alerts[0].details["reason"], "Negative sentiment in BULL market");
    }

    #[test]
    fn test_no_divergence_in_transition() {
        let check = evaluate_alerts(&bundle("MSFT", -0.4, 0.6, Regime::Transition), None, Utc::now());
        assert!(check.alerts.is_empty());
    }

    #[test]
    fn test_high_confidence_threshold_is_exclusive() {
        let check = evaluate_alerts(&bundle("IBM", 0.0, 0.9, Regime::Bull), None, Utc::now());
        assert!(check.alerts.is_empty());

        let check = evaluate_alerts(&bundle("IBM", 0.0, 0.95, Regime::Bull), None, Utc::now());
        assert_eq!(types(&check.alerts), vec![AlertType::HighConfidence]);
        assert_eq!(check.alerts[0].severity, AlertSeverity::Low);
        assert_eq!(check.alerts[0].message, "IBM: Very confident analysis (95%)");
    }

    #[test]
    fn test_trading_signal_alerts_follow_recommendation() {
        let strong_bull = RegimeClassification::from_parts(Regime::Bull, 0.9).unwrap();
        let favorable = recommend(&strong_bull).unwrap();
        let b = quiet("GE", Regime::Bull).with_recommendation(&favorable);
        let check = evaluate_alerts(&b, None, Utc::now());
        assert_eq!(types(&check.alerts), vec![AlertType::TradingSignal]);
        assert_eq!(check.alerts[0].severity, AlertSeverity::Medium);
        assert_eq!(check.alerts[0].message, "GE: FAVORABLE trading conditions");
        assert_eq!(check.alerts[0].details["risk_level"], "MODERATE");

        let strong_bear = RegimeClassification::from_parts(Regime::Bear, 0.9).unwrap();
        let avoid = recommend(&strong_bear).unwrap();
        let b = quiet("GE", Regime::Bear).with_recommendation(&avoid);
        let check = evaluate_alerts(&b, None, Utc::now());
        assert_eq!(check.alerts[0].severity, AlertSeverity::High);

        let transition = RegimeClassification::from_parts(Regime::Transition, 0.9).unwrap();
        let caution = recommend(&transition).unwrap();
        let b = quiet("GE", Regime::Transition).with_recommendation(&caution);
        assert!(evaluate_alerts(&b, None, Utc::now()).alerts.is_empty());
    }

    #[test]
    fn test_all_rules_fire_independently() {
        let prior = RegimeState::new(Regime::Bull, Utc::now());
        let classification = RegimeClassification::from_parts(Regime::Bear, 0.9).unwrap();
        let avoid = recommend(&classification).unwrap();
        let b = bundle("XOM", 0.9, 0.95, Regime::Bear).with_recommendation(&avoid);

        let check = evaluate_alerts(&b, Some(&prior), Utc::now());
        assert_eq!(
            types(&check.alerts),
            vec![
                AlertType::ExtremeSentiment,
                AlertType::SentimentDivergence,
                AlertType::RegimeChange,
                AlertType::HighConfidence,
                AlertType::TradingSignal,
            ]
        );
    }

    #[test]
    fn test_regime_change_against_prior() {
        let prior = RegimeState::new(Regime::Bull, Utc::now() - Duration::hours(1));
        let now = Utc::now();
        let check = evaluate_alerts(&quiet("AAPL", Regime::Bear), Some(&prior), now);

        assert_eq!(types(&check.alerts), vec![AlertType::RegimeChange]);
        let alert = &check.alerts[0];
        assert_eq!(alert.severity, AlertSeverity::Critical);
        assert!(alert.ticker.is_none());
        assert_eq!(alert.message, "Macro regime changed: BULL → BEAR");
        assert_eq!(check.new_state, RegimeState::new(Regime::Bear, now));
        assert!(check.state_changed);
    }

    #[test]
    fn test_first_observation_sets_baseline() {
        let now = Utc::now();
        let check = evaluate_alerts(&quiet("AAPL", Regime::Transition), None, now);

        assert!(check.alerts.is_empty());
        assert!(check.state_changed);
        assert_eq!(check.new_state.regime, Regime::Transition);
    }

    #[test]
    fn test_unchanged_regime_keeps_prior_state() {
        let prior = RegimeState::new(Regime::Bull, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let check = evaluate_alerts(&quiet("AAPL", Regime::Bull), Some(&prior), Utc::now());

        assert!(check.alerts.is_empty());
        assert!(!check.state_changed);
        assert_eq!(check.new_state, prior);
    }

    // ============= Stats Tests =============

    #[test]
    fn test_compute_stats_empty() {
        let stats = compute_stats(&[], Utc::now());
        assert_eq!(stats, AlertStats::default());
    }

    // ============= AlertMonitor Tests =============

    #[tokio::test]
    async fn test_monitor_regime_sequence() {
        let monitor = memory_monitor(1000);

        let first = monitor.check_alerts(&quiet("AAPL", Regime::Bull)).await.unwrap();
        assert!(first.alerts.is_empty());
        assert!(first.state_changed);
        let second = monitor.check_alerts(&quiet("AAPL", Regime::Bull)).await.unwrap();
        assert!(second.alerts.is_empty());
        assert!(!second.state_changed);
        let third = monitor.check_alerts(&quiet("AAPL", Regime::Bear)).await.unwrap();
        assert_eq!(types(&third.alerts), vec![AlertType::RegimeChange]);
        assert_eq!(third.new_state.regime, Regime::Bear);

        let state = monitor.current_regime().await.unwrap().unwrap();
        assert_eq!(state.regime, Regime::Bear);
        assert_eq!(monitor.history(10, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_monitor_regime_changes_once() {
        let monitor = memory_monitor(1000);

        let first = monitor.check_alerts(&quiet("AAPL", Regime::Bull)).await.unwrap();
        assert!(first.alerts.is_empty());
        assert_eq!(monitor.current_regime().await.unwrap().unwrap().regime, Regime::Bull);

        let second = monitor.check_alerts(&quiet("MSFT", Regime::Bear)).await.unwrap();
        assert_eq!(types(&second.alerts), vec![AlertType::RegimeChange]);
        assert_eq!(second.alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(monitor.current_regime().await.unwrap().unwrap().regime, Regime::Bear);

        let third = monitor.check_alerts(&quiet("AAPL", Regime::Bear)).await.unwrap();
        assert!(third.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_monitor_history_is_bounded() {
        let monitor = memory_monitor(1000);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let b = bundle("AAPL", 0.0, 0.95, Regime::Bull);

        for i in 0..1005 {
            let check = monitor.check_alerts_at(&b, t0 + Duration::seconds(i)).await.unwrap();
            assert_eq!(check.alerts.len(), 1);
        }

        let history = monitor.history(usize::MAX, None).await.unwrap();
        assert_eq!(history.len(), 1000);
        // Newest first; the five oldest were evicted
        assert_eq!(history[0].recorded_at, t0 + Duration::seconds(1004));
        assert_eq!(history[999].recorded_at, t0 + Duration::seconds(5));
        assert_eq!(monitor.stats().await.unwrap().total_alerts, 1000);
    }

    #[tokio::test]
    async fn test_monitor_trims_to_its_own_limit() {
        let monitor = AlertMonitor::new(Arc::new(MemoryAlertStore::new(1000)), 3);
        let b = bundle("AAPL", 0.9, 0.95, Regime::Bull);
        monitor.check_alerts(&b).await.unwrap();
        monitor.check_alerts(&b).await.unwrap();

        assert_eq!(monitor.history_limit(), 3);
        assert_eq!(monitor.history(10, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_monitor_history_newest_first_and_filtered() {
        let monitor = memory_monitor(100);
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();

        monitor.check_alerts_at(&bundle("AAPL", 0.0, 0.95, Regime::Bull), t0).await.unwrap();
        monitor
            .check_alerts_at(&bundle("MSFT", 0.0, 0.95, Regime::Bull), t0 + Duration::minutes(1))
            .await
            .unwrap();
        monitor
            .check_alerts_at(&bundle("AAPL", 0.0, 0.96, Regime::Bull), t0 + Duration::minutes(2))
            .await
            .unwrap();

        let all = monitor.history(10, None).await.unwrap();
        let tickers: Vec<_> = all.iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "MSFT", "AAPL"]);
        assert_eq!(all[0].recorded_at, t0 + Duration::minutes(2));

        let aapl = monitor.history(10, Some("aapl")).await.unwrap();
        assert_eq!(aapl.len(), 2);
        assert!(aapl.iter().all(|e| e.ticker == "AAPL"));

        assert_eq!(monitor.history(1, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_monitor_stats() {
        let monitor = memory_monitor(100);
        let now = Utc.with_ymd_and_hms(2025, 5, 3, 12, 0, 0).unwrap();
        let b = bundle("AAPL", 0.9, 0.95, Regime::Bull);

        monitor.check_alerts_at(&b, now - Duration::hours(48)).await.unwrap();
        monitor.check_alerts_at(&b, now - Duration::hours(1)).await.unwrap();

        let stats = monitor.stats_at(now).await.unwrap();
        assert_eq!(stats.total_alerts, 4);
        assert_eq!(stats.recent_24h, 2);
        assert_eq!(stats.alerts_by_type.get(&AlertType::ExtremeSentiment), Some(&2));
        assert_eq!(stats.alerts_by_type.get(&AlertType::HighConfidence), Some(&2));
        assert_eq!(stats.alerts_by_severity.get(&AlertSeverity::High), Some(&2));
        assert_eq!(stats.alerts_by_severity.get(&AlertSeverity::Low), Some(&2));
    }

    #[tokio::test]
    async fn test_monitor_rejects_invalid_bundle() {
        let monitor = memory_monitor(10);
        let mut b = quiet("AAPL", Regime::Bull);
        b.ticker = String::new();

        let err = monitor.check_alerts(&b).await.unwrap_err();
        assert!(err.is_invalid_input());
        assert!(monitor.current_regime().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_monitor_surfaces_store_failure() {
        let monitor = AlertMonitor::new(Arc::new(BrokenStore), 10);

        let err = monitor
            .check_alerts(&bundle("AAPL", 0.9, 0.95, Regime::Bull))
            .await
            .unwrap_err();
        assert!(matches!(err, FusionError::Store(StoreError::Corrupt(_))));

        // No alerts still writes the baseline regime
        let err = monitor.check_alerts(&quiet("AAPL", Regime::Bull)).await.unwrap_err();
        assert!(matches!(err, FusionError::Store(_)));
    }

    #[tokio::test]
    async fn test_monitor_publishes_to_bus() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let monitor = memory_monitor(100).with_bus(bus);

        monitor.check_alerts(&quiet("AAPL", Regime::Bull)).await.unwrap();
        monitor.check_alerts(&quiet("AAPL", Regime::Transition)).await.unwrap();

        match rx.recv().await.unwrap() {
            Event::RegimeChanged { from, to, .. } => {
                assert_eq!(from, Regime::Bull);
                assert_eq!(to, Regime::Transition);
            }
            other => panic!("Expected RegimeChanged, got {:?}", other),
        }
        match rx.recv().await.unwrap() {
            Event::Alert(alert) => assert_eq!(alert.alert_type, AlertType::RegimeChange),
            other => panic!("Expected Alert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_checks_see_consistent_regime() {
        let monitor = memory_monitor(1000);
        let mut handles = Vec::new();
        for i in 0..20 {
            let monitor = monitor.clone();
            handles.push(tokio::spawn(async move {
                monitor
                    .check_alerts(&quiet(&format!("T{}", i), Regime::Bull))
                    .await
            }));
        }
        for handle in handles {
            let check = handle.await.unwrap().unwrap();
            assert!(check.alerts.is_empty());
        }
        assert_eq!(monitor.current_regime().await.unwrap().unwrap().regime, Regime::Bull);
    }

    #[tokio::test]
    async fn test_failed_commit_retries_as_single_regime_change() {
        let store = Arc::new(FlakyStore {
            inner: MemoryAlertStore::new(100),
            fail_next: AtomicBool::new(false),
        });
        let monitor = AlertMonitor::new(store.clone(), 100);

        monitor.check_alerts(&quiet("AAPL", Regime::Bull)).await.unwrap();

        store.fail_next.store(true, Ordering::SeqCst);
        let err = monitor.check_alerts(&quiet("AAPL", Regime::Bear)).await.unwrap_err();
        assert!(matches!(err, FusionError::Store(_)));
        assert!(monitor.history(10, None).await.unwrap().is_empty());
        assert_eq!(monitor.current_regime().await.unwrap().unwrap().regime, Regime::Bull);

        let retry = monitor.check_alerts(&quiet("AAPL", Regime::Bear)).await.unwrap();
        assert_eq!(types(&retry.alerts), vec![AlertType::RegimeChange]);

        let changes = monitor
            .history(10, None)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.alert.alert_type == AlertType::RegimeChange)
            .count();
        assert_eq!(changes, 1);
        assert_eq!(monitor.current_regime().await.unwrap().unwrap().regime, Regime::Bear);
    }

    #[tokio::test]
    async fn test_monitor_normalizes_hand_built_ticker() {
        let monitor = memory_monitor(10);
        let mut b = bundle("AAPL", 0.0, 0.95, Regime::Bull);
        b.ticker = "  aapl ".to_string();

        let check = monitor.check_alerts(&b).await.unwrap();
        assert_eq!(check.alerts[0].ticker.as_deref(), Some("AAPL"));
        assert_eq!(check.alerts[0].message, "AAPL: Very confident analysis (95%)");

        let found = monitor.history(10, Some("aapl")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ticker, "AAPL");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mixed_regimes_form_unbroken_chain() {
        let monitor = memory_monitor(1000);
        let mut handles = Vec::new();
        for i in 0..200 {
            let monitor = monitor.clone();
            let regime = if i % 2 == 0 { Regime::Bull } else { Regime::Bear };
            handles.push(tokio::spawn(async move {
                monitor.check_alerts(&quiet(&format!("T{}", i), regime)).await
            }));
        }

        let mut raised = 0;
        for handle in handles {
            let check = handle.await.unwrap().unwrap();
            raised += check
                .alerts
                .iter()
                .filter(|a| a.alert_type == AlertType::RegimeChange)
                .count();
        }

        // Oldest first
        let mut history = monitor.history(usize::MAX, None).await.unwrap();
        history.reverse();
        let changes: Vec<_> = history
            .iter()
            .filter(|e| e.alert.alert_type == AlertType::RegimeChange)
            .collect();
        assert_eq!(changes.len(), raised);
        assert!(!changes.is_empty());

        for pair in changes.windows(2) {
            assert_eq!(pair[1].alert.details["old_regime"], pair[0].alert.details["new_regime"]);
            assert_ne!(pair[1].alert.details["old_regime"], pair[1].alert.details["new_regime"]);
        }

        let stored = monitor.current_regime().await.unwrap().unwrap();
        let last = changes[changes.len() - 1];
        assert_eq!(last.alert.details["new_regime"], serde_json::json!(stored.regime));
    }

    #[tokio::test]
    async fn test_regime_survives_restart_with_file_store() {
        let dir = std::env::temp_dir().join(format!("fusion-monitor-{}", uuid::Uuid::new_v4()));

        let monitor = AlertMonitor::new(Arc::new(FileAlertStore::new(&dir)), 100);
        monitor.check_alerts(&quiet("AAPL", Regime::Bull)).await.unwrap();
        drop(monitor);

        let restarted = AlertMonitor::new(Arc::new(FileAlertStore::new(&dir)), 100);
        let check = restarted.check_alerts(&quiet("AAPL", Regime::Bear)).await.unwrap();
        assert_eq!(types(&check.alerts), vec![AlertType::RegimeChange]);
        assert_eq!(restarted.history(10, None).await.unwrap().len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }
}
