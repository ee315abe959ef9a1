//! Unit tests for macro regime voting and recommendations.

#[cfg(test)]
mod regime_tests {
    use crate::services::regime::*;
    use crate::types::{MacroIndicatorSet, RecommendationAction, Regime, RegimeClassification, RiskLevel};

    fn bull_indicators() -> MacroIndicatorSet {
        MacroIndicatorSet::default()
            .with_vix(15.0)
            .with_unemployment(3.5)
            .with_inflation(2.0)
            .with_fed_funds(2.5)
            .with_gdp_growth(3.0)
    }

    fn bear_indicators() -> MacroIndicatorSet {
        MacroIndicatorSet::default()
            .with_vix(35.0)
            .with_unemployment(6.5)
            .with_inflation(5.5)
            .with_fed_funds(6.0)
            .with_gdp_growth(-1.0)
    }

    // ============= Classification Tests =============

    #[test]
    fn test_classify_bull() {
        let result = classify(&bull_indicators()).unwrap();

        assert_eq!(result.regime, Regime::Bull);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.bullish_signals, 8);
        assert_eq!(result.bearish_signals, 0);
        assert_eq!(result.bullish_ratio, 1.0);
        assert_eq!(result.reasoning.len(), 5);
        assert_eq!(
            result.reasoning[0],
            "✓ Low volatility (VIX: 15) indicates stable bull market"
        );
    }

    #[test]
    fn test_classify_bear() {
        let result = classify(&bear_indicators()).unwrap();

        assert_eq!(result.regime, Regime::Bear);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.bullish_signals, 0);
        assert_eq!(result.bearish_signals, 8);
        assert!(result.reasoning.iter().all(|line| line.starts_with('✗')));
    }

    #[test]
    fn test_classify_balanced_transition() {
        // +1 bullish from unemployment in (4.5, 5.0], +1 bearish from inflation in (3.5, 4.0]
        let indicators = MacroIndicatorSet::default()
            .with_vix(22.0)
            .with_unemployment(4.7)
            .with_inflation(3.8)
            .with_fed_funds(4.5)
            .with_gdp_growth(2.0);
        let result = classify(&indicators).unwrap();

        assert_eq!(result.regime, Regime::Transition);
        assert_eq!(result.bullish_signals, 1);
        assert_eq!(result.bearish_signals, 1);
        assert_eq!(result.bullish_ratio, 0.5);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_classify_mixed_transition_confidence() {
        let indicators = MacroIndicatorSet::default()
            .with_vix(15.0)
            .with_unemployment(6.0)
            .with_inflation(3.0)
            .with_fed_funds(5.5)
            .with_gdp_growth(2.0);
        let result = classify(&indicators).unwrap();

        assert_eq!(result.bullish_signals, 4);
        assert_eq!(result.bearish_signals, 3);
        assert_eq!(result.regime, Regime::Transition);
        assert_eq!(result.bullish_ratio, 0.571);
        assert_eq!(result.confidence, 0.857);
    }

    #[test]
    fn test_classify_all_neutral_is_bear() {
        let indicators = MacroIndicatorSet::default()
            .with_vix(22.0)
            .with_fed_funds(4.5)
            .with_gdp_growth(2.0);
        let result = classify(&indicators).unwrap();

        assert_eq!(result.bullish_signals + result.bearish_signals, 0);
        assert_eq!(result.bullish_ratio, 0.0);
        assert_eq!(result.regime, Regime::Bear);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_classify_empty_set_is_bear() {
        let result = classify(&MacroIndicatorSet::default()).unwrap();

        assert_eq!(result.regime, Regime::Bear);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.reasoning.len(), 5);
        assert_eq!(result.reasoning[0], "○ VIX unavailable; no signal");
    }

    #[test]
    fn test_missing_indicator_casts_no_vote() {
        let mut indicators = bull_indicators();
        indicators.vix = None;
        let result = classify(&indicators).unwrap();

        assert_eq!(result.bullish_signals, 6);
        assert_eq!(result.regime, Regime::Bull);
    }

    #[test]
    fn test_classify_rejects_invalid_input() {
        let indicators = bull_indicators().with_vix(f64::NAN);
        let err = classify(&indicators).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_classify_is_deterministic() {
        let a = classify(&bull_indicators()).unwrap();
        let b = classify(&bull_indicators()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_classify_echoes_source() {
        let indicators = bear_indicators();
        let result = classify(&indicators).unwrap();
        assert_eq!(result.source, indicators);
    }

    // ============= Threshold Boundary Tests =============

    #[test]
    fn test_vix_boundaries_are_neutral() {
        for vix in [20.0, 25.0] {
            let result = classify(&MacroIndicatorSet::default().with_vix(vix)).unwrap();
            assert_eq!(result.bullish_signals + result.bearish_signals, 0, "VIX {}", vix);
        }
    }

    #[test]
    fn test_unemployment_boundaries_vote_weak_bullish() {
        for rate in [4.5, 5.0] {
            let result = classify(&MacroIndicatorSet::default().with_unemployment(rate)).unwrap();
            assert_eq!(result.bullish_signals, 1, "unemployment {}", rate);
            assert_eq!(result.bearish_signals, 0);
        }
    }

    #[test]
    fn test_inflation_at_target_is_bullish() {
        let result = classify(&MacroIndicatorSet::default().with_inflation(3.5)).unwrap();
        assert_eq!(result.bullish_signals, 2);

        let result = classify(&MacroIndicatorSet::default().with_inflation(4.0)).unwrap();
        assert_eq!(result.bearish_signals, 1);
    }

    #[test]
    fn test_regime_from_ratio_boundaries() {
        assert_eq!(regime_from_ratio(0.65), (Regime::Bull, 0.65));
        let (regime, confidence) = regime_from_ratio(0.35);
        assert_eq!(regime, Regime::Bear);
        assert!((confidence - 0.65).abs() < 1e-9);
        assert_eq!(regime_from_ratio(0.5), (Regime::Transition, 1.0));
    }

    #[test]
    fn test_bullish_ratio_zero_votes() {
        assert_eq!(bullish_ratio(0, 0), 0.0);
        assert_eq!(bullish_ratio(3, 1), 0.75);
    }

    // ============= Recommendation Tests =============

    #[test]
    fn test_recommend_strong_bull() {
        let classification = classify(&bull_indicators()).unwrap();
        let rec = recommend(&classification).unwrap();

        assert_eq!(rec.action, RecommendationAction::Favorable);
        assert_eq!(rec.risk_level, RiskLevel::Moderate);
        assert_eq!(rec.suggested_actions.len(), 4);
        assert_eq!(rec.regime, Regime::Bull);
    }

    #[test]
    fn test_recommend_moderate_bull() {
        let classification = RegimeClassification::from_parts(Regime::Bull, 0.70).unwrap();
        let rec = recommend(&classification).unwrap();

        assert_eq!(rec.action, RecommendationAction::Favorable);
        assert_eq!(rec.risk_level, RiskLevel::ModerateLow);
    }

    #[test]
    fn test_recommend_strong_bear() {
        let classification = RegimeClassification::from_parts(Regime::Bear, 0.80).unwrap();
        let rec = recommend(&classification).unwrap();

        assert_eq!(rec.action, RecommendationAction::Avoid);
        assert_eq!(rec.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_recommend_bear_at_threshold_is_caution() {
        let classification = RegimeClassification::from_parts(Regime::Bear, 0.75).unwrap();
        let rec = recommend(&classification).unwrap();

        assert_eq!(rec.action, RecommendationAction::Caution);
        assert_eq!(rec.risk_level, RiskLevel::ModerateHigh);
    }

    #[test]
    fn test_recommend_transition() {
        let classification = RegimeClassification::from_parts(Regime::Transition, 0.95).unwrap();
        let rec = recommend(&classification).unwrap();

        assert_eq!(rec.action, RecommendationAction::Caution);
        assert_eq!(rec.risk_level, RiskLevel::Moderate);
        assert_eq!(rec.suggested_actions.len(), 5);
    }

    #[test]
    fn test_classifier_struct_delegates() {
        let classifier = RegimeClassifier::new();
        let classification = classifier.classify(&bear_indicators()).unwrap();
        let rec = classifier.recommend(&classification).unwrap();
        assert_eq!(rec.action, RecommendationAction::Avoid);
    }
}
