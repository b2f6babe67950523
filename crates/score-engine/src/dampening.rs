//! Confidence-weighted dampening of score movement between refreshes.

use score_core::config::DampeningConfig;

/// Maximum allowed delta for a confidence level; affine between the low-
/// and high-confidence bounds.
pub fn max_delta(confidence: f64, config: &DampeningConfig) -> f64 {
    let c = confidence.clamp(0.0, 1.0);
    config.max_delta_low_conf - (config.max_delta_low_conf - config.max_delta_high_conf) * c
}

/// Clamp the new score's movement against the previous score. Without a
/// previous score the new value passes through, rounded and clamped.
pub fn dampen(
    previous: Option<u32>,
    new_score: f64,
    confidence: f64,
    config: &DampeningConfig,
) -> u32 {
    let bounded = new_score.clamp(0.0, 100.0);
    match previous {
        None => bounded.round() as u32,
        Some(prev) => {
            let limit = max_delta(confidence, config);
            let delta = (bounded - prev as f64).clamp(-limit, limit);
            ((prev as f64 + delta).round() as i64).clamp(0, 100) as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_delta_endpoints() {
        let config = DampeningConfig::default();
        assert_eq!(max_delta(0.0, &config), 30.0);
        assert_eq!(max_delta(1.0, &config), 8.0);
        // Affine midpoint
        assert_eq!(max_delta(0.5, &config), 19.0);
    }

    #[test]
    fn test_no_previous_passes_through() {
        let config = DampeningConfig::default();
        assert_eq!(dampen(None, 73.4, 0.9, &config), 73);
        assert_eq!(dampen(None, 73.5, 0.9, &config), 74);
        assert_eq!(dampen(None, -5.0, 0.9, &config), 0);
        assert_eq!(dampen(None, 150.0, 0.9, &config), 100);
    }

    #[test]
    fn test_high_confidence_tight_band() {
        let config = DampeningConfig::default();
        // From 60, confidence 1.0 allows at most +-8
        assert_eq!(dampen(Some(60), 100.0, 1.0, &config), 68);
        assert_eq!(dampen(Some(60), 0.0, 1.0, &config), 52);
        // Movement inside the band is untouched
        assert_eq!(dampen(Some(60), 65.0, 1.0, &config), 65);
    }

    #[test]
    fn test_low_confidence_wide_band() {
        let config = DampeningConfig::default();
        assert_eq!(dampen(Some(60), 100.0, 0.0, &config), 90);
        assert_eq!(dampen(Some(60), 0.0, 0.0, &config), 30);
    }

    #[test]
    fn test_result_stays_in_range() {
        let config = DampeningConfig::default();
        assert_eq!(dampen(Some(5), 0.0, 0.0, &config), 0);
        assert_eq!(dampen(Some(95), 130.0, 0.0, &config), 100);
    }

    #[test]
    fn test_delta_bound_property() {
        let config = DampeningConfig::default();
        for prev in (0..=100).step_by(10) {
            for new in (0..=100).step_by(7) {
                for conf10 in 0..=10 {
                    let confidence = conf10 as f64 / 10.0;
                    let result = dampen(Some(prev), new as f64, confidence, &config);
                    let limit = max_delta(confidence, &config);
                    assert!(
                        (result as f64 - prev as f64).abs() <= limit + 0.5,
                        "prev={prev} new={new} conf={confidence} result={result}"
                    );
                }
            }
        }
    }
}
