//! Piecewise-linear breakpoint curves and ecosystem-maturity adaptation.
//!
//! A curve is an ordered list of (input, output) pairs. Interpolation is
//! linear between adjacent pairs and clamped at both ends. Maturity
//! adaptation shifts the nonzero input anchors upward as the ecosystem's
//! median score rises; outputs never change.

use score_core::config::AdaptiveConfig;
use serde::{Deserialize, Serialize};

/// An ordered piecewise-linear curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    points: Vec<(f64, f64)>,
}

impl Curve {
    /// Points must be sorted by input ascending.
    pub fn new(points: &[(f64, f64)]) -> Self {
        debug_assert!(
            points.windows(2).all(|w| w[0].0 <= w[1].0),
            "curve inputs must be non-decreasing"
        );
        Self {
            points: points.to_vec(),
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Linear interpolation, clamped at both ends.
    pub fn interpolate(&self, x: f64) -> f64 {
        let Some(&(first_x, first_y)) = self.points.first() else {
            return 0.0;
        };
        if x <= first_x {
            return first_y;
        }
        let &(last_x, last_y) = self.points.last().expect("non-empty checked above");
        if x >= last_x {
            return last_y;
        }
        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if x <= x1 {
                if (x1 - x0).abs() < f64::EPSILON {
                    return y1;
                }
                let t = (x - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        last_y
    }

    /// Shift nonzero input anchors upward by the maturity factor. Zero
    /// anchors stay pinned and outputs are untouched, so input ordering is
    /// preserved by construction.
    pub fn adapt(&self, maturity: f64, max_shift_ratio: f64) -> Curve {
        let factor = 1.0 + maturity.clamp(0.0, 1.0) * max_shift_ratio;
        let points = self
            .points
            .iter()
            .map(|&(x, y)| {
                if x == 0.0 {
                    (0.0, y)
                } else {
                    ((x * factor * 100.0).round() / 100.0, y)
                }
            })
            .collect();
        Curve { points }
    }
}

/// Maturity factor from the population's median score: 0 at the baseline,
/// 1 at the ceiling.
pub fn maturity_factor(median_score: f64, config: &AdaptiveConfig) -> f64 {
    if config.maturity_ceiling <= config.maturity_baseline {
        return 0.0;
    }
    ((median_score - config.maturity_baseline)
        / (config.maturity_ceiling - config.maturity_baseline))
        .clamp(0.0, 1.0)
}

/// Map a value onto stepped thresholds, highest first. Returns the points
/// of the first threshold the value meets, else 0.
pub fn step_at_least<T: PartialOrd + Copy>(value: T, steps: &[(T, u32)]) -> u32 {
    for &(threshold, points) in steps {
        if value >= threshold {
            return points;
        }
    }
    0
}

/// Like [`step_at_least`] but with strict comparison.
pub fn step_above<T: PartialOrd + Copy>(value: T, steps: &[(T, u32)]) -> u32 {
    for &(threshold, points) in steps {
        if value > threshold {
            return points;
        }
    }
    0
}

/// Log-scale transaction-count curve used by the reliability dimension.
pub fn tx_count_curve() -> Curve {
    Curve::new(&[(0.0, 0.0), (10.0, 5.0), (100.0, 15.0), (1000.0, 25.0)])
}

/// Wallet-age curve used by the viability dimension. The zero anchor keeps
/// brand-new wallets at zero points.
pub fn wallet_age_curve() -> Curve {
    Curve::new(&[
        (0.0, 0.0),
        (1.0, 5.0),
        (7.0, 15.0),
        (30.0, 25.0),
        (90.0, 30.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_between_knots() {
        let curve = tx_count_curve();
        assert_eq!(curve.interpolate(0.0), 0.0);
        assert_eq!(curve.interpolate(10.0), 5.0);
        // Halfway between 10 and 100
        assert!((curve.interpolate(55.0) - 10.0).abs() < 1e-9);
        assert_eq!(curve.interpolate(1000.0), 25.0);
    }

    #[test]
    fn test_interpolation_clamps_at_ends() {
        let curve = tx_count_curve();
        assert_eq!(curve.interpolate(-5.0), 0.0);
        assert_eq!(curve.interpolate(50_000.0), 25.0);

        let age = wallet_age_curve();
        // Zero anchor: a half-day-old wallet interpolates toward the 1-day knot
        assert!((age.interpolate(0.5) - 2.5).abs() < 1e-9);
        assert_eq!(age.interpolate(0.0), 0.0);
    }

    #[test]
    fn test_adapt_preserves_outputs_and_zero_anchors() {
        let curve = tx_count_curve();
        let adapted = curve.adapt(1.0, 0.3);

        for (original, shifted) in curve.points().iter().zip(adapted.points()) {
            assert_eq!(original.1, shifted.1, "outputs must not change");
            if original.0 == 0.0 {
                assert_eq!(shifted.0, 0.0, "zero anchors stay pinned");
            } else {
                assert!(shifted.0 >= original.0, "inputs only move upward");
            }
        }
        // Full maturity at ratio 0.3 moves 10 -> 13
        assert!((adapted.points()[1].0 - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_adapt_monotonic_inputs() {
        let adapted = wallet_age_curve().adapt(0.6, 0.3);
        let xs: Vec<f64> = adapted.points().iter().map(|p| p.0).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_maturity_factor() {
        let config = AdaptiveConfig::default();
        assert_eq!(maturity_factor(25.0, &config), 0.0);
        assert_eq!(maturity_factor(10.0, &config), 0.0);
        assert_eq!(maturity_factor(65.0, &config), 1.0);
        assert_eq!(maturity_factor(90.0, &config), 1.0);
        assert!((maturity_factor(45.0, &config) - 0.5).abs() < 1e-9);

        // Degenerate configuration disables adaptation
        let broken = AdaptiveConfig {
            maturity_ceiling: 20.0,
            ..AdaptiveConfig::default()
        };
        assert_eq!(maturity_factor(50.0, &broken), 0.0);
    }

    #[test]
    fn test_steps() {
        let nonce_steps = [(1000u64, 20u32), (100, 15), (10, 8), (1, 3)];
        assert_eq!(step_at_least(5000, &nonce_steps), 20);
        assert_eq!(step_at_least(150, &nonce_steps), 15);
        assert_eq!(step_at_least(10, &nonce_steps), 8);
        assert_eq!(step_at_least(1, &nonce_steps), 3);
        assert_eq!(step_at_least(0, &nonce_steps), 0);

        let usdc_steps = [(100.0, 25u32), (50.0, 20), (10.0, 15), (1.0, 5)];
        assert_eq!(step_above(100.0, &usdc_steps), 20);
        assert_eq!(step_above(100.5, &usdc_steps), 25);
        assert_eq!(step_above(0.5, &usdc_steps), 0);
    }
}
