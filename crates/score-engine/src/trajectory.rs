//! Score trajectory: velocity, momentum, direction, and the modifier.

use chrono::{DateTime, Utc};
use score_core::types::ScoreHistoryEntry;
use serde::{Deserialize, Serialize};

/// Points required before momentum is reported.
const MOMENTUM_MIN_POINTS: usize = 6;

/// Stdev at or above which a history reads as volatile.
const VOLATILE_STDEV: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    New,
    Improving,
    Declining,
    Stable,
    Volatile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    /// OLS slope of score over days; None with fewer than two points.
    pub velocity: Option<f64>,
    /// Second-half slope minus first-half slope; None below six points.
    pub momentum: Option<f64>,
    pub direction: Direction,
    /// Population standard deviation of the scores.
    pub volatility: f64,
    /// Score modifier in [-5, +5].
    pub modifier: i32,
    pub data_points: usize,
    pub span_days: f64,
}

/// Compute the trajectory over an ordered (oldest-first) score history.
pub fn compute(history: &[ScoreHistoryEntry]) -> Trajectory {
    let points: Vec<(DateTime<Utc>, f64)> = history
        .iter()
        .map(|h| (h.calculated_at, h.score as f64))
        .collect();

    let data_points = points.len();
    let span_days = match (points.first(), points.last()) {
        (Some(first), Some(last)) => {
            ((last.0 - first.0).num_seconds().max(0) as f64) / 86_400.0
        }
        _ => 0.0,
    };

    let velocity = ols_slope(&points);
    let volatility = population_stdev(&points);

    let momentum = if data_points >= MOMENTUM_MIN_POINTS {
        let mid = data_points / 2;
        match (ols_slope(&points[..mid]), ols_slope(&points[mid..])) {
            (Some(first_half), Some(second_half)) => Some(second_half - first_half),
            _ => None,
        }
    } else {
        None
    };

    let direction = direction(data_points, velocity, volatility);
    let modifier = modifier(&points, velocity, volatility);

    Trajectory {
        velocity,
        momentum,
        direction,
        volatility,
        modifier,
        data_points,
        span_days,
    }
}

fn direction(data_points: usize, velocity: Option<f64>, volatility: f64) -> Direction {
    if data_points < 2 {
        return Direction::New;
    }
    // A clear slope outranks volatility: a steady climb with a wide range
    // is improving, not volatile
    match velocity {
        Some(v) if v > 0.5 => Direction::Improving,
        Some(v) if v < -0.5 => Direction::Declining,
        _ if volatility >= VOLATILE_STDEV => Direction::Volatile,
        _ => Direction::Stable,
    }
}

/// Modifier table, first match wins after streak computation.
fn modifier(points: &[(DateTime<Utc>, f64)], velocity: Option<f64>, volatility: f64) -> i32 {
    let (rise_streak, decline_streak) = trailing_streaks(points);
    let v = velocity.unwrap_or(0.0);

    if rise_streak >= 10 && v > 1.0 {
        5
    } else if decline_streak >= 10 && v < -1.0 {
        -5
    } else if rise_streak >= 5 || v > 0.5 {
        3
    } else if decline_streak >= 5 || v < -0.5 {
        -3
    } else if volatility >= VOLATILE_STDEV {
        0
    } else if points.len() >= 5 {
        1
    } else {
        0
    }
}

/// Consecutive rises and declines counted from the end of the series.
/// Equal neighbours (e.g. a run pinned at the 100 cap) neither extend nor
/// break a streak.
fn trailing_streaks(points: &[(DateTime<Utc>, f64)]) -> (usize, usize) {
    let mut rises = 0;
    for pair in points.windows(2).rev() {
        if pair[1].1 > pair[0].1 {
            rises += 1;
        } else if pair[1].1 < pair[0].1 {
            break;
        }
    }
    let mut declines = 0;
    for pair in points.windows(2).rev() {
        if pair[1].1 < pair[0].1 {
            declines += 1;
        } else if pair[1].1 > pair[0].1 {
            break;
        }
    }
    (rises, declines)
}

/// Ordinary least squares slope of score against days since the first
/// point. None with fewer than two points or a degenerate time axis.
fn ols_slope(points: &[(DateTime<Utc>, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let origin = points[0].0;
    let xs: Vec<f64> = points
        .iter()
        .map(|(t, _)| (*t - origin).num_seconds() as f64 / 86_400.0)
        .collect();
    let ys: Vec<f64> = points.iter().map(|(_, s)| *s).collect();

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if sxx < f64::EPSILON {
        return None;
    }
    let sxy: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    Some(sxy / sxx)
}

fn population_stdev(points: &[(DateTime<Utc>, f64)]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean = points.iter().map(|(_, s)| s).sum::<f64>() / n;
    let variance = points.iter().map(|(_, s)| (s - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use score_core::types::WalletAddress;

    fn history(scores: &[u32]) -> Vec<ScoreHistoryEntry> {
        let wallet =
            WalletAddress::parse("0x0000000000000000000000000000000000000001").unwrap();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| ScoreHistoryEntry {
                wallet: wallet.clone(),
                score,
                confidence: 0.8,
                model_version: "2.1.0".to_string(),
                calculated_at: start + Duration::days(i as i64),
            })
            .collect()
    }

    #[test]
    fn test_single_point_is_new() {
        let t = compute(&history(&[50]));
        assert_eq!(t.direction, Direction::New);
        assert!(t.velocity.is_none());
        assert!(t.momentum.is_none());
        assert_eq!(t.modifier, 0);
        assert_eq!(t.data_points, 1);
        assert_eq!(t.span_days, 0.0);
    }

    #[test]
    fn test_momentum_requires_six_points() {
        let t = compute(&history(&[50, 52, 54, 56, 58]));
        assert!(t.velocity.is_some());
        assert!(t.momentum.is_none());

        let t6 = compute(&history(&[50, 52, 54, 56, 58, 60]));
        assert!(t6.momentum.is_some());
    }

    #[test]
    fn test_long_linear_rise_maxes_modifier() {
        // 50 daily rises of +2
        let scores: Vec<u32> = (0..50).map(|i| (50 + 2 * i).min(100)).collect();
        let t = compute(&history(&scores));
        assert_eq!(t.direction, Direction::Improving);
        assert_eq!(t.modifier, 5);
        assert!(t.velocity.unwrap() > 1.0);
        assert!((t.span_days - 49.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_decline_mins_modifier() {
        let scores: Vec<u32> = (0..20).map(|i| 90_u32.saturating_sub(3 * i)).collect();
        let t = compute(&history(&scores));
        assert_eq!(t.direction, Direction::Declining);
        assert_eq!(t.modifier, -5);
        assert!(t.velocity.unwrap() < -1.0);
    }

    #[test]
    fn test_short_rise_gets_plus_three() {
        let t = compute(&history(&[50, 51, 52, 53, 54, 55]));
        // Streak of 5 rises, velocity 1.0
        assert_eq!(t.modifier, 3);
    }

    #[test]
    fn test_flat_history_is_stable() {
        let t = compute(&history(&[60, 60, 61, 60, 60, 60, 61, 60]));
        assert_eq!(t.direction, Direction::Stable);
        assert_eq!(t.modifier, 1);
    }

    #[test]
    fn test_volatile_history() {
        // Symmetric sawtooth: zero slope, large stdev
        let t = compute(&history(&[20, 80, 20, 80, 20, 80, 20]));
        assert_eq!(t.direction, Direction::Volatile);
        assert!(t.volatility >= 15.0);
        assert_eq!(t.modifier, 0);
    }

    #[test]
    fn test_modifier_bounds() {
        for scores in [
            vec![0, 100, 0, 100, 0, 100],
            vec![100, 0, 100, 0, 100],
            (0..30).map(|i| i * 3).collect::<Vec<_>>(),
            (0..30).map(|i| 100 - i * 3).collect::<Vec<_>>(),
        ] {
            let t = compute(&history(&scores));
            assert!((-5..=5).contains(&t.modifier));
            assert!(t.span_days >= 0.0);
        }
    }

    #[test]
    fn test_momentum_sign_on_acceleration() {
        // Flat first half, rising second half
        let t = compute(&history(&[50, 50, 50, 50, 60, 70, 80, 90]));
        assert!(t.momentum.unwrap() > 0.0);
    }
}
