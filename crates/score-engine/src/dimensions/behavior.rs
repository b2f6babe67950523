//! Behavior: timing-signal analysis over transfer timestamps.
//!
//! Three signals are summed: inter-arrival coefficient of variation,
//! Shannon entropy of the UTC hour distribution, and the longest gap.
//! Fewer than five timestamps returns a neutral 50 with the
//! insufficient-data marker.

use super::{ActivityClassification, DimensionData, DimensionResult};
use chrono::{DateTime, Timelike, Utc};

const MIN_TIMESTAMPS: usize = 5;

pub fn score(timestamps: &[DateTime<Utc>]) -> DimensionResult {
    if timestamps.len() < MIN_TIMESTAMPS {
        return DimensionResult {
            score: 50,
            data: DimensionData::Behavior {
                classification: ActivityClassification::InsufficientData,
                interval_cv: None,
                hourly_entropy: None,
                max_gap_hours: None,
                insufficient_data: true,
            },
        };
    }

    let mut sorted = timestamps.to_vec();
    sorted.sort();

    let gaps: Vec<f64> = sorted
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64 / 3600.0)
        .collect();

    let cv = coefficient_of_variation(&gaps);
    let cv_points = ((cv - 0.1) / 1.4).clamp(0.0, 1.0) * 35.0;

    let entropy = hourly_entropy(&sorted);
    let entropy_points = ((entropy - 1.0) / 2.5).clamp(0.0, 1.0) * 35.0;

    let max_gap = gaps.iter().cloned().fold(0.0_f64, f64::max);
    let gap_points = ((max_gap - 1.0) / 47.0).clamp(0.0, 1.0) * 30.0;

    let total = (cv_points + entropy_points + gap_points).round() as u32;

    let classification = if total >= 70 {
        ActivityClassification::Organic
    } else if total >= 45 {
        ActivityClassification::Mixed
    } else if total >= 25 {
        ActivityClassification::Automated
    } else {
        ActivityClassification::Suspicious
    };

    DimensionResult {
        score: total.min(100),
        data: DimensionData::Behavior {
            classification,
            interval_cv: Some(cv),
            hourly_entropy: Some(entropy),
            max_gap_hours: Some(max_gap),
            insufficient_data: false,
        },
    }
}

/// Population coefficient of variation (stdev / mean).
fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}

/// Shannon entropy (natural log) of the UTC hour distribution.
fn hourly_entropy(timestamps: &[DateTime<Utc>]) -> f64 {
    let mut buckets = [0u64; 24];
    for ts in timestamps {
        buckets[ts.hour() as usize] += 1;
    }
    let total = timestamps.len() as f64;
    buckets
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_insufficient_data_returns_neutral() {
        let result = score(&[ts(1, 0, 0), ts(2, 0, 0)]);
        assert_eq!(result.score, 50);
        let DimensionData::Behavior {
            classification,
            insufficient_data,
            ..
        } = result.data
        else {
            panic!("wrong dimension data variant");
        };
        assert!(insufficient_data);
        assert_eq!(classification, ActivityClassification::InsufficientData);
    }

    #[test]
    fn test_metronomic_bot_scores_low() {
        // One transfer exactly every hour, same cadence, no long gaps
        let timestamps: Vec<_> = (0..48).map(|i| ts(1 + i / 24, i % 24, 0)).collect();
        let result = score(&timestamps);
        let DimensionData::Behavior {
            classification,
            interval_cv,
            ..
        } = result.data
        else {
            panic!("wrong dimension data variant");
        };
        // Zero variance in gaps
        assert!(interval_cv.unwrap() < 0.01);
        assert!(result.score < 45, "got {}", result.score);
        assert_ne!(classification, ActivityClassification::Organic);
    }

    #[test]
    fn test_irregular_human_scores_high() {
        // Irregular gaps across varied hours with a long weekend pause
        let timestamps = vec![
            ts(1, 9, 12),
            ts(1, 14, 3),
            ts(1, 22, 47),
            ts(2, 8, 30),
            ts(2, 19, 5),
            ts(4, 11, 20),
            ts(5, 16, 58),
            ts(6, 7, 2),
            ts(6, 23, 41),
            ts(8, 13, 15),
        ];
        let result = score(&timestamps);
        let DimensionData::Behavior {
            max_gap_hours,
            hourly_entropy,
            ..
        } = result.data
        else {
            panic!("wrong dimension data variant");
        };
        assert!(max_gap_hours.unwrap() > 24.0);
        assert!(hourly_entropy.unwrap() > 1.5);
        assert!(result.score >= 45, "got {}", result.score);
    }

    #[test]
    fn test_unsorted_input_is_handled() {
        let mut timestamps = vec![
            ts(5, 10, 0),
            ts(1, 9, 0),
            ts(3, 14, 0),
            ts(2, 20, 0),
            ts(4, 6, 0),
        ];
        let forward = score(&timestamps);
        timestamps.reverse();
        let reversed = score(&timestamps);
        assert_eq!(forward.score, reversed.score);
    }

    #[test]
    fn test_entropy_of_single_hour_is_zero() {
        let timestamps: Vec<_> = (1..=6).map(|d| ts(d, 12, 0)).collect();
        assert!(hourly_entropy(&timestamps) < f64::EPSILON);
    }
}
