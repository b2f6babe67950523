//! Outcome labels that feed the adaptive layer.

use super::score::DimensionScores;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened after a score was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeLabel {
    SuccessfulTx,
    MultipleSuccessfulTx,
    FraudReport,
    NoActivity,
}

impl OutcomeLabel {
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            OutcomeLabel::SuccessfulTx | OutcomeLabel::MultipleSuccessfulTx
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeLabel::SuccessfulTx => "successful_tx",
            OutcomeLabel::MultipleSuccessfulTx => "multiple_successful_tx",
            OutcomeLabel::FraudReport => "fraud_report",
            OutcomeLabel::NoActivity => "no_activity",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "successful_tx" => Some(OutcomeLabel::SuccessfulTx),
            "multiple_successful_tx" => Some(OutcomeLabel::MultipleSuccessfulTx),
            "fraud_report" => Some(OutcomeLabel::FraudReport),
            "no_activity" => Some(OutcomeLabel::NoActivity),
            _ => None,
        }
    }
}

/// A labeled outcome row, carrying the dimension values served at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub id: Uuid,
    /// The query_log row this outcome was matched from (unique, makes the
    /// matcher idempotent).
    pub query_id: Uuid,
    pub wallet: String,
    pub requester: Option<String>,
    pub label: OutcomeLabel,
    pub score: u32,
    pub confidence: f64,
    pub dimensions: Option<DimensionScores>,
    pub created_at: DateTime<Utc>,
}

/// A training sample for weight learning: label plus dimension values.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeSample {
    pub label: OutcomeLabel,
    pub dimensions: DimensionScores,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_polarity() {
        assert!(OutcomeLabel::SuccessfulTx.is_positive());
        assert!(OutcomeLabel::MultipleSuccessfulTx.is_positive());
        assert!(!OutcomeLabel::FraudReport.is_positive());
        assert!(!OutcomeLabel::NoActivity.is_positive());
    }

    #[test]
    fn test_label_round_trip() {
        for label in [
            OutcomeLabel::SuccessfulTx,
            OutcomeLabel::MultipleSuccessfulTx,
            OutcomeLabel::FraudReport,
            OutcomeLabel::NoActivity,
        ] {
            assert_eq!(OutcomeLabel::from_str(label.as_str()), Some(label));
        }
        assert_eq!(OutcomeLabel::from_str("unknown"), None);
    }
}
