//! Response shapes serialized by the API collaborators.

use super::score::{DimensionScores, Recommendation, ScoreHistoryEntry, Tier, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal score response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicScore {
    pub wallet: WalletAddress,
    pub score: u32,
    pub tier: Tier,
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub model_version: String,
    pub last_updated: DateTime<Utc>,
    pub computed_at: DateTime<Utc>,
    pub score_freshness: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
}

/// Full score response with fraud indicators, dimensions, and history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullScore {
    #[serde(flatten)]
    pub basic: BasicScore,
    pub sybil_flag: bool,
    pub sybil_indicators: Vec<String>,
    pub gaming_indicators: Vec<String>,
    pub dimensions: DimensionScores,
    pub data_availability: DataAvailability,
    pub improvement_path: Vec<String>,
    pub score_history: Vec<HistoryPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_range: Option<ScoreRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_contributors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_detractors: Option<Vec<String>>,
}

/// A single (time, score) point of history as exposed in responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub score: u32,
    pub confidence: f64,
    pub calculated_at: DateTime<Utc>,
}

impl From<&ScoreHistoryEntry> for HistoryPoint {
    fn from(entry: &ScoreHistoryEntry) -> Self {
        Self {
            score: entry.score,
            confidence: entry.confidence,
            calculated_at: entry.calculated_at,
        }
    }
}

/// Short availability labels for the five confidence signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAvailability {
    pub transaction_history: String,
    pub wallet_age: String,
    pub economic_data: String,
    pub identity_data: String,
    pub community_data: String,
}

/// Plausible band around the composite, widened by low confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreRange {
    pub low: u32,
    pub high: u32,
}

impl ScoreRange {
    /// Band width scales inversely with confidence: +-2 at full confidence,
    /// +-15 with none.
    pub fn around(score: u32, confidence: f64) -> Self {
        let half_width = (15.0 - 13.0 * confidence.clamp(0.0, 1.0)).round() as i64;
        let low = (score as i64 - half_width).max(0) as u32;
        let high = (score as i64 + half_width).min(100) as u32;
        Self { low, high }
    }
}
