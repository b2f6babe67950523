//! Score records, tiers, and recommendations.

use crate::{Error, Result};
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated, lowercase EVM wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize an address string; rejects malformed input.
    pub fn parse(raw: &str) -> Result<Self> {
        let addr: Address = raw
            .parse()
            .map_err(|_| Error::InvalidWallet(raw.to_string()))?;
        Ok(Self(format!("0x{}", hex::encode(addr.as_slice()))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The underlying 20-byte address.
    pub fn to_address(&self) -> Address {
        // Validated at construction
        self.0.parse().expect("wallet address was validated")
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Integer sub-scores for the five dimensions, each 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub reliability: u32,
    pub viability: u32,
    pub identity: u32,
    pub capability: u32,
    pub behavior: u32,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> u32 {
        match dimension {
            Dimension::Reliability => self.reliability,
            Dimension::Viability => self.viability,
            Dimension::Identity => self.identity,
            Dimension::Capability => self.capability,
            Dimension::Behavior => self.behavior,
        }
    }

    pub fn set(&mut self, dimension: Dimension, value: u32) {
        match dimension {
            Dimension::Reliability => self.reliability = value,
            Dimension::Viability => self.viability = value,
            Dimension::Identity => self.identity = value,
            Dimension::Capability => self.capability = value,
            Dimension::Behavior => self.behavior = value,
        }
    }
}

/// The five scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Reliability,
    Viability,
    Identity,
    Capability,
    Behavior,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Reliability,
        Dimension::Viability,
        Dimension::Identity,
        Dimension::Capability,
        Dimension::Behavior,
    ];
}

/// Coarse label derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Elite,
    Trusted,
    Established,
    Emerging,
    Unverified,
}

impl Tier {
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            Tier::Elite
        } else if score >= 75 {
            Tier::Trusted
        } else if score >= 60 {
            Tier::Established
        } else if score >= 40 {
            Tier::Emerging
        } else {
            Tier::Unverified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Elite => "Elite",
            Tier::Trusted => "Trusted",
            Tier::Established => "Established",
            Tier::Emerging => "Emerging",
            Tier::Unverified => "Unverified",
        }
    }
}

/// Action guidance derived from composite, sybil flag, and confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    FlaggedForReview,
    HighRisk,
    InsufficientHistory,
    ProceedWithCaution,
    Proceed,
}

impl Recommendation {
    pub fn derive(score: u32, sybil_flag: bool, confidence: f64) -> Self {
        if sybil_flag {
            Recommendation::FlaggedForReview
        } else if score < 25 {
            Recommendation::HighRisk
        } else if score < 50 || confidence < 0.3 {
            Recommendation::InsufficientHistory
        } else if score < 75 {
            Recommendation::ProceedWithCaution
        } else {
            Recommendation::Proceed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::FlaggedForReview => "flagged_for_review",
            Recommendation::HighRisk => "high_risk",
            Recommendation::InsufficientHistory => "insufficient_history",
            Recommendation::ProceedWithCaution => "proceed_with_caution",
            Recommendation::Proceed => "proceed",
        }
    }
}

/// The current cached score row for a wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub wallet: WalletAddress,
    pub score: u32,
    pub dimensions: DimensionScores,
    pub tier: Tier,
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub model_version: String,
    pub sybil_flag: bool,
    pub sybil_indicators: Vec<String>,
    pub gaming_indicators: Vec<String>,
    pub integrity_multiplier: f64,
    /// Opaque snapshot of the inputs the score was computed from.
    pub raw_inputs: serde_json::Value,
    pub calculated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Linear decay of cached-score trust: 1.0 at calculated_at, 0.0 at
    /// expires_at, rounded to two decimals.
    pub fn freshness(&self, now: DateTime<Utc>) -> f64 {
        let window = (self.expires_at - self.calculated_at).num_milliseconds();
        if window <= 0 {
            return 0.0;
        }
        let left = (self.expires_at - now).num_milliseconds();
        let factor = (left as f64 / window as f64).clamp(0.0, 1.0);
        (factor * 100.0).round() / 100.0
    }
}

/// Append-only score history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    pub wallet: WalletAddress,
    pub score: u32,
    pub confidence: f64,
    pub model_version: String,
    pub calculated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_wallet_address_parse() {
        let addr = WalletAddress::parse("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
        assert_eq!(addr.as_str(), "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913");
    }

    #[test]
    fn test_wallet_address_rejects_malformed() {
        assert!(WalletAddress::parse("0x123").is_err());
        assert!(WalletAddress::parse("not-an-address").is_err());
        assert!(WalletAddress::parse("").is_err());
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(Tier::from_score(100), Tier::Elite);
        assert_eq!(Tier::from_score(90), Tier::Elite);
        assert_eq!(Tier::from_score(89), Tier::Trusted);
        assert_eq!(Tier::from_score(75), Tier::Trusted);
        assert_eq!(Tier::from_score(74), Tier::Established);
        assert_eq!(Tier::from_score(60), Tier::Established);
        assert_eq!(Tier::from_score(59), Tier::Emerging);
        assert_eq!(Tier::from_score(40), Tier::Emerging);
        assert_eq!(Tier::from_score(39), Tier::Unverified);
        assert_eq!(Tier::from_score(0), Tier::Unverified);
    }

    #[test]
    fn test_recommendation_sybil_overrides() {
        assert_eq!(
            Recommendation::derive(95, true, 0.9),
            Recommendation::FlaggedForReview
        );
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(Recommendation::derive(10, false, 0.9), Recommendation::HighRisk);
        assert_eq!(
            Recommendation::derive(40, false, 0.9),
            Recommendation::InsufficientHistory
        );
        // Low confidence forces insufficient_history even at a decent score
        assert_eq!(
            Recommendation::derive(60, false, 0.2),
            Recommendation::InsufficientHistory
        );
        assert_eq!(
            Recommendation::derive(60, false, 0.5),
            Recommendation::ProceedWithCaution
        );
        assert_eq!(Recommendation::derive(80, false, 0.5), Recommendation::Proceed);
    }

    #[test]
    fn test_freshness_decay() {
        let calculated = Utc::now();
        let record = ScoreRecord {
            wallet: WalletAddress::parse("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913").unwrap(),
            score: 50,
            dimensions: DimensionScores::default(),
            tier: Tier::Emerging,
            confidence: 0.5,
            recommendation: Recommendation::ProceedWithCaution,
            model_version: "2.1.0".to_string(),
            sybil_flag: false,
            sybil_indicators: vec![],
            gaming_indicators: vec![],
            integrity_multiplier: 1.0,
            raw_inputs: serde_json::json!({}),
            calculated_at: calculated,
            expires_at: calculated + Duration::hours(1),
        };

        assert!((record.freshness(calculated) - 1.0).abs() < 0.01);
        let halfway = calculated + Duration::minutes(30);
        assert!((record.freshness(halfway) - 0.5).abs() < 0.01);
        let expired = calculated + Duration::hours(2);
        assert_eq!(record.freshness(expired), 0.0);
    }
}
