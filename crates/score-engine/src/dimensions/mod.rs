//! The five dimension calculators.
//!
//! Each calculator is a pure function over the fact snapshot returning an
//! integer score 0-100 plus a typed data blob describing how the score was
//! assembled.

pub mod behavior;
pub mod capability;
pub mod identity;
pub mod reliability;
pub mod viability;

use serde::{Deserialize, Serialize};

/// A dimension's integer score with its component breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionResult {
    pub score: u32,
    pub data: DimensionData,
}

/// Per-dimension component breakdown, tagged by dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "dimension", rename_all = "snake_case")]
pub enum DimensionData {
    Reliability {
        payment_points: u32,
        tx_count_points: u32,
        nonce_points: u32,
        uptime_points: u32,
        recency_points: u32,
    },
    Viability {
        eth_points: u32,
        usdc_points: u32,
        flow_points: u32,
        age_points: u32,
        trend_points: u32,
        zero_balance_penalty: u32,
        used_avg_balance: bool,
    },
    Identity {
        registration_points: u32,
        basename_points: u32,
        github_points: u32,
        registry_points: u32,
        age_points: u32,
    },
    Capability {
        service_points: u32,
        revenue_points: u32,
        domain_points: u32,
        replication_points: u32,
    },
    Behavior {
        classification: ActivityClassification,
        interval_cv: Option<f64>,
        hourly_entropy: Option<f64>,
        max_gap_hours: Option<f64>,
        insufficient_data: bool,
    },
}

/// Behavioral classification from the summed timing signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityClassification {
    Organic,
    Mixed,
    Automated,
    Suspicious,
    InsufficientData,
}

pub(crate) fn clamp_score(raw: i64) -> u32 {
    raw.clamp(0, 100) as u32
}
