//! Integrity multiplier: combined fraud penalties as one factor.

use crate::fraud::{GamingIndicator, SybilIndicator};

const DEFAULT_SYBIL_FACTOR: f64 = 0.80;
const DEFAULT_GAMING_FACTOR: f64 = 0.85;
const FRAUD_REPORT_FACTOR: f64 = 0.90;
const FLOOR: f64 = 0.10;

fn sybil_factor(indicator: SybilIndicator) -> f64 {
    match indicator {
        SybilIndicator::ClosedLoopTrading => 0.55,
        SybilIndicator::CoordinatedCreation => 0.65,
        SybilIndicator::SinglePartner => 0.75,
        SybilIndicator::VolumeWithoutDiversity => 0.80,
        _ => DEFAULT_SYBIL_FACTOR,
    }
}

fn gaming_factor(indicator: GamingIndicator) -> f64 {
    match indicator {
        GamingIndicator::WashTrading => 0.50,
        GamingIndicator::VelocitySpike => 0.80,
        GamingIndicator::BalanceWindowDressing => 0.85,
        _ => DEFAULT_GAMING_FACTOR,
    }
}

/// Multiply the per-tag factors and the fraud-report decay, floored at
/// 0.10 and rounded to three decimals.
pub fn compute(
    sybil: &[SybilIndicator],
    gaming: &[GamingIndicator],
    fraud_report_count: u32,
) -> f64 {
    let mut multiplier = 1.0_f64;
    for &tag in sybil {
        multiplier *= sybil_factor(tag);
    }
    for &tag in gaming {
        multiplier *= gaming_factor(tag);
    }
    multiplier *= FRAUD_REPORT_FACTOR.powi(fraud_report_count as i32);

    (multiplier.max(FLOOR) * 1000.0).round() / 1000.0
}
