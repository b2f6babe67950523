//! Reliability: payment history, activity volume, and recency.

use super::{clamp_score, DimensionData, DimensionResult};
use crate::breakpoints::{step_at_least, Curve};
use crate::facts::WalletFacts;
use score_core::config::BLOCKS_PER_DAY;

const NONCE_STEPS: [(u64, u32); 4] = [(1000, 20), (100, 15), (10, 8), (1, 3)];

/// Score reliability from the fact snapshot. `tx_curve` is the (possibly
/// maturity-adapted) transaction-count curve.
pub fn score(facts: &WalletFacts, tx_curve: &Curve) -> DimensionResult {
    // Payment-success proxy: any observed transfer activity in the window
    let payment_points = if facts.chain.stats.count > 0 { 30 } else { 0 };

    let tx_count_points = tx_curve
        .interpolate(facts.effective_tx_count() as f64)
        .round() as u32;

    let nonce_points = step_at_least(facts.chain.nonce, &NONCE_STEPS);

    // Active span as a fraction of 90 days, worth up to 25
    let uptime_points = match (facts.chain.stats.first_block, facts.chain.stats.last_block) {
        (Some(first), Some(last)) if last > first => {
            let span = (last - first) as f64 / (90.0 * BLOCKS_PER_DAY as f64);
            (span.min(1.0) * 25.0).round() as u32
        }
        _ => 0,
    };

    let recency_points = match facts.hours_since_last_transfer() {
        Some(hours) if hours <= 24.0 => 20,
        Some(hours) if hours <= 24.0 * 7.0 => 15,
        Some(hours) if hours <= 24.0 * 30.0 => 5,
        _ => 0,
    };

    let total = payment_points + tx_count_points + nonce_points + uptime_points + recency_points;

    DimensionResult {
        score: clamp_score(total as i64),
        data: DimensionData::Reliability {
            payment_points,
            tx_count_points,
            nonce_points,
            uptime_points,
            recency_points,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoints::tx_count_curve;
    use crate::facts::StoreAggregates;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use score_core::chain::{ChainFacts, TransferStats};

    fn facts_with_stats(stats: TransferStats, nonce: u64, tip_block: u64) -> WalletFacts {
        WalletFacts {
            wallet: "0x0000000000000000000000000000000000000001".to_string(),
            chain: ChainFacts {
                usdc_balance: Decimal::ZERO,
                eth_balance_wei: Decimal::ZERO,
                nonce,
                stats,
                has_basename: false,
                in_agent_registry: false,
                tip_block,
                wallet_age_days: 0.0,
            },
            store: StoreAggregates::default(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_wallet_scores_zero() {
        let facts = facts_with_stats(TransferStats::default(), 0, 1_000_000);
        let result = score(&facts, &tx_count_curve());
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_active_wallet_components() {
        let tip = 90 * BLOCKS_PER_DAY;
        let stats = TransferStats {
            count: 100,
            first_block: Some(0),
            last_block: Some(tip),
            ..Default::default()
        };
        let facts = facts_with_stats(stats, 150, tip);
        let result = score(&facts, &tx_count_curve());

        let DimensionData::Reliability {
            payment_points,
            tx_count_points,
            nonce_points,
            uptime_points,
            recency_points,
        } = result.data
        else {
            panic!("wrong dimension data variant");
        };

        assert_eq!(payment_points, 30);
        assert_eq!(tx_count_points, 15);
        assert_eq!(nonce_points, 15);
        // Full 90-day span earns the full uptime allocation
        assert_eq!(uptime_points, 25);
        // Last transfer at the tip is fresh
        assert_eq!(recency_points, 20);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_recency_decays_with_staleness() {
        let tip = 100 * BLOCKS_PER_DAY;
        // Last transfer 10 days before the tip
        let stats = TransferStats {
            count: 5,
            first_block: Some(0),
            last_block: Some(tip - 10 * BLOCKS_PER_DAY),
            ..Default::default()
        };
        let facts = facts_with_stats(stats, 5, tip);
        let result = score(&facts, &tx_count_curve());

        let DimensionData::Reliability { recency_points, .. } = result.data else {
            panic!("wrong dimension data variant");
        };
        assert_eq!(recency_points, 5);
    }

    #[test]
    fn test_score_never_exceeds_100() {
        let tip = 365 * BLOCKS_PER_DAY;
        let stats = TransferStats {
            count: 50_000,
            first_block: Some(0),
            last_block: Some(tip),
            ..Default::default()
        };
        let facts = facts_with_stats(stats, 100_000, tip);
        let result = score(&facts, &tx_count_curve());
        assert!(result.score <= 100);
    }
}
