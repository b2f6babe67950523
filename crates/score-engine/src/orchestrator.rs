//! The scoring orchestrator: cache and TTL handling, per-wallet
//! coalescing, the global scan cap, the end-to-end pipeline, and
//! persistence.

use crate::adaptive::{AdaptiveEngine, DimensionWeights};
use crate::breakpoints::{maturity_factor, tx_count_curve, wallet_age_curve};
use crate::confidence::{self, ConfidenceReport};
use crate::dampening;
use crate::dimensions::{behavior, capability, identity, reliability, viability};
use crate::facts::{StoreAggregates, WalletFacts};
use crate::fraud::{self, FraudAnalysis};
use crate::integrity;
use crate::trajectory;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use score_core::chain::ChainReader;
use score_core::config::{AdaptiveConfig, DampeningConfig, ScoringConfig, MODEL_VERSION};
use score_core::db::fraud::FraudReportRepository;
use score_core::db::graph::RelationshipRepository;
use score_core::db::queries::QueryLogRepository;
use score_core::db::scores::ScoreRepository;
use score_core::db::snapshots::SnapshotRepository;
use score_core::db::transfers::TransferRepository;
use score_core::db::wallets::WalletRepository;
use score_core::types::{
    BasicScore, DataAvailability, DimensionScores, FullScore, HistoryPoint, QueryLogEntry,
    Recommendation, ScoreRange, ScoreRecord, Tier, WalletAddress,
};
use score_core::{Error, Result};
use sqlx::PgPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use uuid::Uuid;
use tracing::{error, info, warn};

const HISTORY_FETCH_LIMIT: i64 = 50;
const RESPONSE_HISTORY_CAP: usize = 30;
const TIMESTAMP_FETCH_LIMIT: i64 = 200;

/// Options for [`ScoreOrchestrator::compute_or_get_score`].
#[derive(Debug, Clone)]
pub struct ScoreOptions {
    pub force_refresh: bool,
    /// Caller-side deadline in milliseconds; 0 disables it. The pipeline
    /// always runs to completion and persists, even when the caller times
    /// out.
    pub timeout_ms: u64,
    /// Serve an expired row immediately and refresh in the background.
    pub stale_ok: bool,
    pub requester: Option<String>,
    pub paid: bool,
    /// Reserved: propagate pipeline errors instead of degrading.
    pub strict: bool,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            timeout_ms: 0,
            stale_ok: true,
            requester: None,
            paid: false,
            strict: false,
        }
    }
}

/// Orchestrates the scoring pipeline per wallet.
pub struct ScoreOrchestrator {
    scores: ScoreRepository,
    queries: QueryLogRepository,
    transfers: TransferRepository,
    graph: RelationshipRepository,
    snapshots: SnapshotRepository,
    wallets: WalletRepository,
    fraud_reports: FraudReportRepository,
    reader: Arc<ChainReader>,
    adaptive: Arc<AdaptiveEngine>,
    scoring_config: ScoringConfig,
    adaptive_config: AdaptiveConfig,
    dampening_config: DampeningConfig,
    /// One in-flight pipeline per wallet; later callers subscribe.
    inflight: DashMap<String, broadcast::Sender<Arc<FullScore>>>,
    scan_semaphore: Arc<Semaphore>,
    queued: AtomicUsize,
}

impl ScoreOrchestrator {
    pub fn new(
        pool: PgPool,
        reader: Arc<ChainReader>,
        adaptive: Arc<AdaptiveEngine>,
        scoring_config: ScoringConfig,
        adaptive_config: AdaptiveConfig,
        dampening_config: DampeningConfig,
    ) -> Self {
        let scan_semaphore = Arc::new(Semaphore::new(scoring_config.max_concurrent_scans.max(1)));
        Self {
            scores: ScoreRepository::new(pool.clone()),
            queries: QueryLogRepository::new(pool.clone()),
            transfers: TransferRepository::new(pool.clone()),
            graph: RelationshipRepository::new(pool.clone()),
            snapshots: SnapshotRepository::new(pool.clone()),
            wallets: WalletRepository::new(pool.clone()),
            fraud_reports: FraudReportRepository::new(pool),
            reader,
            adaptive,
            scoring_config,
            adaptive_config,
            dampening_config,
            inflight: DashMap::new(),
            scan_semaphore,
            queued: AtomicUsize::new(0),
        }
    }

    /// Compute a wallet's score or serve the cached row, per the cache,
    /// coalescing, and timeout contract.
    pub async fn compute_or_get_score(
        self: &Arc<Self>,
        wallet_raw: &str,
        opts: ScoreOptions,
    ) -> Result<FullScore> {
        let wallet = WalletAddress::parse(wallet_raw)?;
        let now = Utc::now();

        let query_id = Uuid::new_v4();
        let log_entry = QueryLogEntry {
            id: query_id,
            requester: opts.requester.clone(),
            wallet: wallet.as_str().to_string(),
            endpoint: "score".to_string(),
            paid: opts.paid,
            queried_at: now,
        };
        if let Err(e) = self.queries.log(&log_entry).await {
            warn!(wallet = %wallet, error = %e, "failed to log score query");
        }

        if !opts.force_refresh {
            if let Some(record) = self.scores.get(&wallet).await? {
                if !record.is_expired(now) {
                    return self.enrich(record, false, now).await;
                }
                if opts.stale_ok {
                    // Serve the stale row and refresh out of band; a full
                    // queue just skips the refresh
                    match self.spawn_pipeline(&wallet, query_id) {
                        Ok(_rx) => {}
                        Err(Error::QueueFull { depth }) => {
                            warn!(wallet = %wallet, depth, "scan queue full, serving stale without refresh");
                        }
                        Err(e) => return Err(e),
                    }
                    return self.enrich(record, true, now).await;
                }
            }
        }

        let mut rx = self.spawn_pipeline(&wallet, query_id)?;

        let received = if opts.timeout_ms > 0 {
            match tokio::time::timeout(
                std::time::Duration::from_millis(opts.timeout_ms),
                rx.recv(),
            )
            .await
            {
                Ok(received) => received,
                Err(_) => {
                    info!(wallet = %wallet, timeout_ms = opts.timeout_ms, "caller deadline hit, returning zero score");
                    return Ok(zero_score(&wallet, Utc::now(), None));
                }
            }
        } else {
            rx.recv().await
        };

        match received {
            Ok(score) => Ok((*score).clone()),
            Err(_) => {
                // The pipeline task died without publishing; degrade
                error!(wallet = %wallet, "pipeline channel closed without a result");
                Ok(zero_score(&wallet, Utc::now(), None))
            }
        }
    }

    /// Join the in-flight pipeline for a wallet, or start one. Submission
    /// fails with `queue_full` once the wait queue is saturated.
    fn spawn_pipeline(
        self: &Arc<Self>,
        wallet: &WalletAddress,
        query_id: Uuid,
    ) -> Result<broadcast::Receiver<Arc<FullScore>>> {
        use dashmap::mapref::entry::Entry;

        match self.inflight.entry(wallet.as_str().to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().subscribe()),
            Entry::Vacant(slot) => {
                let depth = self.queued.load(Ordering::Acquire);
                if depth >= self.scoring_config.max_queue {
                    return Err(Error::QueueFull { depth });
                }
                self.queued.fetch_add(1, Ordering::AcqRel);

                let (tx, rx) = broadcast::channel(1);
                slot.insert(tx.clone());

                let this = Arc::clone(self);
                let wallet = wallet.clone();
                tokio::spawn(async move {
                    let result = this.run_pipeline_guarded(&wallet, query_id).await;
                    this.inflight.remove(wallet.as_str());
                    let _ = tx.send(Arc::new(result));
                });

                Ok(rx)
            }
        }
    }

    /// Acquire a scan slot, run the pipeline, and convert failures into
    /// best-effort responses so every coalesced caller gets the same
    /// answer.
    async fn run_pipeline_guarded(
        self: &Arc<Self>,
        wallet: &WalletAddress,
        query_id: Uuid,
    ) -> FullScore {
        let permit = self.scan_semaphore.acquire().await;
        self.queued.fetch_sub(1, Ordering::AcqRel);
        let _permit = match permit {
            Ok(p) => p,
            Err(_) => {
                error!(wallet = %wallet, "scan semaphore closed");
                return zero_score(wallet, Utc::now(), None);
            }
        };

        match self.run_pipeline(wallet, query_id).await {
            Ok(score) => score,
            Err(e) => {
                error!(wallet = %wallet, error = %e, code = e.code(), "scoring pipeline failed");
                // Best effort: a stale cached row beats a zero score
                let now = Utc::now();
                match self.scores.get(wallet).await {
                    Ok(Some(record)) => match self.enrich(record, true, now).await {
                        Ok(full) => full,
                        Err(_) => zero_score(wallet, now, None),
                    },
                    _ => zero_score(wallet, now, None),
                }
            }
        }
    }

    /// The scoring pipeline proper.
    async fn run_pipeline(
        self: &Arc<Self>,
        wallet: &WalletAddress,
        query_id: Uuid,
    ) -> Result<FullScore> {
        let now = Utc::now();

        // Prior state for dampening and trajectory
        let previous = self.scores.get(wallet).await?;
        let history = self.scores.history(wallet, HISTORY_FETCH_LIMIT).await?;

        // Chain facts and store aggregates in parallel
        let address = wallet.to_address();
        let (chain, store) = tokio::join!(
            self.reader.fetch_wallet_facts(address, None),
            self.fetch_aggregates(wallet, query_id),
        );
        let chain = chain?;

        let facts = WalletFacts {
            wallet: wallet.as_str().to_string(),
            chain,
            store,
            fetched_at: now,
        };

        let confidence_report = confidence::compute(&facts);
        let confidence = confidence_report.confidence;

        // Fraud analysis: sybil first, then gaming
        let analysis = fraud::analyze(&facts);

        // Wallets with no footprint anywhere short-circuit to a persisted
        // zero score
        if self.has_no_footprint(&facts) {
            return self
                .persist_and_respond(
                    wallet,
                    DimensionScores::default(),
                    0.0,
                    &analysis,
                    1.0,
                    &confidence_report,
                    &facts,
                    previous.as_ref(),
                    &history,
                    now,
                )
                .await;
        }

        // Maturity-adapted curves and learned weights
        let weights = self.adaptive.effective_weights().await;
        let median = self.scores.median_score().await.unwrap_or(None).unwrap_or(0.0);
        let maturity = maturity_factor(median, &self.adaptive_config);
        let tx_curve = tx_count_curve().adapt(maturity, self.adaptive_config.max_shift_ratio);
        let age_curve = wallet_age_curve().adapt(maturity, self.adaptive_config.max_shift_ratio);

        // Dimension calculators on the frozen snapshot
        let reliability_result = reliability::score(&facts, &tx_curve);
        let effective_balance = if analysis.gaming.use_avg_balance {
            facts
                .store
                .avg_balance_24h
                .unwrap_or(facts.chain.usdc_balance)
        } else {
            facts.chain.usdc_balance
        };
        let viability_result = viability::score(
            &facts,
            effective_balance,
            analysis.gaming.use_avg_balance,
            &age_curve,
        );
        let identity_result = identity::score(&facts);
        let capability_result = capability::score(&facts);
        let behavior_result = behavior::score(&facts.store.recent_timestamps);

        // Sybil caps, then gaming dimension penalties
        let (capped_reliability, capped_identity) = analysis
            .sybil
            .caps
            .apply(reliability_result.score, identity_result.score);
        let dims = DimensionScores {
            reliability: capped_reliability
                .saturating_sub(analysis.gaming.penalties.reliability),
            viability: viability_result
                .score
                .saturating_sub(analysis.gaming.penalties.viability),
            identity: capped_identity,
            capability: capability_result.score,
            behavior: behavior_result.score,
        };

        // Composite assembly
        let weighted = weights.composite(&dims).round();
        let multiplier = integrity::compute(
            &analysis.sybil.indicators,
            &analysis.gaming.indicators,
            facts.store.fraud_report_count.max(0) as u32,
        );
        let mut composite =
            (weighted * multiplier - analysis.gaming.penalties.composite as f64).clamp(0.0, 100.0);

        // Trajectory modifier over the prior history
        let trajectory = trajectory::compute(&history);
        composite = (composite + trajectory.modifier as f64).clamp(0.0, 100.0);

        self.persist_and_respond(
            wallet,
            dims,
            composite,
            &analysis,
            multiplier,
            &confidence_report,
            &facts,
            previous.as_ref(),
            &history,
            now,
        )
        .await
    }

    /// Dampen, persist (score upsert + history append in one transaction),
    /// and build the response.
    #[allow(clippy::too_many_arguments)]
    async fn persist_and_respond(
        &self,
        wallet: &WalletAddress,
        dims: DimensionScores,
        composite: f64,
        analysis: &FraudAnalysis,
        multiplier: f64,
        confidence_report: &ConfidenceReport,
        facts: &WalletFacts,
        previous: Option<&ScoreRecord>,
        history: &[score_core::types::ScoreHistoryEntry],
        now: DateTime<Utc>,
    ) -> Result<FullScore> {
        let confidence = confidence_report.confidence;
        let final_score = dampening::dampen(
            previous.map(|p| p.score),
            composite,
            confidence,
            &self.dampening_config,
        );

        let tier = Tier::from_score(final_score);
        let recommendation =
            Recommendation::derive(final_score, analysis.sybil.flag, confidence);

        let ttl_ms = self.scoring_config.ttl_for_confidence(confidence);
        let expires_at = now + Duration::milliseconds(ttl_ms as i64);

        let sybil_indicators: Vec<String> = analysis
            .sybil
            .indicators
            .iter()
            .map(|i| i.as_str().to_string())
            .collect();
        let gaming_indicators: Vec<String> = analysis
            .gaming
            .indicators
            .iter()
            .map(|i| i.as_str().to_string())
            .collect();

        let raw_inputs = serde_json::json!({
            "chain": facts.chain,
            "store": facts.store,
            "availability": confidence_report.availability,
            "improvementPath": confidence_report.improvement_path,
            "washRatio": analysis.gaming.wash_ratio,
        });

        let record = ScoreRecord {
            wallet: wallet.clone(),
            score: final_score,
            dimensions: dims,
            tier,
            confidence,
            recommendation,
            model_version: MODEL_VERSION.to_string(),
            sybil_flag: analysis.sybil.flag,
            sybil_indicators: sybil_indicators.clone(),
            gaming_indicators: gaming_indicators.clone(),
            integrity_multiplier: multiplier,
            raw_inputs,
            calculated_at: now,
            expires_at,
        };

        self.scores.upsert_with_history(&record).await?;

        info!(
            wallet = %wallet,
            score = final_score,
            tier = tier.as_str(),
            confidence,
            sybil = analysis.sybil.flag,
            "scored wallet"
        );

        // History for the response: prior entries plus the fresh point
        let mut points: Vec<HistoryPoint> = history.iter().map(HistoryPoint::from).collect();
        points.push(HistoryPoint {
            score: final_score,
            confidence,
            calculated_at: now,
        });
        if points.len() > RESPONSE_HISTORY_CAP {
            let skip = points.len() - RESPONSE_HISTORY_CAP;
            points.drain(..skip);
        }

        let weights = self.adaptive.effective_weights().await;
        let (top_contributors, top_detractors) = contributions(&dims, &weights);

        Ok(FullScore {
            basic: BasicScore {
                wallet: wallet.clone(),
                score: final_score,
                tier,
                confidence,
                recommendation,
                model_version: MODEL_VERSION.to_string(),
                last_updated: now,
                computed_at: now,
                score_freshness: 1.0,
                stale: None,
            },
            sybil_flag: analysis.sybil.flag,
            sybil_indicators,
            gaming_indicators,
            dimensions: dims,
            data_availability: confidence_report.availability.clone(),
            improvement_path: confidence_report.improvement_path.clone(),
            score_history: points,
            integrity_multiplier: Some(multiplier),
            score_range: Some(ScoreRange::around(final_score, confidence)),
            top_contributors: Some(top_contributors),
            top_detractors: Some(top_detractors),
        })
    }

    /// Build a response from a cached row.
    async fn enrich(
        &self,
        record: ScoreRecord,
        stale: bool,
        now: DateTime<Utc>,
    ) -> Result<FullScore> {
        let history = self.scores.history(&record.wallet, HISTORY_FETCH_LIMIT).await?;
        let mut points: Vec<HistoryPoint> = history.iter().map(HistoryPoint::from).collect();
        if points.len() > RESPONSE_HISTORY_CAP {
            let skip = points.len() - RESPONSE_HISTORY_CAP;
            points.drain(..skip);
        }

        let availability: DataAvailability = record
            .raw_inputs
            .get("availability")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_else(unknown_availability);
        let improvement_path: Vec<String> = record
            .raw_inputs
            .get("improvementPath")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let weights = self.adaptive.effective_weights().await;
        let (top_contributors, top_detractors) = contributions(&record.dimensions, &weights);

        Ok(FullScore {
            basic: BasicScore {
                wallet: record.wallet.clone(),
                score: record.score,
                tier: record.tier,
                confidence: record.confidence,
                recommendation: record.recommendation,
                model_version: record.model_version.clone(),
                last_updated: record.calculated_at,
                computed_at: record.calculated_at,
                score_freshness: record.freshness(now),
                stale: stale.then_some(true),
            },
            sybil_flag: record.sybil_flag,
            sybil_indicators: record.sybil_indicators.clone(),
            gaming_indicators: record.gaming_indicators.clone(),
            dimensions: record.dimensions,
            data_availability: availability,
            improvement_path,
            score_history: points,
            integrity_multiplier: Some(record.integrity_multiplier),
            score_range: Some(ScoreRange::around(record.score, record.confidence)),
            top_contributors: Some(top_contributors),
            top_detractors: Some(top_detractors),
        })
    }

    fn has_no_footprint(&self, facts: &WalletFacts) -> bool {
        facts.effective_tx_count() == 0
            && facts.chain.nonce == 0
            && facts.chain.usdc_balance == Decimal::ZERO
            && facts.chain.eth_balance_wei == Decimal::ZERO
            && facts.store.partners.is_empty()
    }

    /// Local-store aggregates. Failed queries degrade to empty values and
    /// mark the snapshot, which caps confidence downstream.
    async fn fetch_aggregates(&self, wallet: &WalletAddress, query_id: Uuid) -> StoreAggregates {
        let now = Utc::now();
        let w = wallet.as_str();
        let mut degraded = false;

        fn note<T>(result: Result<T>, default: T, degraded: &mut bool, what: &str) -> T {
            match result {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, what, "aggregate query failed, degrading to empty");
                    *degraded = true;
                    default
                }
            }
        }

        let index = note(self.wallets.index(w).await, None, &mut degraded, "wallet_index");
        let partners = note(self.graph.partners(w).await, Vec::new(), &mut degraded, "partners");

        let top_partner_first_seen = match partners.first() {
            Some(top) => note(
                self.wallets.first_seen(&top.partner).await,
                None,
                &mut degraded,
                "top_partner_first_seen",
            ),
            None => None,
        };

        let top5: Vec<String> = partners.iter().take(5).map(|p| p.partner.clone()).collect();
        let cluster_edge_count_top5 =
            note(self.graph.edges_among(&top5).await, 0, &mut degraded, "cluster_edges");

        let recent_timestamps = note(
            self.transfers.recent_timestamps(w, TIMESTAMP_FETCH_LIMIT).await,
            Vec::new(),
            &mut degraded,
            "recent_timestamps",
        );

        let hour_ago = now - Duration::hours(1);
        let day_ago = now - Duration::hours(24);
        let week_ago = now - Duration::days(7);

        let tx_count_last_hour = note(
            self.transfers.tx_count_between(w, hour_ago, now).await,
            0,
            &mut degraded,
            "tx_count_last_hour",
        );
        let tx_count_24h = note(
            self.transfers.tx_count_between(w, day_ago, now).await,
            0,
            &mut degraded,
            "tx_count_24h",
        );
        let tx_count_7d = note(
            self.transfers.tx_count_between(w, week_ago, now).await,
            0,
            &mut degraded,
            "tx_count_7d",
        );
        let tx_count_burst_window = note(
            self.transfers.tx_count_between(w, day_ago, hour_ago).await,
            0,
            &mut degraded,
            "tx_count_burst_window",
        );

        let avg_balance_24h = note(
            self.snapshots.avg_usdc_24h(w).await,
            None,
            &mut degraded,
            "avg_balance_24h",
        );
        let lookups_last_hour = note(
            self.queries.count_since_excluding(w, hour_ago, query_id).await,
            0,
            &mut degraded,
            "lookups_last_hour",
        );
        let prior_query_count = note(
            self.queries
                .count_since_excluding(w, now - Duration::days(30), query_id)
                .await,
            0,
            &mut degraded,
            "prior_query_count",
        );
        let earliest_inbound_sender = note(
            self.transfers.earliest_inbound_sender(w).await,
            None,
            &mut degraded,
            "earliest_inbound_sender",
        );
        let pair_flows_7d = note(
            self.transfers.pair_flows_since(w, week_ago).await,
            Vec::new(),
            &mut degraded,
            "pair_flows_7d",
        )
        .into_iter()
        .map(|flow| (flow.partner, flow.sent, flow.received))
        .collect();
        let profile = note(self.wallets.profile(w).await, None, &mut degraded, "profile")
            .unwrap_or_default();
        let fraud_report_count = note(
            self.fraud_reports.count_for(w).await,
            0,
            &mut degraded,
            "fraud_report_count",
        );

        StoreAggregates {
            total_tx_count: index.as_ref().map(|i| i.total_tx_count).unwrap_or(0),
            unique_partners: index.as_ref().map(|i| i.unique_partners).unwrap_or(0),
            first_seen: index.as_ref().and_then(|i| i.first_seen),
            trend: index.as_ref().map(|i| i.trend),
            partners,
            recent_timestamps,
            tx_count_last_hour,
            tx_count_24h,
            tx_count_7d,
            tx_count_burst_window,
            avg_balance_24h,
            lookups_last_hour,
            prior_query_count,
            earliest_inbound_sender,
            top_partner_first_seen,
            cluster_edge_count_top5,
            pair_flows_7d,
            profile,
            fraud_report_count,
            degraded,
        }
    }
}

/// The minimal response served on timeouts and unexpected failures.
/// Never persisted.
fn zero_score(
    wallet: &WalletAddress,
    now: DateTime<Utc>,
    availability: Option<DataAvailability>,
) -> FullScore {
    FullScore {
        basic: BasicScore {
            wallet: wallet.clone(),
            score: 0,
            tier: Tier::Unverified,
            confidence: 0.0,
            recommendation: Recommendation::InsufficientHistory,
            model_version: MODEL_VERSION.to_string(),
            last_updated: now,
            computed_at: now,
            score_freshness: 0.0,
            stale: None,
        },
        sybil_flag: false,
        sybil_indicators: Vec::new(),
        gaming_indicators: Vec::new(),
        dimensions: DimensionScores::default(),
        data_availability: availability.unwrap_or_else(unknown_availability),
        improvement_path: vec!["Complete 10+ transactions".to_string()],
        score_history: Vec::new(),
        integrity_multiplier: None,
        score_range: None,
        top_contributors: None,
        top_detractors: None,
    }
}

fn unknown_availability() -> DataAvailability {
    DataAvailability {
        transaction_history: "none".to_string(),
        wallet_age: "new".to_string(),
        economic_data: "none".to_string(),
        identity_data: "none".to_string(),
        community_data: "none".to_string(),
    }
}

/// Top weighted contributors and weakest dimensions for the response.
fn contributions(
    dims: &DimensionScores,
    weights: &DimensionWeights,
) -> (Vec<String>, Vec<String>) {
    use score_core::types::Dimension;

    let name = |d: Dimension| match d {
        Dimension::Reliability => "reliability",
        Dimension::Viability => "viability",
        Dimension::Identity => "identity",
        Dimension::Capability => "capability",
        Dimension::Behavior => "behavior",
    };

    let mut weighted: Vec<(Dimension, f64)> = Dimension::ALL
        .iter()
        .map(|&d| (d, weights.get(d) * dims.get(d) as f64))
        .collect();
    weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let contributors = weighted
        .iter()
        .filter(|(d, _)| dims.get(*d) >= 50)
        .take(2)
        .map(|(d, _)| name(*d).to_string())
        .collect();

    let mut weak: Vec<(Dimension, u32)> = Dimension::ALL
        .iter()
        .map(|&d| (d, dims.get(d)))
        .filter(|(_, score)| *score < 50)
        .collect();
    weak.sort_by_key(|(_, score)| *score);
    let detractors = weak
        .iter()
        .take(2)
        .map(|(d, _)| name(*d).to_string())
        .collect();

    (contributors, detractors)
}
