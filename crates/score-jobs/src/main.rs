//! BaseScore jobs binary: wires the store, chain reader, orchestrator,
//! and background jobs, then runs until interrupted.

use anyhow::Result;
use score_core::chain::{ChainReader, FallbackClient};
use score_core::config::Config;
use score_core::db;
use score_engine::{AdaptiveEngine, ScoreOrchestrator};
use score_jobs::{
    AnomalyConfig, AnomalyDetector, HourlyRefresh, JobStats, OutcomeMatcher,
    OutcomeMatcherConfig, RefreshConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "score_jobs=info,score_engine=info,score_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting BaseScore jobs");

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let client = Arc::new(FallbackClient::from_config(&config.chain));
    client.spawn_ranking(Duration::from_secs(config.chain.rank_interval_secs));
    let reader = Arc::new(ChainReader::new(Arc::clone(&client), config.chain.clone())?);

    let adaptive = Arc::new(AdaptiveEngine::new(pool.clone(), config.adaptive.clone()));
    let orchestrator = Arc::new(ScoreOrchestrator::new(
        pool.clone(),
        Arc::clone(&reader),
        Arc::clone(&adaptive),
        config.scoring.clone(),
        config.adaptive.clone(),
        config.dampening.clone(),
    ));

    let stats = JobStats::new();

    let refresh = Arc::new(HourlyRefresh::new(
        pool.clone(),
        Arc::clone(&orchestrator),
        Arc::clone(&reader),
        stats.clone(),
        RefreshConfig {
            delay_ms: config.scoring.rate_limit_delay_ms,
            ..RefreshConfig::default()
        },
    ));
    let matcher = Arc::new(OutcomeMatcher::new(
        pool.clone(),
        stats.clone(),
        OutcomeMatcherConfig::default(),
    ));
    let anomaly = Arc::new(AnomalyDetector::new(
        pool.clone(),
        stats.clone(),
        AnomalyConfig::default(),
    ));

    tokio::spawn(Arc::clone(&refresh).run());
    tokio::spawn(Arc::clone(&matcher).run());
    tokio::spawn(Arc::clone(&anomaly).run());

    // Adaptive weights re-learn after each outcome-matching interval
    let adaptive_for_loop = Arc::clone(&adaptive);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(6 * 3_600));
        loop {
            ticker.tick().await;
            if let Err(e) = adaptive_for_loop.recompute().await {
                tracing::error!(error = %e, "adaptive weight recompute failed");
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down BaseScore jobs");
    Ok(())
}
