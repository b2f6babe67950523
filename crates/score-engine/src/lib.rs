//! BaseScore scoring engine.
//!
//! Takes a wallet address through the full pipeline: chain and store
//! facts, fraud analysis, five dimension calculators, adaptive composite
//! assembly, integrity and temporal dampening, and persistence.

pub mod adaptive;
pub mod breakpoints;
pub mod confidence;
pub mod dampening;
pub mod dimensions;
pub mod facts;
pub mod fraud;
pub mod integrity;
pub mod orchestrator;
pub mod trajectory;

pub use adaptive::{AdaptiveEngine, DimensionWeights};
pub use facts::{StoreAggregates, WalletFacts};
pub use fraud::{FraudAnalysis, GamingIndicator, SybilIndicator};
pub use orchestrator::{ScoreOptions, ScoreOrchestrator};
pub use trajectory::{Direction, Trajectory};
