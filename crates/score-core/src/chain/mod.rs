//! Chain access: JSON-RPC transports and the typed wallet reader.

pub mod reader;
pub mod rpc;

pub use reader::{ChainFacts, ChainReader, TransferStats};
pub use rpc::{FallbackClient, LogEntry, RpcTransport};
