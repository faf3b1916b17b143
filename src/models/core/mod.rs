//! Core domain models.
//!
//! - Network: chain endpoints and chain parameters
//! - Settings: per-section service configuration

mod network;
mod settings;

pub use network::{AttributeEncoding, Network, RpcUrl};
pub use settings::{
	CacheConfig, ChurnConfig, DedupConfig, ScannerConfig, ServiceConfig, StoreConfig,
};
