//! Domain models.
//!
//! - `blockchain`: raw and decoded chain data, node snapshots
//! - `config`: configuration loading and validation
//! - `core`: network definition and service settings

mod blockchain;
mod config;
mod core;

pub use blockchain::{
	parse_last_available_height, BlockPayload, BlockResult, Coin, DecodedEvent, MsgDeposit,
	MsgObservedTx, MsgSend, NativeTx, NodeInfo, NodeSetChanges, NodeStatus, RawAttribute,
	RawBlock, RawEvent, RawTx, ScanErrorCode, ScannerError, TxMessage,
};

pub use config::{ConfigError, ConfigLoader, DEFAULT_CONFIG_PATH};

pub use core::{
	AttributeEncoding, CacheConfig, ChurnConfig, DedupConfig, Network, RpcUrl, ScannerConfig,
	ServiceConfig, StoreConfig,
};
