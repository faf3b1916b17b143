//! Mock implementation of the chain client.
//!
//! - [`MockChainClient`] - scripted `ChainClient` for scanner, cache and churn tests
//! - [`ScriptedChainClient`] - plays back a fixed list of block payloads

use async_trait::async_trait;
use mockall::mock;
use std::{collections::VecDeque, sync::Mutex};

use thorchain_ingest::{
	models::{BlockPayload, NodeInfo, RawBlock, ScannerError},
	services::blockchain::{BlockChainError, ChainClient},
};

mock! {
	/// Mock implementation of the chain client trait.
	pub ChainClient {}

	#[async_trait]
	impl ChainClient for ChainClient {
		async fn fetch_block(&self, height: u64) -> Result<BlockPayload, BlockChainError>;
		async fn get_latest_height(&self) -> Result<u64, BlockChainError>;
		async fn fetch_nodes(&self) -> Result<Vec<NodeInfo>, BlockChainError>;
	}
}

/// Answers `fetch_block` from a script, one entry per call, and records the heights asked for.
///
/// Once the script is exhausted every height is reported as not produced yet.
pub struct ScriptedChainClient {
	script: Mutex<VecDeque<BlockPayload>>,
	requested: Mutex<Vec<u64>>,
	tip: u64,
}

impl ScriptedChainClient {
	pub fn new(script: Vec<BlockPayload>, tip: u64) -> Self {
		Self {
			script: Mutex::new(script.into()),
			requested: Mutex::new(Vec::new()),
			tip,
		}
	}

	pub fn requested(&self) -> Vec<u64> {
		self.requested.lock().unwrap().clone()
	}
}

#[async_trait]
impl ChainClient for ScriptedChainClient {
	async fn fetch_block(&self, height: u64) -> Result<BlockPayload, BlockChainError> {
		self.requested.lock().unwrap().push(height);
		Ok(self
			.script
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| BlockPayload::Error(ScannerError::future("script exhausted"))))
	}

	async fn get_latest_height(&self) -> Result<u64, BlockChainError> {
		Ok(self.tip)
	}

	async fn fetch_nodes(&self) -> Result<Vec<NodeInfo>, BlockChainError> {
		Ok(vec![])
	}
}

/// Successful payload for `height` without transactions
pub fn ok_block(height: u64) -> BlockPayload {
	BlockPayload::Block(RawBlock {
		height,
		..Default::default()
	})
}
