//! Persisted scanner progress.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

use crate::{
	services::{
		scanner::ScannerServiceError,
		store::{load_json, save_json, KeyValueStore},
	},
	utils::now_ts,
};

/// Progress and health of one scanner, kept in the shared store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScannerState {
	pub role: String,
	/// Height of the last dispatched block
	pub last_block: u64,
	pub updated_at: f64,
	pub started_at: f64,
	/// Chain tip as last seen by the scanner
	pub chain_height: u64,
	pub total_blocks_scanned: u64,
	pub errors_encountered: u64,
	pub is_aggressive_mode: bool,
	/// Seconds spent dispatching one block, running average
	pub avg_block_processing_time: f64,
	pub max_block_processing_time: f64,
	pub last_message: String,
}

impl ScannerState {
	pub fn new(role: impl Into<String>) -> Self {
		Self {
			role: role.into(),
			..Default::default()
		}
	}

	/// Share of scan attempts that produced a block, in percent
	pub fn success_rate(&self) -> f64 {
		let total = self.total_blocks_scanned + self.errors_encountered;
		if total == 0 {
			0.0
		} else {
			self.total_blocks_scanned as f64 / total as f64 * 100.0
		}
	}

	/// Blocks between the scanner and the chain tip
	pub fn lag(&self) -> u64 {
		self.chain_height.saturating_sub(self.last_block)
	}

	/// Records a dispatched block taking `processing_secs` to deliver.
	pub fn on_block_scanned(&mut self, height: u64, processing_secs: f64) {
		self.last_block = height;
		self.updated_at = now_ts();
		self.total_blocks_scanned += 1;
		let n = self.total_blocks_scanned as f64;
		self.avg_block_processing_time =
			(self.avg_block_processing_time * (n - 1.0) + processing_secs) / n;
		self.max_block_processing_time = self.max_block_processing_time.max(processing_secs);
	}

	pub fn on_error(&mut self, message: impl Into<String>) {
		self.errors_encountered += 1;
		self.last_message = message.into();
		self.updated_at = now_ts();
	}
}

/// Store access for [`ScannerState`], one record per scanner role.
#[derive(Clone)]
pub struct ScannerStateStore {
	store: Arc<dyn KeyValueStore>,
	key: String,
}

impl ScannerStateStore {
	pub const KEY_PREFIX: &'static str = "tx:scanner:State:";

	pub fn new(store: Arc<dyn KeyValueStore>, role: &str) -> Self {
		Self {
			store,
			key: format!("{}{}", Self::KEY_PREFIX, role),
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub async fn load(&self) -> Result<Option<ScannerState>, ScannerServiceError> {
		load_json(self.store.as_ref(), &self.key)
			.await
			.map_err(|e| self.error("failed to load scanner state", e))
	}

	pub async fn save(&self, state: &ScannerState) -> Result<(), ScannerServiceError> {
		save_json(self.store.as_ref(), &self.key, state, None)
			.await
			.map_err(|e| self.error("failed to save scanner state", e))
	}

	fn error(&self, msg: &str, e: impl std::error::Error + Send + Sync + 'static) -> ScannerServiceError {
		ScannerServiceError::state_error(
			msg,
			Some(Box::new(e)),
			Some(HashMap::from([("key".to_string(), self.key.clone())])),
		)
	}
}
