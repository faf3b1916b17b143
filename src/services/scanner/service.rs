//! Block polling loop.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::watch, time::Instant};

use crate::{
	models::{BlockPayload, BlockResult, ScanErrorCode, ScannerConfig, ScannerError},
	services::{
		blockchain::{BlockChainError, ChainClient},
		cache::LastBlockCached,
		decoder::BlockDecoder,
		pipeline::DelegatePipeline,
		scanner::{ScannerServiceError, ScannerState, ScannerStateStore},
	},
	utils::metrics::{record_scan_progress, BLOCKS_DISPATCHED, SCAN_ERRORS},
};

/// Lag in blocks above which a tick catches up back-to-back
const AGGRESSIVE_LAG_BLOCKS: u64 = 2;

/// Silence, relative to the block time, after which a tick catches up back-to-back
const AGGRESSIVE_TIME_FACTOR: f64 = 1.1;

/// How one tick ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
	/// At least one block was dispatched and the loop stopped normally
	Advanced,
	/// The aggressive scan dispatched `max_blocks_per_tick` blocks and may still lag
	Saturated,
	/// The next block is not produced yet
	Waiting,
	/// The node refused the height; counted towards skipping it
	ChainError,
	/// The cursor jumped past a pruned range
	Jumped,
	/// The node could not be reached
	TransportError,
	/// Shutdown was requested between two blocks
	Stopped,
}

/// Result of [`BlockScanner::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
	pub dispatched: u32,
	pub outcome: TickOutcome,
	pub aggressive: bool,
}

/// Polls the chain block by block and dispatches every decoded block in height order.
///
/// The cursor `last_block` is the height of the last dispatched block; each fetch asks for
/// `last_block + 1`. Block N is fully dispatched before block N+1 is requested.
pub struct BlockScanner {
	name: String,
	network: String,
	client: Arc<dyn ChainClient>,
	decoder: BlockDecoder,
	pipeline: Arc<DelegatePipeline<BlockResult>>,
	config: ScannerConfig,
	block_time: Duration,
	tip_source: Option<Arc<LastBlockCached>>,
	state_store: Option<ScannerStateStore>,
	state: ScannerState,
	last_block: u64,
	attempts: u32,
	last_dispatch_at: Option<Instant>,
	initialized: bool,
	catch_up_pending: bool,
	shutdown: Option<watch::Receiver<bool>>,
}

impl BlockScanner {
	pub const NAME: &'static str = "block_scanner";

	pub fn new(
		network: impl Into<String>,
		client: Arc<dyn ChainClient>,
		decoder: BlockDecoder,
		pipeline: Arc<DelegatePipeline<BlockResult>>,
		config: ScannerConfig,
		block_time: Duration,
	) -> Self {
		Self {
			name: Self::NAME.to_string(),
			network: network.into(),
			client,
			decoder,
			pipeline,
			catch_up_pending: config.catch_up_once,
			config,
			block_time,
			tip_source: None,
			state_store: None,
			state: ScannerState::new(Self::NAME),
			last_block: 0,
			attempts: 0,
			last_dispatch_at: None,
			initialized: false,
			shutdown: None,
		}
	}

	/// Chain tip source used to seed the cursor and to detect lag
	pub fn with_tip_source(mut self, tip_source: Arc<LastBlockCached>) -> Self {
		self.tip_source = Some(tip_source);
		self
	}

	/// Persists progress after every dispatched block
	pub fn with_state_store(mut self, state_store: ScannerStateStore) -> Self {
		self.state = ScannerState::new(&self.name);
		self.state_store = Some(state_store);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Height of the last dispatched block
	pub fn last_block(&self) -> u64 {
		self.last_block
	}

	/// Moves the cursor by hand.
	pub fn set_last_block(&mut self, height: u64) {
		tracing::warn!(
			scanner = %self.name,
			from = self.last_block,
			to = height,
			"Cursor changed manually"
		);
		self.last_block = height;
		self.attempts = 0;
		self.initialized = true;
	}

	/// Failed attempts on the next height
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	pub fn state(&self) -> &ScannerState {
		&self.state
	}

	fn poll_interval(&self) -> Duration {
		self.config
			.poll_interval_ms
			.map(Duration::from_millis)
			.unwrap_or_else(|| self.block_time.mul_f64(0.99))
	}

	fn metadata(&self) -> HashMap<String, String> {
		HashMap::from([
			("scanner".to_string(), self.name.clone()),
			("network".to_string(), self.network.clone()),
		])
	}

	async fn chain_tip(&self, forced: bool) -> Option<u64> {
		let source = self.tip_source.as_ref()?;
		match source.get(forced).await {
			Ok(cached) => Some(cached.into_value()),
			Err(e) => {
				tracing::warn!(scanner = %self.name, "Chain tip unavailable: {}", e);
				None
			}
		}
	}

	/// Seeds the cursor: persisted state when resuming, then the configured start height,
	/// then the chain tip.
	pub async fn initialize(&mut self) -> Result<(), ScannerServiceError> {
		if let Some(store) = &self.state_store {
			if let Some(state) = store.load().await? {
				if self.config.resume && state.last_block > 0 {
					tracing::info!(scanner = %self.name, last_block = state.last_block, "Resuming from saved state");
					self.last_block = state.last_block;
					self.state = state;
					self.state.started_at = crate::utils::now_ts();
					self.initialized = true;
					return Ok(());
				}
			}
		}

		if let Some(start) = self.config.start_height {
			tracing::info!(scanner = %self.name, start, "Starting from configured height");
			self.last_block = start;
			self.initialized = true;
			return Ok(());
		}

		match self.chain_tip(true).await {
			Some(tip) if tip > 0 => {
				tracing::info!(scanner = %self.name, tip, "Starting from the chain tip");
				self.last_block = tip - 1;
				self.catch_up_pending = false;
				self.initialized = true;
				Ok(())
			}
			_ => Err(ScannerServiceError::initialization_error(
				"no starting height: no saved state, start height or chain tip",
				None,
				Some(self.metadata()),
			)),
		}
	}

	/// Fetches and decodes one height.
	///
	/// A node refusal becomes a [`BlockResult`] carrying the error; only an unreachable node
	/// is an `Err`.
	pub async fn fetch_one(&self, height: u64) -> Result<BlockResult, BlockChainError> {
		match self.client.fetch_block(height).await? {
			BlockPayload::Block(raw) if raw.height != height => {
				tracing::warn!(scanner = %self.name, height, returned = raw.height, "Node returned a different block");
				Ok(BlockResult::from_error(
					height,
					ScannerError::other(format!(
						"node returned block {} for requested height {}",
						raw.height, height
					)),
				))
			}
			BlockPayload::Block(raw) => {
				let block = self.decoder.decode(&raw);
				tracing::debug!(
					scanner = %self.name,
					height,
					txs = block.txs.len(),
					end_block_events = block.end_block_events.len(),
					"Block fetched"
				);
				Ok(if self.config.only_successful {
					block.only_successful()
				} else {
					block
				})
			}
			BlockPayload::Error(error) => Ok(BlockResult::from_error(height, error)),
		}
	}

	async fn should_run_aggressive_scan(&self) -> bool {
		if !self.config.aggressive {
			return false;
		}

		let tolerance = self.block_time.mul_f64(AGGRESSIVE_TIME_FACTOR);
		let silent = self.last_dispatch_at.map_or(true, |at| at.elapsed() > tolerance);
		if silent {
			tracing::debug!(scanner = %self.name, "No block for too long, aggressive scan");
			return true;
		}

		match self.chain_tip(false).await {
			Some(tip) if tip.saturating_sub(self.last_block) > AGGRESSIVE_LAG_BLOCKS => {
				tracing::debug!(scanner = %self.name, lag = tip - self.last_block, "Lagging, aggressive scan");
				true
			}
			_ => false,
		}
	}

	fn shutdown_requested(&self) -> bool {
		self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
	}

	fn count_error(&self, code: &str) {
		SCAN_ERRORS.with_label_values(&[&self.network, code]).inc();
	}

	/// Counts a failed attempt on the next height and skips it after `max_attempts`.
	fn on_failed_attempt(&mut self, reason: &str) {
		self.attempts += 1;
		self.state.on_error(reason);
		tracing::warn!(
			scanner = %self.name,
			height = self.last_block + 1,
			attempt = self.attempts,
			"Failed to fetch block: {}",
			reason
		);

		if self.attempts >= self.config.max_attempts.max(1) {
			tracing::error!(
				scanner = %self.name,
				height = self.last_block + 1,
				"Too many attempts, skipping block"
			);
			self.last_block += 1;
			self.attempts = 0;
		}
	}

	/// Handles a refused height.
	fn on_block_error(&mut self, block: &BlockResult) -> TickOutcome {
		let Some(error) = &block.error else {
			return TickOutcome::ChainError;
		};

		match error.code {
			ScanErrorCode::Future => {
				tracing::debug!(scanner = %self.name, height = block.height, "Block not produced yet");
				self.count_error("future");
				TickOutcome::Waiting
			}
			ScanErrorCode::Ancient => {
				self.count_error("ancient");
				match error.last_available_height {
					Some(last) if self.config.jump_ahead && last > self.last_block => {
						tracing::warn!(
							scanner = %self.name,
							from = self.last_block,
							to = last,
							"Blocks before {} are pruned, jumping ahead",
							last
						);
						self.state.last_message = format!("jumped from {} to {}", self.last_block, last);
						self.last_block = last;
						self.attempts = 0;
						TickOutcome::Jumped
					}
					_ => {
						self.on_failed_attempt(&error.message);
						TickOutcome::ChainError
					}
				}
			}
			ScanErrorCode::Ok | ScanErrorCode::Other => {
				self.count_error("other");
				self.on_failed_attempt(&error.message);
				TickOutcome::ChainError
			}
		}
	}

	async fn dispatch(&mut self, height: u64, block: BlockResult) {
		let started = Instant::now();
		if let Some(summary) = self.pipeline.dispatch(&block).await {
			if !summary.failed.is_empty() {
				tracing::warn!(scanner = %self.name, height, failed = ?summary.failed, "Some subscribers failed");
			}
		}

		self.last_block = height;
		self.attempts = 0;
		self.last_dispatch_at = Some(Instant::now());
		self.state.on_block_scanned(height, started.elapsed().as_secs_f64());
		BLOCKS_DISPATCHED.with_label_values(&[&self.network]).inc();

		let tip = self.chain_tip(false).await;
		if let Some(tip) = tip {
			self.state.chain_height = tip;
		}
		record_scan_progress(&self.network, height, tip);

		if let Some(store) = &self.state_store {
			if let Err(e) = store.save(&self.state).await {
				tracing::warn!(scanner = %self.name, height, "Scanner state not saved: {}", e);
			}
		}
	}

	/// Runs one polling step: one block, or up to `max_blocks_per_tick` when catching up.
	pub async fn tick(&mut self) -> TickReport {
		if self.catch_up_pending {
			self.catch_up_pending = false;
			if let Some(tip) = self.chain_tip(true).await {
				if tip > self.last_block + 1 {
					tracing::warn!(scanner = %self.name, from = self.last_block, tip, "Catching up to the chain tip");
					self.last_block = tip - 1;
					self.attempts = 0;
				}
			}
		}

		let aggressive = self.should_run_aggressive_scan().await;
		self.state.is_aggressive_mode = aggressive;
		let max_blocks = self.config.max_blocks_per_tick.max(1);
		let mut dispatched = 0;

		let outcome = loop {
			if dispatched > 0 && self.shutdown_requested() {
				break TickOutcome::Stopped;
			}

			let height = self.last_block + 1;
			let block = match self.fetch_one(height).await {
				Ok(block) => block,
				Err(e) => {
					tracing::warn!(scanner = %self.name, height, "Node unreachable: {}", e);
					self.count_error("transport");
					self.state.on_error(e.to_string());
					self.pipeline.broadcast_error(&e).await;
					break TickOutcome::TransportError;
				}
			};

			if block.is_error() {
				match self.on_block_error(&block) {
					TickOutcome::Jumped if aggressive => continue,
					outcome => break outcome,
				}
			}

			self.dispatch(height, block).await;
			dispatched += 1;

			if !aggressive {
				break TickOutcome::Advanced;
			}
			if dispatched >= max_blocks {
				break TickOutcome::Saturated;
			}
		};

		TickReport {
			dispatched,
			outcome,
			aggressive,
		}
	}

	/// Pause before the next tick
	pub fn pause_after(&self, report: &TickReport) -> Duration {
		match report.outcome {
			TickOutcome::Saturated | TickOutcome::Jumped => Duration::ZERO,
			TickOutcome::TransportError => Duration::from_millis(self.config.error_sleep_ms),
			_ => self.poll_interval(),
		}
	}

	/// Polls until `shutdown` turns true or its sender is dropped.
	pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
		self.shutdown = Some(shutdown.clone());
		self.state.started_at = crate::utils::now_ts();
		tracing::info!(scanner = %self.name, network = %self.network, "Block scanner started");

		loop {
			if *shutdown.borrow() {
				break;
			}

			let pause = if self.initialized {
				let report = self.tick().await;
				self.pause_after(&report)
			} else {
				match self.initialize().await {
					Ok(()) => Duration::ZERO,
					Err(e) => {
						tracing::warn!(scanner = %self.name, "Scanner not initialized: {}", e);
						Duration::from_millis(self.config.error_sleep_ms)
					}
				}
			};

			if pause.is_zero() {
				tokio::task::yield_now().await;
				continue;
			}

			tokio::select! {
				_ = tokio::time::sleep(pause) => {}
				changed = shutdown.changed() => {
					if changed.is_err() {
						break;
					}
				}
			}
		}

		tracing::info!(scanner = %self.name, last_block = self.last_block, "Block scanner stopped");
	}
}
