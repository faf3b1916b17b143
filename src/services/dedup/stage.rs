//! Pipeline stage dropping transactions that were already delivered.

use async_trait::async_trait;
use std::{error::Error, sync::Arc};

use crate::{
	models::BlockResult,
	services::{
		dedup::TxDeduplicator,
		pipeline::{DelegatePipeline, Subscriber},
		store::StoreError,
	},
};

/// Subscriber of the block pipeline that forwards each block with its already-seen
/// transactions removed.
///
/// Block events are always forwarded. Forwarded hashes are marked as seen once every
/// downstream subscriber had the block.
pub struct DedupStage {
	deduplicator: Arc<TxDeduplicator>,
	pipeline: DelegatePipeline<BlockResult>,
}

impl DedupStage {
	pub const NAME: &'static str = "tx_dedup";

	pub fn new(deduplicator: Arc<TxDeduplicator>) -> Self {
		Self {
			deduplicator,
			pipeline: DelegatePipeline::new(Self::NAME),
		}
	}

	/// Pipeline receiving the filtered blocks
	pub fn pipeline(&self) -> &DelegatePipeline<BlockResult> {
		&self.pipeline
	}

	/// Copy of `block` keeping only transactions never marked as seen.
	pub async fn filter_new(&self, block: &BlockResult) -> Result<BlockResult, StoreError> {
		let hashes: Vec<String> = block.txs.iter().map(|tx| tx.hash.clone()).collect();
		let flags = self.deduplicator.batch_ever_seen(&hashes).await?;

		let mut fresh = block.clone();
		let mut flags = flags.into_iter();
		fresh.txs.retain(|_| !flags.next().unwrap_or(true));
		Ok(fresh)
	}
}

#[async_trait]
impl Subscriber<BlockResult> for DedupStage {
	fn name(&self) -> String {
		Self::NAME.to_string()
	}

	async fn on_data(&self, _sender: &str, data: &BlockResult) -> anyhow::Result<()> {
		let fresh = self.filter_new(data).await?;
		let dropped = data.txs.len() - fresh.txs.len();
		if dropped > 0 {
			tracing::debug!(height = data.height, dropped, "Dropped already seen transactions");
		}

		self.pipeline.dispatch(&fresh).await;

		let hashes: Vec<String> = fresh.txs.iter().map(|tx| tx.hash.clone()).collect();
		self.deduplicator.batch_mark_as_seen(&hashes).await?;
		Ok(())
	}

	async fn on_error(&self, _sender: &str, error: &(dyn Error + Send + Sync)) -> anyhow::Result<()> {
		self.pipeline.broadcast_error(error).await;
		Ok(())
	}
}
