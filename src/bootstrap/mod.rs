//! Composition root.
//!
//! Builds every service once and wires the pipelines together:
//!
//! ```text
//! BlockScanner -> "blocks" -> DedupStage -> "tx_dedup" -> BlockLogger
//! NodeListJob  -> "nodes"  -> NodeChurnDetector -> "node_churn" -> ChurnLogger
//! ```
//!
//! Services are shared as `Arc`s; nothing is global apart from the metrics registry.

use async_trait::async_trait;
use std::{error::Error, sync::Arc, time::Duration};

use crate::{
	models::{BlockResult, NodeSetChanges, ServiceConfig, StoreConfig},
	services::{
		blockchain::ChainClient,
		cache::{LastBlockCached, NodeListCached},
		churn::{JobSchedulerTrait, NodeChurnDetector, NodeListJob},
		decoder::BlockDecoder,
		dedup::{DedupStage, TxDeduplicator},
		pipeline::{DelegatePipeline, Flagship, NodeSnapshot, PassageGate, Subscriber},
		scanner::{BlockScanner, ScannerStateStore},
		store::{KeyValueStore, MemoryStore, RedisStore, StoreError},
	},
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Name of the pipeline fed by the block scanner
pub const BLOCK_PIPELINE: &str = "blocks";

/// Name of the pipeline fed by the node list job
pub const NODE_PIPELINE: &str = "nodes";

/// Opens the configured store: Redis when a URL is set, memory otherwise.
pub async fn create_store(
	config: &StoreConfig,
) -> std::result::Result<Arc<dyn KeyValueStore>, StoreError> {
	match &config.redis_url {
		Some(url) => Ok(Arc::new(RedisStore::connect(url).await?)),
		None => {
			tracing::warn!("No redis url configured, state is kept in memory and lost on restart");
			Ok(Arc::new(MemoryStore::new()))
		}
	}
}

/// Logs a summary of every block that reaches the end of the block pipeline.
pub struct BlockLogger;

#[async_trait]
impl Subscriber<BlockResult> for BlockLogger {
	fn name(&self) -> String {
		"block_logger".to_string()
	}

	async fn on_data(&self, sender: &str, data: &BlockResult) -> anyhow::Result<()> {
		tracing::info!(
			pipeline = %sender,
			height = data.height,
			txs = data.txs.len(),
			event_types = data.all_event_types().len(),
			"Block processed"
		);
		Ok(())
	}

	async fn on_error(&self, sender: &str, error: &(dyn Error + Send + Sync)) -> anyhow::Result<()> {
		tracing::warn!(pipeline = %sender, "Block source error: {}", error);
		Ok(())
	}
}

/// Logs every node set change.
pub struct ChurnLogger;

#[async_trait]
impl Subscriber<NodeSetChanges> for ChurnLogger {
	fn name(&self) -> String {
		"churn_logger".to_string()
	}

	async fn on_data(&self, _sender: &str, data: &NodeSetChanges) -> anyhow::Result<()> {
		let idents = |nodes: &[crate::models::NodeInfo]| {
			nodes
				.iter()
				.map(|node| node.ident().to_string())
				.collect::<Vec<_>>()
		};

		if data.has_churn_happened() {
			tracing::info!(
				block_height = data.block_height,
				activated = ?idents(&data.nodes_activated),
				deactivated = ?idents(&data.nodes_deactivated),
				"Churn detected"
			);
		}
		tracing::info!(
			added = ?idents(&data.nodes_added),
			removed = ?idents(&data.nodes_removed),
			changes = data.count_of_changes(),
			"Node set changed"
		);
		Ok(())
	}
}

/// Every long-lived service of one ingestion process.
pub struct Services {
	pub config: ServiceConfig,
	pub store: Arc<dyn KeyValueStore>,
	pub client: Arc<dyn ChainClient>,
	pub last_block: Arc<LastBlockCached>,
	pub node_list: Arc<NodeListCached>,
	pub block_pipeline: Arc<DelegatePipeline<BlockResult>>,
	pub dedup_stage: Arc<DedupStage>,
	pub node_pipeline: Arc<DelegatePipeline<NodeSnapshot>>,
	pub churn_detector: Arc<NodeChurnDetector>,
}

/// Builds the services and connects the pipelines.
///
/// # Errors
/// Returns an error if a subscriber cannot be registered
pub async fn initialize_services(
	config: ServiceConfig,
	client: Arc<dyn ChainClient>,
	store: Arc<dyn KeyValueStore>,
) -> Result<Services> {
	let gate: Arc<dyn PassageGate> = Arc::new(Flagship::new(store.clone()));

	let last_block = Arc::new(LastBlockCached::new(client.clone(), &config.cache));
	let node_list = Arc::new(NodeListCached::new(client.clone(), &config.cache));

	let block_pipeline = Arc::new(DelegatePipeline::new(BLOCK_PIPELINE).with_gate(gate.clone()));
	let deduplicator = Arc::new(TxDeduplicator::from_config(store.clone(), &config.dedup));
	let dedup_stage = Arc::new(DedupStage::new(deduplicator));
	block_pipeline.add_subscriber(dedup_stage.clone()).await?;
	dedup_stage.pipeline().add_subscriber(Arc::new(BlockLogger)).await?;

	let node_pipeline = Arc::new(DelegatePipeline::new(NODE_PIPELINE).with_gate(gate));
	let churn_detector =
		Arc::new(NodeChurnDetector::new(store.clone()).with_last_block(last_block.clone()));
	node_pipeline.add_subscriber(churn_detector.clone()).await?;
	churn_detector.pipeline().add_subscriber(Arc::new(ChurnLogger)).await?;

	tracing::info!(network = %config.network.slug, "Services initialized");
	Ok(Services {
		config,
		store,
		client,
		last_block,
		node_list,
		block_pipeline,
		dedup_stage,
		node_pipeline,
		churn_detector,
	})
}

impl Services {
	/// Block scanner feeding the block pipeline, resuming from the shared store.
	pub fn create_scanner(&self) -> BlockScanner {
		let network = &self.config.network;
		BlockScanner::new(
			network.slug.clone(),
			self.client.clone(),
			BlockDecoder::new(network.address_prefix.clone(), network.attribute_encoding),
			self.block_pipeline.clone(),
			self.config.scanner.clone(),
			Duration::from_millis(network.block_time_ms),
		)
		.with_tip_source(self.last_block.clone())
		.with_state_store(ScannerStateStore::new(self.store.clone(), BlockScanner::NAME))
	}

	/// Scheduled node list poll, or `None` when churn detection is disabled.
	///
	/// # Errors
	/// Returns an error if the scheduler cannot be created
	pub async fn create_node_list_job<J: JobSchedulerTrait>(&self) -> Result<Option<NodeListJob<J>>> {
		if !self.config.churn.enabled {
			tracing::info!("Churn detection disabled");
			return Ok(None);
		}
		let job = NodeListJob::new(
			&self.config.churn,
			self.node_list.clone(),
			self.node_pipeline.clone(),
		)
		.await?;
		Ok(Some(job))
	}
}
