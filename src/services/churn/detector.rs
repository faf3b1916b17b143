//! Node churn detection between successive node-list snapshots.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};

use crate::{
	models::{NodeInfo, NodeSetChanges},
	services::{
		cache::LastBlockCached,
		churn::{diff, ChurnError},
		pipeline::{DelegatePipeline, NodeSnapshot, Subscriber},
		store::{load_json, save_json, KeyValueStore},
	},
	utils::metrics::NODE_CHANGES,
};

/// Compares every node list it receives with the previous one and forwards the changes.
///
/// The previous snapshot lives in the shared store so a restart does not report the
/// whole node set as new.
pub struct NodeChurnDetector {
	store: Arc<dyn KeyValueStore>,
	pipeline: DelegatePipeline<NodeSetChanges>,
	last_block: Option<Arc<LastBlockCached>>,
}

impl NodeChurnDetector {
	pub const NAME: &'static str = "node_churn";
	pub const PREVIOUS_KEY: &'static str = "node_churn:previous";

	pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
		Self {
			store,
			pipeline: DelegatePipeline::new(Self::NAME),
			last_block: None,
		}
	}

	/// Stamps emitted changes with the last known chain height
	pub fn with_last_block(mut self, last_block: Arc<LastBlockCached>) -> Self {
		self.last_block = Some(last_block);
		self
	}

	/// Receivers of non-empty [`NodeSetChanges`]
	pub fn pipeline(&self) -> &DelegatePipeline<NodeSetChanges> {
		&self.pipeline
	}

	pub async fn previous_snapshot(&self) -> Result<Vec<NodeInfo>, ChurnError> {
		load_json::<Vec<NodeInfo>>(self.store.as_ref(), Self::PREVIOUS_KEY)
			.await
			.map(Option::unwrap_or_default)
			.map_err(|e| self.state_error("failed to read previous node snapshot", e))
	}

	async fn save_snapshot(&self, nodes: &[NodeInfo]) -> Result<(), ChurnError> {
		save_json(self.store.as_ref(), Self::PREVIOUS_KEY, &nodes, None)
			.await
			.map_err(|e| self.state_error("failed to save node snapshot", e))
	}

	fn state_error(&self, msg: &str, e: impl std::error::Error + Send + Sync + 'static) -> ChurnError {
		ChurnError::state_error(
			msg,
			Some(Box::new(e)),
			Some(HashMap::from([(
				"key".to_string(),
				Self::PREVIOUS_KEY.to_string(),
			)])),
		)
	}

	/// Diffs `nodes` against the stored snapshot, then stores `nodes` as the new snapshot.
	pub async fn process(&self, nodes: &[NodeInfo]) -> Result<NodeSetChanges, ChurnError> {
		let previous = self.previous_snapshot().await?;
		let mut changes = diff(&previous, nodes);
		self.save_snapshot(nodes).await?;
		tracing::info!(nodes = nodes.len(), "Saved state of the node set");

		if let Some(last_block) = &self.last_block {
			changes.block_height = last_block.peek().await.unwrap_or_default();
		}

		for (kind, count) in [
			("added", changes.nodes_added.len()),
			("removed", changes.nodes_removed.len()),
			("activated", changes.nodes_activated.len()),
			("deactivated", changes.nodes_deactivated.len()),
		] {
			if count > 0 {
				NODE_CHANGES.with_label_values(&[kind]).inc_by(count as u64);
			}
		}
		Ok(changes)
	}
}

#[async_trait]
impl Subscriber<NodeSnapshot> for NodeChurnDetector {
	fn name(&self) -> String {
		Self::NAME.to_string()
	}

	async fn on_data(&self, sender: &str, nodes: &NodeSnapshot) -> anyhow::Result<()> {
		if nodes.is_empty() {
			tracing::warn!(sender, "Empty node list received, keeping the previous snapshot");
			return Ok(());
		}

		let changes = self.process(nodes).await?;
		if changes.is_empty() {
			tracing::debug!(sender, "Node set unchanged");
			return Ok(());
		}

		tracing::info!(
			sender,
			changes = changes.count_of_changes(),
			churn = changes.has_churn_happened(),
			"Node set changed"
		);
		self.pipeline.dispatch(&changes).await;
		Ok(())
	}

	async fn on_error(&self, sender: &str, error: &(dyn std::error::Error + Send + Sync)) -> anyhow::Result<()> {
		self.pipeline.broadcast_error(error).await;
		tracing::debug!(sender, "Forwarded upstream error: {}", error);
		Ok(())
	}
}
