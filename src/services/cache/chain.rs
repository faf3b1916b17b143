//! Chain-backed cached sources.

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
	models::{CacheConfig, NodeInfo},
	services::{
		blockchain::ChainClient,
		cache::{CacheError, CachePolicy, Cached, CachedDataSource, DataLoader},
	},
};

/// Loads the chain tip height
pub struct LatestHeightLoader {
	client: Arc<dyn ChainClient>,
}

impl LatestHeightLoader {
	pub fn new(client: Arc<dyn ChainClient>) -> Self {
		Self { client }
	}
}

#[async_trait]
impl DataLoader<u64> for LatestHeightLoader {
	async fn load(&self) -> anyhow::Result<u64> {
		Ok(self.client.get_latest_height().await?)
	}
}

/// Loads the validator node list
pub struct NodeListLoader {
	client: Arc<dyn ChainClient>,
}

impl NodeListLoader {
	pub fn new(client: Arc<dyn ChainClient>) -> Self {
		Self { client }
	}
}

#[async_trait]
impl DataLoader<Vec<NodeInfo>> for NodeListLoader {
	async fn load(&self) -> anyhow::Result<Vec<NodeInfo>> {
		Ok(self.client.fetch_nodes().await?)
	}
}

/// Current chain height, refreshed roughly once per block
pub struct LastBlockCached {
	source: CachedDataSource<u64>,
}

impl LastBlockCached {
	pub fn new(client: Arc<dyn ChainClient>, config: &CacheConfig) -> Self {
		Self {
			source: CachedDataSource::new(
				"last_block",
				Arc::new(LatestHeightLoader::new(client)),
				CachePolicy::from_config(config.last_block_ttl_secs, config),
			),
		}
	}

	pub async fn get(&self, forced: bool) -> Result<Cached<u64>, CacheError> {
		self.source.get(forced).await
	}

	/// Chain tip height, stale or fresh
	pub async fn height(&self) -> Result<u64, CacheError> {
		self.get(false).await.map(Cached::into_value)
	}

	/// Last known height without touching the node
	pub async fn peek(&self) -> Option<u64> {
		self.source.peek().await
	}
}

/// Validator node list used for churn detection
pub struct NodeListCached {
	source: CachedDataSource<Vec<NodeInfo>>,
}

impl NodeListCached {
	pub fn new(client: Arc<dyn ChainClient>, config: &CacheConfig) -> Self {
		Self {
			source: CachedDataSource::new(
				"node_list",
				Arc::new(NodeListLoader::new(client)),
				CachePolicy::from_config(config.node_list_ttl_secs, config),
			),
		}
	}

	pub async fn get(&self, forced: bool) -> Result<Cached<Vec<NodeInfo>>, CacheError> {
		self.source.get(forced).await
	}

	pub async fn nodes(&self) -> Result<Vec<NodeInfo>, CacheError> {
		self.get(false).await.map(Cached::into_value)
	}
}
