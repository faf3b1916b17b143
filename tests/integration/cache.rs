use async_trait::async_trait;
use futures::future::join_all;
use std::{
	sync::{
		atomic::{AtomicBool, AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

use thorchain_ingest::{
	models::CacheConfig,
	services::{
		blockchain::{BlockChainError, ChainClient},
		cache::{CacheError, CachePolicy, CachedDataSource, DataLoader, LastBlockCached, NodeListCached},
	},
	utils::tests::node::{active_node, standby_node},
};

use crate::integration::mocks::MockChainClient;

/// Counts loads and fails while `failing` is set.
struct FlakyLoader {
	loads: AtomicUsize,
	failing: AtomicBool,
}

impl FlakyLoader {
	fn new() -> Self {
		Self {
			loads: AtomicUsize::new(0),
			failing: AtomicBool::new(false),
		}
	}
}

#[async_trait]
impl DataLoader<usize> for FlakyLoader {
	async fn load(&self) -> anyhow::Result<usize> {
		let n = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
		tokio::time::sleep(Duration::from_millis(50)).await;
		if self.failing.load(Ordering::SeqCst) {
			anyhow::bail!("node down");
		}
		Ok(n)
	}
}

fn quick_config() -> CacheConfig {
	CacheConfig {
		retry_times: 2,
		retry_delay_ms: 10,
		..Default::default()
	}
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_readers_share_one_load() {
	let mut client = MockChainClient::new();
	client
		.expect_get_latest_height()
		.times(1)
		.returning(|| Ok(19_000_000));
	let cache = Arc::new(LastBlockCached::new(Arc::new(client), &quick_config()));

	let results = join_all((0..50).map(|_| {
		let cache = cache.clone();
		async move { cache.height().await }
	}))
	.await;

	assert!(results.iter().all(|r| matches!(r, Ok(19_000_000))));
	assert_eq!(cache.peek().await, Some(19_000_000));
}

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_triggers_one_reload() {
	let loader = Arc::new(FlakyLoader::new());
	let source = CachedDataSource::new("test", loader.clone(), CachePolicy::with_ttl(Duration::from_secs(5)));

	assert_eq!(source.get(false).await.unwrap().into_value(), 1);
	tokio::time::advance(Duration::from_secs(4)).await;
	assert_eq!(source.get(false).await.unwrap().into_value(), 1);

	tokio::time::advance(Duration::from_secs(2)).await;
	assert_eq!(source.get(false).await.unwrap().into_value(), 2);
	assert_eq!(source.get(true).await.unwrap().into_value(), 3);
	assert_eq!(loader.loads.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stale_value_served_after_failed_refresh() {
	let loader = Arc::new(FlakyLoader::new());
	let policy = CachePolicy {
		retry_times: 3,
		retry_delay: Duration::from_millis(100),
		..CachePolicy::with_ttl(Duration::from_secs(1))
	};
	let source = CachedDataSource::new("test", loader.clone(), policy);
	source.get(false).await.unwrap();

	loader.failing.store(true, Ordering::SeqCst);
	tokio::time::advance(Duration::from_secs(2)).await;

	let cached = source.get(false).await.unwrap();
	assert!(cached.is_stale());
	assert_eq!(*cached.value(), 1);
	assert_eq!(loader.loads.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stale_value_expires_after_max_age() {
	let loader = Arc::new(FlakyLoader::new());
	let policy = CachePolicy {
		retry_times: 1,
		max_stale_age: Some(Duration::from_secs(10)),
		..CachePolicy::with_ttl(Duration::from_secs(1))
	};
	let source = CachedDataSource::new("test", loader.clone(), policy);
	source.get(false).await.unwrap();
	loader.failing.store(true, Ordering::SeqCst);

	tokio::time::advance(Duration::from_secs(5)).await;
	assert!(source.get(false).await.unwrap().is_stale());

	tokio::time::advance(Duration::from_secs(10)).await;
	assert!(matches!(source.get(false).await, Err(CacheError::Expired(_))));
	assert_eq!(source.peek().await, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_first_load_failure_is_an_error() {
	let mut client = MockChainClient::new();
	client
		.expect_fetch_nodes()
		.times(2)
		.returning(|| Err(BlockChainError::connection_error("refused", None, None)));
	let cache = NodeListCached::new(Arc::new(client), &quick_config());

	assert!(matches!(cache.nodes().await, Err(CacheError::LoadFailed(_))));
}

#[tokio::test(start_paused = true)]
async fn test_node_list_cached_between_polls() {
	let mut client = MockChainClient::new();
	client
		.expect_fetch_nodes()
		.times(1)
		.returning(|| Ok(vec![active_node("thor1a"), standby_node("thor1b")]));
	let client: Arc<dyn ChainClient> = Arc::new(client);
	let cache = NodeListCached::new(client, &quick_config());

	assert_eq!(cache.nodes().await.unwrap().len(), 2);
	assert_eq!(cache.nodes().await.unwrap().len(), 2);
}
