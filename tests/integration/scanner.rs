use mockall::{predicate::eq, Sequence};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing_test::traced_test;

use thorchain_ingest::{
	models::{AttributeEncoding, BlockPayload, BlockResult, CacheConfig, ScannerConfig, ScannerError},
	services::{
		blockchain::{BlockChainError, ChainClient},
		cache::LastBlockCached,
		decoder::BlockDecoder,
		pipeline::DelegatePipeline,
		scanner::{BlockScanner, ScannerStateStore, TickOutcome},
		store::{KeyValueStore, MemoryStore},
	},
	utils::tests::block::{RawBlockBuilder, RawTxBuilder},
};

use crate::integration::mocks::{ok_block, MockBlockSubscriber, MockChainClient, ScriptedChainClient};

const BLOCK_TIME: Duration = Duration::from_millis(6000);

fn calm_config(start: u64) -> ScannerConfig {
	ScannerConfig {
		aggressive: false,
		start_height: Some(start),
		..Default::default()
	}
}

fn scanner_with(
	client: Arc<dyn ChainClient>,
	pipeline: Arc<DelegatePipeline<BlockResult>>,
	config: ScannerConfig,
) -> BlockScanner {
	BlockScanner::new(
		"thorchain",
		client,
		BlockDecoder::new("thor", AttributeEncoding::Auto),
		pipeline,
		config,
		BLOCK_TIME,
	)
}

fn recording_subscriber(heights: Arc<std::sync::Mutex<Vec<u64>>>) -> MockBlockSubscriber {
	let mut subscriber = MockBlockSubscriber::new();
	subscriber.expect_name().return_const("recorder".to_string());
	subscriber.expect_on_data().returning(move |_, block| {
		heights.lock().unwrap().push(block.height);
		Ok(())
	});
	subscriber
}

#[tokio::test]
async fn test_each_block_dispatched_once_in_order() {
	let mut client = MockChainClient::new();
	let mut seq = Sequence::new();
	for height in 101..=103 {
		client
			.expect_fetch_block()
			.with(eq(height))
			.times(1)
			.in_sequence(&mut seq)
			.returning(move |h| Ok(ok_block(h)));
	}

	let pipeline = Arc::new(DelegatePipeline::new("blocks"));
	let heights = Arc::new(std::sync::Mutex::new(Vec::new()));
	pipeline
		.add_subscriber(Arc::new(recording_subscriber(heights.clone())))
		.await
		.unwrap();

	let mut scanner = scanner_with(Arc::new(client), pipeline, calm_config(100));
	scanner.initialize().await.unwrap();
	for _ in 0..3 {
		assert_eq!(scanner.tick().await.outcome, TickOutcome::Advanced);
	}

	assert_eq!(scanner.last_block(), 103);
	assert_eq!(*heights.lock().unwrap(), vec![101, 102, 103]);
}

#[tokio::test]
async fn test_pruned_range_is_never_dispatched() {
	let client = Arc::new(ScriptedChainClient::new(
		vec![
			ok_block(10),
			BlockPayload::Error(ScannerError::ancient(
				"height 11 is not available, lowest height is 12",
			)),
			ok_block(13),
		],
		13,
	));

	let pipeline = Arc::new(DelegatePipeline::new("blocks"));
	let heights = Arc::new(std::sync::Mutex::new(Vec::new()));
	pipeline
		.add_subscriber(Arc::new(recording_subscriber(heights.clone())))
		.await
		.unwrap();

	let mut scanner = scanner_with(client.clone(), pipeline, calm_config(9));
	scanner.initialize().await.unwrap();
	for _ in 0..3 {
		scanner.tick().await;
	}

	assert_eq!(scanner.last_block(), 13);
	assert_eq!(*heights.lock().unwrap(), vec![10, 13]);
	assert_eq!(client.requested(), vec![10, 11, 13]);
}

#[tokio::test]
async fn test_ancient_without_jump_ahead_is_skipped_after_attempts() {
	let pruned = || {
		BlockPayload::Error(ScannerError::ancient(
			"height 11 is not available, lowest height is 12",
		))
	};
	let client = Arc::new(ScriptedChainClient::new(
		vec![pruned(), pruned(), ok_block(12)],
		12,
	));
	let config = ScannerConfig {
		jump_ahead: false,
		max_attempts: 2,
		..calm_config(10)
	};

	let mut scanner = scanner_with(client.clone(), Arc::new(DelegatePipeline::new("blocks")), config);
	scanner.initialize().await.unwrap();
	assert_eq!(scanner.tick().await.outcome, TickOutcome::ChainError);
	assert_eq!(scanner.last_block(), 10);
	assert_eq!(scanner.tick().await.outcome, TickOutcome::ChainError);
	assert_eq!(scanner.last_block(), 11);
	assert_eq!(scanner.tick().await.outcome, TickOutcome::Advanced);

	assert_eq!(scanner.last_block(), 12);
	assert_eq!(client.requested(), vec![11, 11, 12]);
}

#[tokio::test]
#[traced_test]
async fn test_transport_error_is_broadcast_and_logged() {
	let mut client = MockChainClient::new();
	client
		.expect_fetch_block()
		.returning(|_| Err(BlockChainError::connection_error("connection refused", None, None)));

	let mut subscriber = MockBlockSubscriber::new();
	subscriber.expect_name().return_const("watcher".to_string());
	subscriber.expect_on_data().never();
	subscriber.expect_on_error().times(1).returning(|sender, error| {
		assert_eq!(sender, "blocks");
		assert!(error.to_string().contains("connection refused"));
		Ok(())
	});

	let pipeline = Arc::new(DelegatePipeline::new("blocks"));
	pipeline.add_subscriber(Arc::new(subscriber)).await.unwrap();

	let mut scanner = scanner_with(Arc::new(client), pipeline, calm_config(5));
	scanner.initialize().await.unwrap();
	let report = scanner.tick().await;

	assert_eq!(report.outcome, TickOutcome::TransportError);
	assert_eq!(scanner.last_block(), 5);
	assert!(logs_contain("Node unreachable"));
}

#[tokio::test]
async fn test_failed_transactions_are_dropped() {
	let block = RawBlockBuilder::new(8)
		.tx(RawTxBuilder::new("AA").memo("ok").build())
		.tx(RawTxBuilder::new("BB").code(99).build())
		.build();
	let client = Arc::new(ScriptedChainClient::new(vec![BlockPayload::Block(block.clone())], 8));
	let scanner = scanner_with(client, Arc::new(DelegatePipeline::new("blocks")), calm_config(7));

	let result = scanner.fetch_one(8).await.unwrap();
	assert_eq!(result.txs.len(), 1);
	assert_eq!(result.txs[0].hash, "AA");

	let client = Arc::new(ScriptedChainClient::new(vec![BlockPayload::Block(block)], 8));
	let config = ScannerConfig {
		only_successful: false,
		..calm_config(7)
	};
	let scanner = scanner_with(client, Arc::new(DelegatePipeline::new("blocks")), config);
	assert_eq!(scanner.fetch_one(8).await.unwrap().txs.len(), 2);
}

#[tokio::test]
async fn test_starts_below_chain_tip_without_saved_state() {
	let mut client = MockChainClient::new();
	client.expect_get_latest_height().returning(|| Ok(5000));
	let client: Arc<dyn ChainClient> = Arc::new(client);
	let tip = Arc::new(LastBlockCached::new(client.clone(), &CacheConfig::default()));

	let config = ScannerConfig {
		start_height: None,
		..calm_config(0)
	};
	let mut scanner = scanner_with(client, Arc::new(DelegatePipeline::new("blocks")), config)
		.with_tip_source(tip);
	scanner.initialize().await.unwrap();

	assert_eq!(scanner.last_block(), 4999);
}

#[tokio::test]
async fn test_catch_up_once_jumps_backlog() {
	let mut client = MockChainClient::new();
	client.expect_get_latest_height().returning(|| Ok(900));
	client
		.expect_fetch_block()
		.with(eq(900))
		.times(1)
		.returning(|h| Ok(ok_block(h)));
	let client: Arc<dyn ChainClient> = Arc::new(client);
	let tip = Arc::new(LastBlockCached::new(client.clone(), &CacheConfig::default()));

	let config = ScannerConfig {
		catch_up_once: true,
		..calm_config(100)
	};
	let mut scanner = scanner_with(client, Arc::new(DelegatePipeline::new("blocks")), config)
		.with_tip_source(tip);
	scanner.initialize().await.unwrap();
	scanner.tick().await;

	assert_eq!(scanner.last_block(), 900);
}

#[tokio::test]
async fn test_progress_survives_restart() {
	let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
	let client = Arc::new(ScriptedChainClient::new(vec![ok_block(51), ok_block(52)], 52));

	let mut first = scanner_with(client.clone(), Arc::new(DelegatePipeline::new("blocks")), calm_config(50))
		.with_state_store(ScannerStateStore::new(store.clone(), BlockScanner::NAME));
	first.initialize().await.unwrap();
	first.tick().await;
	first.tick().await;

	let saved = ScannerStateStore::new(store.clone(), BlockScanner::NAME)
		.load()
		.await
		.unwrap()
		.unwrap();
	assert_eq!(saved.last_block, 52);
	assert_eq!(saved.total_blocks_scanned, 2);

	let mut second = scanner_with(client, Arc::new(DelegatePipeline::new("blocks")), calm_config(1))
		.with_state_store(ScannerStateStore::new(store, BlockScanner::NAME));
	second.initialize().await.unwrap();
	assert_eq!(second.last_block(), 52);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_polls_until_shutdown() {
	let client = Arc::new(ScriptedChainClient::new(
		(11..=13).map(ok_block).collect(),
		13,
	));
	let pipeline = Arc::new(DelegatePipeline::new("blocks"));
	let heights = Arc::new(std::sync::Mutex::new(Vec::new()));
	pipeline
		.add_subscriber(Arc::new(recording_subscriber(heights.clone())))
		.await
		.unwrap();

	let mut scanner = scanner_with(client, pipeline, calm_config(10));
	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let handle = tokio::spawn(async move {
		scanner.run(shutdown_rx).await;
		scanner.last_block()
	});

	tokio::time::sleep(BLOCK_TIME * 5).await;
	shutdown_tx.send(true).unwrap();

	assert_eq!(handle.await.unwrap(), 13);
	assert_eq!(*heights.lock().unwrap(), vec![11, 12, 13]);
}
