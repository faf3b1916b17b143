use mockall::Sequence;
use std::sync::Arc;

use thorchain_ingest::{
	models::{BlockResult, NativeTx, NodeSetChanges},
	services::{
		dedup::{DedupStage, TxDeduplicator},
		pipeline::{DelegatePipeline, Flagship, PassageGate, PipelineError, Subscriber},
		store::{KeyValueStore, MemoryStore},
	},
};

use crate::integration::mocks::{MockBlockSubscriber, MockChurnSubscriber};

fn named(name: &str) -> MockBlockSubscriber {
	let mut subscriber = MockBlockSubscriber::new();
	subscriber.expect_name().return_const(name.to_string());
	subscriber
}

fn block(height: u64, hashes: &[&str]) -> BlockResult {
	BlockResult {
		height,
		txs: hashes
			.iter()
			.map(|hash| NativeTx {
				hash: hash.to_string(),
				..Default::default()
			})
			.collect(),
		..Default::default()
	}
}

#[tokio::test]
async fn test_delivery_follows_registration_order() {
	let mut seq = Sequence::new();
	let mut first = named("first");
	let mut second = named("second");
	first
		.expect_on_data()
		.times(1)
		.in_sequence(&mut seq)
		.returning(|sender, _| {
			assert_eq!(sender, "blocks");
			Ok(())
		});
	second
		.expect_on_data()
		.times(1)
		.in_sequence(&mut seq)
		.returning(|_, _| Ok(()));

	let pipeline = DelegatePipeline::new("blocks");
	pipeline.add_subscriber(Arc::new(first)).await.unwrap();
	pipeline.add_subscriber(Arc::new(second)).await.unwrap();
	assert_eq!(pipeline.subscriber_names().await, vec!["first", "second"]);

	let summary = pipeline.dispatch(&block(1, &[])).await.unwrap();
	assert_eq!(summary.delivered(), 2);
	assert_eq!(summary.elapsed[0].0, "first");
}

#[tokio::test]
async fn test_failing_subscriber_does_not_stop_delivery() {
	let mut failing = named("failing");
	failing
		.expect_on_data()
		.times(1)
		.returning(|_, _| Err(anyhow::anyhow!("database down")));
	let mut healthy = named("healthy");
	healthy.expect_on_data().times(1).returning(|_, _| Ok(()));

	let pipeline = DelegatePipeline::new("blocks");
	pipeline.add_subscriber(Arc::new(failing)).await.unwrap();
	pipeline.add_subscriber(Arc::new(healthy)).await.unwrap();

	let summary = pipeline.dispatch(&block(2, &[])).await.unwrap();
	assert_eq!(summary.failed, vec!["failing"]);
	assert_eq!(summary.delivered(), 2);
}

#[tokio::test]
async fn test_registration_rules() {
	let pipeline: DelegatePipeline<BlockResult> = DelegatePipeline::new("blocks");

	let itself = Arc::new(named("blocks"));
	assert!(matches!(
		pipeline.add_subscriber(itself).await,
		Err(PipelineError::RegistrationError(_))
	));

	let subscriber: Arc<dyn Subscriber<BlockResult>> = Arc::new(named("logger"));
	assert!(pipeline.add_subscriber(subscriber.clone()).await.unwrap());
	assert!(!pipeline.add_subscriber(subscriber.clone()).await.unwrap());
	assert!(pipeline.add_subscriber(Arc::new(named("logger"))).await.unwrap());
	assert_eq!(pipeline.subscriber_count().await, 2);

	assert!(pipeline.remove_subscriber(&subscriber).await);
	assert!(!pipeline.remove_subscriber(&subscriber).await);
	assert_eq!(pipeline.subscriber_count().await, 1);
}

#[tokio::test]
async fn test_closed_passage_skips_subscriber() {
	let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
	let flagship = Arc::new(Flagship::new(store));

	let mut muted = named("muted");
	muted.expect_on_data().never();
	let mut open = named("open");
	open.expect_on_data().times(2).returning(|_, _| Ok(()));

	let gate: Arc<dyn PassageGate> = flagship.clone();
	let pipeline = DelegatePipeline::new("blocks").with_gate(gate);
	pipeline.add_subscriber(Arc::new(muted)).await.unwrap();
	pipeline.add_subscriber(Arc::new(open)).await.unwrap();

	flagship
		.set_flag(&Flagship::passage_flag("blocks", "muted"), false)
		.await
		.unwrap();

	for height in [1, 2] {
		let summary = pipeline.dispatch(&block(height, &[])).await.unwrap();
		assert_eq!(summary.gated, vec!["muted"]);
	}

	let record = flagship
		.get_flag(&Flagship::passage_flag("blocks", "open"))
		.await
		.unwrap()
		.unwrap();
	assert!(record.value);
}

#[tokio::test]
async fn test_errors_broadcast_to_every_subscriber() {
	let mut first = named("first");
	first
		.expect_on_error()
		.times(1)
		.returning(|_, _| Err(anyhow::anyhow!("cannot handle")));
	let mut second = named("second");
	second.expect_on_error().times(1).returning(|sender, error| {
		assert_eq!(sender, "blocks");
		assert_eq!(error.to_string(), "node timeout");
		Ok(())
	});

	let pipeline = DelegatePipeline::new("blocks");
	pipeline.add_subscriber(Arc::new(first)).await.unwrap();
	pipeline.add_subscriber(Arc::new(second)).await.unwrap();

	let error = std::io::Error::new(std::io::ErrorKind::TimedOut, "node timeout");
	pipeline.broadcast_error(&error).await;
}

#[tokio::test]
async fn test_empty_changes_not_dispatched() {
	let mut subscriber = MockChurnSubscriber::new();
	subscriber.expect_name().return_const("churn".to_string());
	subscriber.expect_on_data().never();

	let pipeline = DelegatePipeline::new("node_churn");
	pipeline.add_subscriber(Arc::new(subscriber)).await.unwrap();
	assert!(pipeline.dispatch(&NodeSetChanges::empty()).await.is_none());
}

#[tokio::test]
async fn test_dedup_stage_forwards_each_hash_once() {
	let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
	let deduplicator = Arc::new(TxDeduplicator::new(store, "test_dedup", 10_000, 0.001));
	let stage = Arc::new(DedupStage::new(deduplicator.clone()));

	let received = Arc::new(std::sync::Mutex::new(Vec::new()));
	let mut sink = named("sink");
	let sink_received = received.clone();
	sink.expect_on_data().returning(move |_, block| {
		sink_received
			.lock()
			.unwrap()
			.push(block.txs.iter().map(|tx| tx.hash.clone()).collect::<Vec<_>>());
		Ok(())
	});
	stage.pipeline().add_subscriber(Arc::new(sink)).await.unwrap();

	let pipeline = DelegatePipeline::new("blocks");
	pipeline.add_subscriber(stage).await.unwrap();

	pipeline.dispatch(&block(1, &["A", "B"])).await;
	pipeline.dispatch(&block(2, &["B", "C", ""])).await;
	pipeline.dispatch(&block(3, &["A"])).await;

	let received = received.lock().unwrap();
	assert_eq!(received[0], vec!["A", "B"]);
	assert_eq!(received[1], vec!["C"]);
	assert!(received.iter().skip(2).all(Vec::is_empty));
	assert!(deduplicator.have_ever_seen("C").await.unwrap());
}
