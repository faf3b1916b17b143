use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use thorchain_ingest::services::store::{
	load_json, save_json, KeyValueStore, MemoryStore, RedisStore, StoreError,
};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Checkpoint {
	height: u64,
	note: String,
}

/// Behavior every backend must share
async fn exercise_store(store: &dyn KeyValueStore, prefix: &str) {
	let key = |name: &str| format!("{}:{}", prefix, name);

	store.set(&key("plain"), "v1", None).await.unwrap();
	assert_eq!(store.get(&key("plain")).await.unwrap().as_deref(), Some("v1"));
	store.delete(&key("plain")).await.unwrap();
	assert_eq!(store.get(&key("plain")).await.unwrap(), None);

	assert_eq!(store.incr(&key("counter"), 5).await.unwrap(), 5);
	assert_eq!(store.incr(&key("counter"), -2).await.unwrap(), 3);

	store.hincr_by(&key("hash"), "a", 2).await.unwrap();
	store.hincr_by(&key("hash"), "a", 3).await.unwrap();
	store.hincr_by(&key("hash"), "b", 1).await.unwrap();
	let hash = store.hgetall(&key("hash")).await.unwrap();
	assert_eq!(hash.get("a").map(String::as_str), Some("5"));
	assert_eq!(hash.get("b").map(String::as_str), Some("1"));
	assert!(store.hgetall(&key("missing")).await.unwrap().is_empty());

	let bits = key("bits");
	assert_eq!(store.set_bits(&bits, &[0, 9, 9]).await.unwrap(), vec![false, false, true]);
	assert_eq!(store.get_bits(&bits, &[0, 1, 9, 4096]).await.unwrap(), vec![true, false, true, false]);
	assert_eq!(store.bit_count(&bits).await.unwrap(), 2);

	let cas = key("cas");
	assert!(store.compare_and_set(&cas, None, "1", None).await.unwrap());
	assert!(!store.compare_and_set(&cas, None, "2", None).await.unwrap());
	assert!(!store.compare_and_set(&cas, Some("0"), "2", None).await.unwrap());
	assert!(store.compare_and_set(&cas, Some("1"), "2", None).await.unwrap());
	assert_eq!(store.get(&cas).await.unwrap().as_deref(), Some("2"));

	let checkpoint = Checkpoint {
		height: 42,
		note: "after churn".to_string(),
	};
	save_json(store, &key("json"), &checkpoint, None).await.unwrap();
	assert_eq!(
		load_json::<Checkpoint>(store, &key("json")).await.unwrap(),
		Some(checkpoint)
	);

	for name in ["counter", "hash", "bits", "cas", "json"] {
		store.delete(&key(name)).await.unwrap();
	}
}

#[tokio::test]
async fn test_memory_store_operations() {
	exercise_store(&MemoryStore::new(), "test").await;
}

#[tokio::test]
async fn test_redis_store_operations() {
	let Ok(url) = std::env::var("REDIS_URL") else {
		eprintln!("REDIS_URL not set, skipping");
		return;
	};
	let store = RedisStore::connect(&url).await.unwrap();
	exercise_store(&store, &format!("thorchain_ingest_test:{}", uuid::Uuid::new_v4())).await;
}

#[tokio::test]
async fn test_redis_connect_failure() {
	let result = RedisStore::connect("not-a-redis-url").await;
	assert!(matches!(result, Err(StoreError::ConnectionError(_))));
}

#[tokio::test(start_paused = true)]
async fn test_memory_store_expiry() {
	let store = MemoryStore::new();
	store
		.set("session", "alive", Some(Duration::from_secs(30)))
		.await
		.unwrap();
	store
		.compare_and_set("lock", None, "owner", Some(Duration::from_secs(5)))
		.await
		.unwrap();

	tokio::time::advance(Duration::from_secs(10)).await;
	assert_eq!(store.get("session").await.unwrap().as_deref(), Some("alive"));
	assert_eq!(store.get("lock").await.unwrap(), None);
	assert!(store.compare_and_set("lock", None, "next", None).await.unwrap());

	tokio::time::advance(Duration::from_secs(25)).await;
	assert_eq!(store.get("session").await.unwrap(), None);
}

#[tokio::test]
async fn test_wrong_kind_and_bad_json_are_errors() {
	let store = MemoryStore::new();
	store.hincr_by("hash", "field", 1).await.unwrap();
	assert!(matches!(
		store.get("hash").await,
		Err(StoreError::CommandError(_))
	));

	store.set("json", "{not json", None).await.unwrap();
	assert!(matches!(
		load_json::<Checkpoint>(&store, "json").await,
		Err(StoreError::SerializationError(_))
	));
}

#[tokio::test]
async fn test_concurrent_increments_are_atomic() {
	let store = Arc::new(MemoryStore::new());
	let tasks: Vec<_> = (0..20)
		.map(|_| {
			let store = store.clone();
			tokio::spawn(async move {
				for _ in 0..10 {
					store.incr("hits", 1).await.unwrap();
				}
			})
		})
		.collect();
	for task in tasks {
		task.await.unwrap();
	}
	assert_eq!(store.get("hits").await.unwrap().as_deref(), Some("200"));
}
