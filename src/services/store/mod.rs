//! Shared key-value store.
//!
//! State that several processes must agree on (deduplication bits, cooldown records,
//! rate limiter arrival times, pipeline gates, the scanner cursor) goes through the
//! [`KeyValueStore`] trait. Multi-step updates use the atomic operations the trait exposes
//! rather than in-process locking.
//!
//! - [`RedisStore`]: production backend over a Redis connection manager
//! - [`MemoryStore`]: in-process backend for single-instance runs and tests

mod error;
mod memory;
mod redis_store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::HashMap, time::Duration};

/// Operations required from the shared store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Stores `value`, optionally expiring after `ttl`.
	async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

	async fn delete(&self, key: &str) -> Result<(), StoreError>;

	/// Atomically adds `by` and returns the new value.
	async fn incr(&self, key: &str, by: i64) -> Result<i64, StoreError>;

	/// Atomically adds `by` to a hash field and returns the new value.
	async fn hincr_by(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError>;

	async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

	/// Sets every bit of `offsets` in one atomic round trip.
	///
	/// # Returns
	/// The previous value of each bit, in the order of `offsets`
	async fn set_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StoreError>;

	/// Reads every bit of `offsets` in one round trip.
	async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StoreError>;

	/// Number of set bits stored under `key`
	async fn bit_count(&self, key: &str) -> Result<u64, StoreError>;

	/// Replaces the value only if it currently equals `expected` (`None` meaning absent).
	///
	/// # Returns
	/// `true` if the swap happened
	async fn compare_and_set(
		&self,
		key: &str,
		expected: Option<&str>,
		new_value: &str,
		ttl: Option<Duration>,
	) -> Result<bool, StoreError>;
}

/// Reads and deserializes a JSON value.
pub async fn load_json<T: DeserializeOwned>(
	store: &dyn KeyValueStore,
	key: &str,
) -> Result<Option<T>, StoreError> {
	let Some(raw) = store.get(key).await? else {
		return Ok(None);
	};
	serde_json::from_str(&raw).map(Some).map_err(|e| {
		StoreError::serialization_error(
			format!("failed to decode value of '{}'", key),
			Some(Box::new(e)),
			None,
		)
	})
}

/// Serializes and writes a JSON value.
pub async fn save_json<T: Serialize + Sync>(
	store: &dyn KeyValueStore,
	key: &str,
	value: &T,
	ttl: Option<Duration>,
) -> Result<(), StoreError> {
	let raw = serde_json::to_string(value).map_err(|e| {
		StoreError::serialization_error(
			format!("failed to encode value of '{}'", key),
			Some(Box::new(e)),
			None,
		)
	})?;
	store.set(key, &raw, ttl).await
}
