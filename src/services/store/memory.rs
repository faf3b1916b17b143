//! In-process store.
//!
//! Every operation runs under a single lock, so the atomicity guarantees of
//! [`KeyValueStore`] hold within one process. Bit strings use the Redis layout:
//! offset 0 is the most significant bit of the first byte.

use async_trait::async_trait;
use std::{collections::HashMap, time::Duration};
use tokio::{sync::Mutex, time::Instant};

use crate::services::store::{KeyValueStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
	Str(String),
	Hash(HashMap<String, String>),
	Bits(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Entry {
	value: Value,
	expires_at: Option<Instant>,
}

impl Entry {
	fn new(value: Value, ttl: Option<Duration>) -> Self {
		Self {
			value,
			expires_at: ttl.map(|ttl| Instant::now() + ttl),
		}
	}

	fn is_expired(&self) -> bool {
		self.expires_at.is_some_and(|at| Instant::now() >= at)
	}
}

/// Store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: Mutex<HashMap<String, Entry>>,
}

fn wrong_type(key: &str) -> StoreError {
	StoreError::command_error(
		"operation against a key holding the wrong kind of value",
		None,
		Some(HashMap::from([("key".to_string(), key.to_string())])),
	)
}

fn bit_position(offset: u64) -> (usize, u8) {
	((offset / 8) as usize, 0x80u8 >> (offset % 8))
}

/// Drops the entry under `key` if it has expired and returns the live one.
fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
	if entries.get(key).is_some_and(Entry::is_expired) {
		entries.remove(key);
	}
	entries.get_mut(key)
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl KeyValueStore for MemoryStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		let mut entries = self.entries.lock().await;
		match live(&mut entries, key) {
			None => Ok(None),
			Some(Entry {
				value: Value::Str(s),
				..
			}) => Ok(Some(s.clone())),
			Some(_) => Err(wrong_type(key)),
		}
	}

	async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
		let mut entries = self.entries.lock().await;
		entries.insert(key.to_string(), Entry::new(Value::Str(value.to_string()), ttl));
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StoreError> {
		self.entries.lock().await.remove(key);
		Ok(())
	}

	async fn incr(&self, key: &str, by: i64) -> Result<i64, StoreError> {
		let mut entries = self.entries.lock().await;
		let (current, expires_at) = match live(&mut entries, key) {
			None => (0, None),
			Some(Entry {
				value: Value::Str(s),
				expires_at,
			}) => (s.parse::<i64>().map_err(|_| wrong_type(key))?, *expires_at),
			Some(_) => return Err(wrong_type(key)),
		};
		let next = current
			.checked_add(by)
			.ok_or_else(|| StoreError::command_error("increment would overflow", None, None))?;
		entries.insert(
			key.to_string(),
			Entry {
				value: Value::Str(next.to_string()),
				expires_at,
			},
		);
		Ok(next)
	}

	async fn hincr_by(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError> {
		let mut entries = self.entries.lock().await;
		if live(&mut entries, key).is_none() {
			entries.insert(
				key.to_string(),
				Entry::new(Value::Hash(HashMap::new()), None),
			);
		}
		let Some(Entry {
			value: Value::Hash(hash),
			..
		}) = entries.get_mut(key)
		else {
			return Err(wrong_type(key));
		};
		let current = match hash.get(field) {
			Some(raw) => raw.parse::<i64>().map_err(|_| wrong_type(key))?,
			None => 0,
		};
		let next = current + by;
		hash.insert(field.to_string(), next.to_string());
		Ok(next)
	}

	async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
		let mut entries = self.entries.lock().await;
		match live(&mut entries, key) {
			None => Ok(HashMap::new()),
			Some(Entry {
				value: Value::Hash(hash),
				..
			}) => Ok(hash.clone()),
			Some(_) => Err(wrong_type(key)),
		}
	}

	async fn set_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StoreError> {
		let mut entries = self.entries.lock().await;
		if live(&mut entries, key).is_none() {
			entries.insert(key.to_string(), Entry::new(Value::Bits(Vec::new()), None));
		}
		let Some(Entry {
			value: Value::Bits(bits),
			..
		}) = entries.get_mut(key)
		else {
			return Err(wrong_type(key));
		};

		let mut previous = Vec::with_capacity(offsets.len());
		for offset in offsets {
			let (byte, mask) = bit_position(*offset);
			if bits.len() <= byte {
				bits.resize(byte + 1, 0);
			}
			previous.push(bits[byte] & mask != 0);
			bits[byte] |= mask;
		}
		Ok(previous)
	}

	async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StoreError> {
		let mut entries = self.entries.lock().await;
		let bits: &[u8] = match live(&mut entries, key) {
			None => &[],
			Some(Entry {
				value: Value::Bits(bits),
				..
			}) => bits,
			Some(_) => return Err(wrong_type(key)),
		};
		Ok(offsets
			.iter()
			.map(|offset| {
				let (byte, mask) = bit_position(*offset);
				bits.get(byte).is_some_and(|b| b & mask != 0)
			})
			.collect())
	}

	async fn bit_count(&self, key: &str) -> Result<u64, StoreError> {
		let mut entries = self.entries.lock().await;
		match live(&mut entries, key) {
			None => Ok(0),
			Some(Entry {
				value: Value::Bits(bits),
				..
			}) => Ok(bits.iter().map(|b| b.count_ones() as u64).sum()),
			Some(Entry {
				value: Value::Str(s),
				..
			}) => Ok(s.bytes().map(|b| b.count_ones() as u64).sum()),
			Some(_) => Err(wrong_type(key)),
		}
	}

	async fn compare_and_set(
		&self,
		key: &str,
		expected: Option<&str>,
		new_value: &str,
		ttl: Option<Duration>,
	) -> Result<bool, StoreError> {
		let mut entries = self.entries.lock().await;
		let current = match live(&mut entries, key) {
			None => None,
			Some(Entry {
				value: Value::Str(s),
				..
			}) => Some(s.as_str()),
			Some(_) => return Err(wrong_type(key)),
		};
		if current != expected {
			return Ok(false);
		}
		entries.insert(
			key.to_string(),
			Entry::new(Value::Str(new_value.to_string()), ttl),
		);
		Ok(true)
	}
}
