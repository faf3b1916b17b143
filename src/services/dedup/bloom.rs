//! Bloom filter stored as one bitfield in the shared store.

use sha2::{Digest, Sha256};
use std::{f64::consts::LN_2, sync::Arc};

use crate::services::store::{KeyValueStore, StoreError};

/// Bit array size and hash count for a target capacity and false-positive rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomParams {
	pub size_bits: u64,
	pub hash_count: u32,
}

impl BloomParams {
	/// `m = ceil(-n ln p / ln² 2)`, `k = round(m / n · ln 2)`, both at least 1.
	pub fn optimal(capacity: u64, error_rate: f64) -> Self {
		let n = capacity.max(1) as f64;
		let p = error_rate.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON);
		let size_bits = ((-n * p.ln()) / (LN_2 * LN_2)).ceil().max(1.0) as u64;
		let hash_count = ((size_bits as f64 / n) * LN_2).round().max(1.0) as u32;
		Self {
			size_bits,
			hash_count,
		}
	}
}

/// Bit offsets of `item` for a filter of the given shape.
///
/// Offset `i` is the first 8 bytes, big-endian, of `SHA-256(item || i)` with `i` as a
/// 4-byte big-endian integer, reduced modulo the bit count.
pub fn bit_offsets(item: &[u8], params: BloomParams) -> Vec<u64> {
	(0..params.hash_count)
		.map(|i| {
			let digest = Sha256::new()
				.chain_update(item)
				.chain_update(i.to_be_bytes())
				.finalize();
			let mut head = [0u8; 8];
			head.copy_from_slice(&digest[..8]);
			u64::from_be_bytes(head) % params.size_bits
		})
		.collect()
}

/// Approximate set with no false negatives.
///
/// All bit operations of one call go to the store in a single batched request.
#[derive(Clone)]
pub struct BloomFilter {
	store: Arc<dyn KeyValueStore>,
	key: String,
	params: BloomParams,
}

impl BloomFilter {
	pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, capacity: u64, error_rate: f64) -> Self {
		Self {
			store,
			key: key.into(),
			params: BloomParams::optimal(capacity, error_rate),
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn params(&self) -> BloomParams {
		self.params
	}

	/// Adds `item`.
	///
	/// # Returns
	/// `true` if the item was not present before
	pub async fn add(&self, item: &str) -> Result<bool, StoreError> {
		let previous = self
			.store
			.set_bits(&self.key, &bit_offsets(item.as_bytes(), self.params))
			.await?;
		Ok(previous.iter().any(|bit| !bit))
	}

	pub async fn contains(&self, item: &str) -> Result<bool, StoreError> {
		let bits = self
			.store
			.get_bits(&self.key, &bit_offsets(item.as_bytes(), self.params))
			.await?;
		Ok(bits.iter().all(|bit| *bit))
	}

	/// Adds every item in one store request.
	pub async fn add_many(&self, items: &[&str]) -> Result<(), StoreError> {
		let offsets = self.offsets_of(items);
		if !offsets.is_empty() {
			self.store.set_bits(&self.key, &offsets).await?;
		}
		Ok(())
	}

	/// Membership of every item, in order, from one store request.
	pub async fn contains_many(&self, items: &[&str]) -> Result<Vec<bool>, StoreError> {
		let offsets = self.offsets_of(items);
		if offsets.is_empty() {
			return Ok(vec![false; items.len()]);
		}
		let bits = self.store.get_bits(&self.key, &offsets).await?;
		Ok(bits
			.chunks(self.params.hash_count as usize)
			.map(|chunk| chunk.iter().all(|bit| *bit))
			.collect())
	}

	fn offsets_of(&self, items: &[&str]) -> Vec<u64> {
		items
			.iter()
			.flat_map(|item| bit_offsets(item.as_bytes(), self.params))
			.collect()
	}

	pub async fn bit_count(&self) -> Result<u64, StoreError> {
		self.store.bit_count(&self.key).await
	}

	/// Estimated number of distinct items added, from the share of set bits.
	pub async fn estimated_len(&self) -> Result<u64, StoreError> {
		let set = self.bit_count().await? as f64;
		let m = self.params.size_bits as f64;
		let k = self.params.hash_count as f64;
		if set >= m {
			return Ok(u64::MAX);
		}
		Ok((-(m / k) * (1.0 - set / m).ln()).round() as u64)
	}

	pub async fn clear(&self) -> Result<(), StoreError> {
		self.store.delete(&self.key).await
	}
}
