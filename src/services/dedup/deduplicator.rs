//! "Seen before" checks for transaction hashes.

use std::sync::Arc;

use crate::{
	models::DedupConfig,
	services::{
		dedup::BloomFilter,
		store::{KeyValueStore, StoreError},
	},
	utils::metrics::DEDUP_CHECKS,
};

/// Request counters kept next to the filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
	pub total_requests: u64,
	pub positive_requests: u64,
	pub write_requests: u64,
}

impl DedupStats {
	/// Share of lookups that found the item already seen
	pub fn positive_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.positive_requests as f64 / self.total_requests as f64
		}
	}
}

/// Bloom-filter backed record of processed transaction hashes.
///
/// Empty hashes count as seen so they are never forwarded.
#[derive(Clone)]
pub struct TxDeduplicator {
	name: String,
	filter: BloomFilter,
	store: Arc<dyn KeyValueStore>,
	stats_key: String,
}

impl TxDeduplicator {
	pub const KEY_PREFIX: &'static str = "tx:dedup_v2:";

	pub fn new(store: Arc<dyn KeyValueStore>, name: &str, capacity: u64, error_rate: f64) -> Self {
		let key = format!("{}{}", Self::KEY_PREFIX, name);
		let stats_key = format!("{}:stats", key);
		let filter = BloomFilter::new(store.clone(), key, capacity, error_rate);
		tracing::info!(
			dedup = %name,
			capacity,
			error_rate,
			size_bits = filter.params().size_bits,
			hash_count = filter.params().hash_count,
			"Deduplicator initialized"
		);
		Self {
			name: name.to_string(),
			filter,
			store,
			stats_key,
		}
	}

	pub fn from_config(store: Arc<dyn KeyValueStore>, config: &DedupConfig) -> Self {
		Self::new(store, &config.name, config.capacity, config.error_rate)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn key(&self) -> &str {
		self.filter.key()
	}

	pub fn filter(&self) -> &BloomFilter {
		&self.filter
	}

	async fn count(&self, field: &str, by: i64) -> Result<(), StoreError> {
		if by > 0 {
			self.store.hincr_by(&self.stats_key, field, by).await?;
		}
		Ok(())
	}

	fn record_checks(&self, seen: usize, new: usize) {
		DEDUP_CHECKS
			.with_label_values(&[self.name.as_str(), "seen"])
			.inc_by(seen as u64);
		DEDUP_CHECKS
			.with_label_values(&[self.name.as_str(), "new"])
			.inc_by(new as u64);
	}

	pub async fn have_ever_seen(&self, tx_hash: &str) -> Result<bool, StoreError> {
		if tx_hash.is_empty() {
			return Ok(true);
		}
		let seen = self.filter.contains(tx_hash).await?;
		self.count("total_requests", 1).await?;
		if seen {
			self.count("positive_requests", 1).await?;
		}
		self.record_checks(seen as usize, !seen as usize);
		Ok(seen)
	}

	pub async fn mark_as_seen(&self, tx_hash: &str) -> Result<(), StoreError> {
		if tx_hash.is_empty() {
			return Ok(());
		}
		self.filter.add(tx_hash).await?;
		self.count("write_requests", 1).await
	}

	pub async fn batch_mark_as_seen(&self, tx_hashes: &[String]) -> Result<(), StoreError> {
		let hashes: Vec<&str> = tx_hashes
			.iter()
			.map(String::as_str)
			.filter(|hash| !hash.is_empty())
			.collect();
		self.filter.add_many(&hashes).await?;
		self.count("write_requests", hashes.len() as i64).await
	}

	/// Seen flag of every hash, in order, from one filter lookup.
	pub async fn batch_ever_seen(&self, tx_hashes: &[String]) -> Result<Vec<bool>, StoreError> {
		let lookups: Vec<&str> = tx_hashes
			.iter()
			.map(String::as_str)
			.filter(|hash| !hash.is_empty())
			.collect();
		let mut found = self.filter.contains_many(&lookups).await?.into_iter();
		let flags: Vec<bool> = tx_hashes
			.iter()
			.map(|hash| hash.is_empty() || found.next().unwrap_or(false))
			.collect();

		let positives = flags
			.iter()
			.zip(tx_hashes)
			.filter(|(seen, hash)| **seen && !hash.is_empty())
			.count();
		self.count("total_requests", lookups.len() as i64).await?;
		self.count("positive_requests", positives as i64).await?;
		self.record_checks(positives, lookups.len() - positives);
		Ok(flags)
	}

	async fn filter_by_flag(&self, tx_hashes: &[String], wanted: bool) -> Result<Vec<String>, StoreError> {
		let flags = self.batch_ever_seen(tx_hashes).await?;
		Ok(tx_hashes
			.iter()
			.zip(flags)
			.filter(|(_, seen)| *seen == wanted)
			.map(|(hash, _)| hash.clone())
			.collect())
	}

	/// Hashes never marked as seen, in input order
	pub async fn only_new(&self, tx_hashes: &[String]) -> Result<Vec<String>, StoreError> {
		self.filter_by_flag(tx_hashes, false).await
	}

	/// Hashes already marked as seen, in input order
	pub async fn only_seen(&self, tx_hashes: &[String]) -> Result<Vec<String>, StoreError> {
		self.filter_by_flag(tx_hashes, true).await
	}

	pub async fn stats(&self) -> Result<DedupStats, StoreError> {
		let raw = self.store.hgetall(&self.stats_key).await?;
		let field = |name: &str| {
			raw.get(name)
				.and_then(|value| value.parse::<u64>().ok())
				.unwrap_or(0)
		};
		Ok(DedupStats {
			total_requests: field("total_requests"),
			positive_requests: field("positive_requests"),
			write_requests: field("write_requests"),
		})
	}

	/// Forgets every hash. Statistics are kept.
	pub async fn clear(&self) -> Result<(), StoreError> {
		self.filter.clear().await
	}
}
