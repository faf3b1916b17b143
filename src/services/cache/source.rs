//! Single-flight TTL cache over an async loader.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
	sync::{Mutex, RwLock},
	time::Instant,
};

use crate::{models::CacheConfig, services::cache::CacheError};

/// Produces a fresh value for a [`CachedDataSource`].
#[async_trait]
pub trait DataLoader<T>: Send + Sync {
	async fn load(&self) -> anyhow::Result<T>;
}

/// Value returned by [`CachedDataSource::get`]
#[derive(Debug)]
pub enum Cached<T> {
	/// Loaded within the ttl
	Fresh(T),
	/// Last good value, returned because the refresh just failed
	Stale { value: T, error: CacheError },
}

impl<T> Cached<T> {
	pub fn value(&self) -> &T {
		match self {
			Self::Fresh(value) | Self::Stale { value, .. } => value,
		}
	}

	pub fn into_value(self) -> T {
		match self {
			Self::Fresh(value) | Self::Stale { value, .. } => value,
		}
	}

	pub fn is_stale(&self) -> bool {
		matches!(self, Self::Stale { .. })
	}
}

/// Retry and expiry settings of a cached source
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
	pub ttl: Duration,
	/// Load attempts per refresh, including the first
	pub retry_times: u32,
	/// Delay before the first retry; grows by 1.5 per attempt
	pub retry_delay: Duration,
	/// Age past which a stale value is no longer served. `None` serves it forever.
	pub max_stale_age: Option<Duration>,
}

impl CachePolicy {
	pub const RETRY_FACTOR: f32 = 1.5;

	pub fn with_ttl(ttl: Duration) -> Self {
		Self {
			ttl,
			retry_times: 3,
			retry_delay: Duration::from_secs(1),
			max_stale_age: None,
		}
	}

	/// Policy for a source refreshed every `ttl_secs`, retrying as `config` says.
	pub fn from_config(ttl_secs: u64, config: &CacheConfig) -> Self {
		Self {
			ttl: Duration::from_secs(ttl_secs),
			retry_times: config.retry_times.max(1),
			retry_delay: Duration::from_millis(config.retry_delay_ms),
			max_stale_age: config.max_stale_age_secs.map(Duration::from_secs),
		}
	}
}

struct CacheEntry<T> {
	value: T,
	loaded_at: Instant,
}

/// TTL cache whose concurrent refreshes collapse into one load.
///
/// A failed refresh never replaces a previously loaded value.
pub struct CachedDataSource<T> {
	name: String,
	loader: Arc<dyn DataLoader<T>>,
	policy: CachePolicy,
	entry: RwLock<Option<CacheEntry<T>>>,
	refresh_lock: Mutex<()>,
}

impl<T: Clone + Send + Sync + 'static> CachedDataSource<T> {
	pub fn new(name: impl Into<String>, loader: Arc<dyn DataLoader<T>>, policy: CachePolicy) -> Self {
		Self {
			name: name.into(),
			loader,
			policy,
			entry: RwLock::new(None),
			refresh_lock: Mutex::new(()),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn policy(&self) -> &CachePolicy {
		&self.policy
	}

	async fn fresh_value(&self) -> Option<T> {
		self.entry
			.read()
			.await
			.as_ref()
			.filter(|entry| entry.loaded_at.elapsed() < self.policy.ttl)
			.map(|entry| entry.value.clone())
	}

	/// Returns the cached value, loading it when missing, expired or `forced`.
	///
	/// # Errors
	/// [`CacheError::LoadFailed`] when every attempt failed and no value was ever loaded,
	/// [`CacheError::Expired`] when the last good value is older than `max_stale_age`.
	pub async fn get(&self, forced: bool) -> Result<Cached<T>, CacheError> {
		if !forced {
			if let Some(value) = self.fresh_value().await {
				return Ok(Cached::Fresh(value));
			}
		}

		let _guard = self.refresh_lock.lock().await;
		if !forced {
			if let Some(value) = self.fresh_value().await {
				return Ok(Cached::Fresh(value));
			}
		}

		match self.load_with_retry().await {
			Ok(value) => {
				*self.entry.write().await = Some(CacheEntry {
					value: value.clone(),
					loaded_at: Instant::now(),
				});
				Ok(Cached::Fresh(value))
			}
			Err(e) => self.fall_back(e).await,
		}
	}

	async fn load_with_retry(&self) -> anyhow::Result<T> {
		let backoff = ExponentialBuilder::default()
			.with_min_delay(self.policy.retry_delay)
			.with_factor(CachePolicy::RETRY_FACTOR)
			.with_max_times(self.policy.retry_times.saturating_sub(1) as usize);

		(|| self.loader.load())
			.retry(backoff)
			.sleep(tokio::time::sleep)
			.notify(|e, delay| {
				tracing::warn!(
					cache = %self.name,
					"Load failed, retrying in {:?}: {:#}",
					delay,
					e
				);
			})
			.await
	}

	async fn fall_back(&self, load_error: anyhow::Error) -> Result<Cached<T>, CacheError> {
		let metadata = Some(HashMap::from([("cache".to_string(), self.name.clone())]));
		let entry = self.entry.read().await;
		let Some(entry) = entry.as_ref() else {
			return Err(CacheError::load_failed(
				format!("no value after {} attempts", self.policy.retry_times),
				Some(load_error.into()),
				metadata,
			));
		};

		let age = entry.loaded_at.elapsed();
		if self.policy.max_stale_age.is_some_and(|max| age > max) {
			return Err(CacheError::expired(
				format!("last good value is {:?} old", age),
				Some(load_error.into()),
				metadata,
			));
		}

		Ok(Cached::Stale {
			value: entry.value.clone(),
			error: CacheError::load_failed(
				format!("serving value loaded {:?} ago", age),
				Some(load_error.into()),
				metadata,
			),
		})
	}

	/// Last loaded value regardless of age, without loading
	pub async fn peek(&self) -> Option<T> {
		self.entry
			.read()
			.await
			.as_ref()
			.map(|entry| entry.value.clone())
	}

	/// Time since the last successful load
	pub async fn age(&self) -> Option<Duration> {
		self.entry
			.read()
			.await
			.as_ref()
			.map(|entry| entry.loaded_at.elapsed())
	}
}
