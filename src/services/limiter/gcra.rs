//! Generic cell rate algorithm over the shared store.

use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
	services::store::{KeyValueStore, StoreError},
	utils::now_ts,
};

/// Swap attempts before a contended update gives up
pub(crate) const MAX_CAS_ATTEMPTS: usize = 16;

/// Allows `limit` calls per `period` seconds for one key, bursts included.
///
/// The stored value is the theoretical arrival time (TAT) as UNIX seconds.
#[derive(Clone)]
pub struct GcraLimiter {
	store: Arc<dyn KeyValueStore>,
	key: String,
	limit: u32,
	period: f64,
}

impl GcraLimiter {
	pub const KEY_PREFIX: &'static str = "rate_limit:";

	pub fn new(store: Arc<dyn KeyValueStore>, name: &str, limit: u32, period: f64) -> Self {
		Self {
			store,
			key: format!("{}{}", Self::KEY_PREFIX, name),
			limit: limit.max(1),
			period,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	/// Seconds between two calls at the sustained rate
	pub fn emission_interval(&self) -> f64 {
		self.period / self.limit as f64
	}

	pub async fn is_limited(&self) -> Result<bool, StoreError> {
		self.is_limited_at(now_ts()).await
	}

	/// Checks and, when allowed, consumes one call at time `now`.
	///
	/// # Returns
	/// `true` if the call must be rejected
	pub async fn is_limited_at(&self, now: f64) -> Result<bool, StoreError> {
		let emission = self.emission_interval();

		for _ in 0..MAX_CAS_ATTEMPTS {
			let raw = self.store.get(&self.key).await?;
			let stored = raw.as_deref().and_then(|v| v.parse::<f64>().ok());
			let tat = stored.map_or(now, |tat| tat.max(now));

			if tat - now > self.period - emission {
				return Ok(true);
			}

			let new_tat = tat + emission;
			let ttl = Duration::from_secs_f64((new_tat - now).max(0.001));
			if self
				.store
				.compare_and_set(&self.key, raw.as_deref(), &new_tat.to_string(), Some(ttl))
				.await?
			{
				return Ok(false);
			}
		}

		Err(StoreError::command_error(
			"rate limiter update kept conflicting",
			None,
			Some(HashMap::from([("key".to_string(), self.key.clone())])),
		))
	}

	pub async fn clear(&self) -> Result<(), StoreError> {
		self.store.delete(&self.key).await
	}
}
