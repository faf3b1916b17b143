//! Rate limiting and cooldown gates.
//!
//! Every gate keeps its state in the shared [`KeyValueStore`] so separate processes agree:
//!
//! - [`GcraLimiter`]: burst-friendly call rate limit
//! - [`Cooldown`]: minimum spacing between actions
//! - [`CooldownBiTrigger`]: one signal per direction change of a flapping condition
//! - [`RateLimitCooldown`]: rate limit that announces itself once per cooldown

mod cooldown;
mod gcra;

pub use cooldown::{Cooldown, CooldownBiTrigger, CooldownRecord, INFINITE_COOLDOWN};
pub use gcra::GcraLimiter;

use std::sync::Arc;

use crate::{
	services::store::{KeyValueStore, StoreError},
	utils::now_ts,
};

/// Outcome of [`RateLimitCooldown::hit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
	/// Under the limit
	Good,
	/// First call over the limit; the cooldown has just started
	HitLimit,
	/// Over the limit and already announced
	OnCooldown,
}

/// GCRA limiter whose first rejection starts a cooldown.
pub struct RateLimitCooldown {
	limiter: GcraLimiter,
	cooldown: Cooldown,
}

impl RateLimitCooldown {
	pub fn new(
		store: Arc<dyn KeyValueStore>,
		name: &str,
		limit: u32,
		period: f64,
		cooldown: f64,
	) -> Self {
		Self {
			limiter: GcraLimiter::new(store.clone(), name, limit, period),
			cooldown: Cooldown::new(store, &format!("rate_limit_cd:{}", name), cooldown),
		}
	}

	pub async fn hit(&self) -> Result<RateLimitResult, StoreError> {
		self.hit_at(now_ts()).await
	}

	pub async fn hit_at(&self, now: f64) -> Result<RateLimitResult, StoreError> {
		if !self.cooldown.can_do_at(now).await? {
			return Ok(RateLimitResult::OnCooldown);
		}
		if !self.limiter.is_limited_at(now).await? {
			return Ok(RateLimitResult::Good);
		}

		self.cooldown.record_action_at(now).await?;
		tracing::debug!(limiter = %self.limiter.key(), "Rate limit reached");
		Ok(RateLimitResult::HitLimit)
	}

	pub async fn clear(&self) -> Result<(), StoreError> {
		self.limiter.clear().await?;
		self.cooldown.clear().await
	}
}
