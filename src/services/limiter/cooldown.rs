//! Cooldown gates kept in the shared store.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

use crate::{
	services::{
		limiter::gcra::MAX_CAS_ATTEMPTS,
		store::{load_json, save_json, KeyValueStore, StoreError},
	},
	utils::now_ts,
};

/// Cooldown used when none is given: 10000 days
pub const INFINITE_COOLDOWN: f64 = 10_000.0 * 86_400.0;

/// Stored state of a [`Cooldown`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownRecord {
	/// When the gate last closed, UNIX seconds; `None` if it never did
	#[serde(default)]
	pub time: Option<f64>,
	/// Actions taken since the gate last closed
	pub count: u32,
}

impl CooldownRecord {
	pub fn can_do(&self, period: f64, now: f64) -> bool {
		self.time.map_or(true, |time| now - time >= period)
	}

	fn counted(mut self, max_times: u32, now: f64) -> Self {
		self.count += 1;
		if self.count >= max_times {
			self.time = Some(now);
			self.count = 0;
		}
		self
	}
}

/// Allows an action at most `max_times` times, then closes for `period` seconds.
#[derive(Clone)]
pub struct Cooldown {
	store: Arc<dyn KeyValueStore>,
	key: String,
	period: f64,
	max_times: u32,
}

impl Cooldown {
	pub const KEY_PREFIX: &'static str = "cooldown:";

	pub fn new(store: Arc<dyn KeyValueStore>, name: &str, period: f64) -> Self {
		Self::with_max_times(store, name, period, 1)
	}

	pub fn with_max_times(
		store: Arc<dyn KeyValueStore>,
		name: &str,
		period: f64,
		max_times: u32,
	) -> Self {
		Self {
			store,
			key: format!("{}{}", Self::KEY_PREFIX, name),
			period,
			max_times: max_times.max(1),
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn period(&self) -> f64 {
		self.period
	}

	/// Current record; unreadable values count as a cleared gate.
	pub async fn read(&self) -> Result<CooldownRecord, StoreError> {
		match load_json::<CooldownRecord>(self.store.as_ref(), &self.key).await {
			Ok(record) => Ok(record.unwrap_or_default()),
			Err(StoreError::SerializationError(_)) => Ok(CooldownRecord::default()),
			Err(e) => Err(e),
		}
	}

	pub async fn can_do(&self) -> Result<bool, StoreError> {
		self.can_do_at(now_ts()).await
	}

	pub async fn can_do_at(&self, now: f64) -> Result<bool, StoreError> {
		Ok(self.read().await?.can_do(self.period, now))
	}

	/// Counts one action. Does nothing while the gate is closed.
	pub async fn record_action(&self) -> Result<(), StoreError> {
		self.record_action_at(now_ts()).await
	}

	pub async fn record_action_at(&self, now: f64) -> Result<(), StoreError> {
		for _ in 0..MAX_CAS_ATTEMPTS {
			let raw = self.store.get(&self.key).await?;
			let record = raw
				.as_deref()
				.and_then(|v| serde_json::from_str::<CooldownRecord>(v).ok())
				.unwrap_or_default();
			if !record.can_do(self.period, now) {
				return Ok(());
			}

			let updated = serde_json::to_string(&record.counted(self.max_times, now)).map_err(|e| {
				StoreError::serialization_error(
					format!("failed to encode value of '{}'", self.key),
					Some(Box::new(e)),
					None,
				)
			})?;
			if self
				.store
				.compare_and_set(&self.key, raw.as_deref(), &updated, None)
				.await?
			{
				return Ok(());
			}
		}

		Err(StoreError::command_error(
			"cooldown update kept conflicting",
			None,
			Some(HashMap::from([("key".to_string(), self.key.clone())])),
		))
	}

	/// Opens the gate and resets the counter.
	pub async fn clear(&self) -> Result<(), StoreError> {
		save_json(self.store.as_ref(), &self.key, &CooldownRecord::default(), None).await
	}
}

/// Fires once per transition of a flapping boolean condition.
///
/// Repeating the current direction fires again only after `cooldown` seconds.
/// With a switch cooldown, a transition within that time of the previous one is suppressed.
#[derive(Clone)]
pub struct CooldownBiTrigger {
	on: Cooldown,
	off: Cooldown,
	switch: Option<Cooldown>,
	default: bool,
}

impl CooldownBiTrigger {
	pub fn new(store: Arc<dyn KeyValueStore>, name: &str, cooldown: f64) -> Self {
		Self::with_switch_cooldown(store, name, cooldown, 0.0)
	}

	pub fn with_switch_cooldown(
		store: Arc<dyn KeyValueStore>,
		name: &str,
		cooldown: f64,
		switch_cooldown: f64,
	) -> Self {
		let switch = (switch_cooldown > 0.0).then(|| {
			Cooldown::new(store.clone(), &format!("trigger.{}.switch", name), switch_cooldown)
		});
		Self {
			on: Cooldown::new(store.clone(), &format!("trigger.{}.on", name), cooldown),
			off: Cooldown::new(store, &format!("trigger.{}.off", name), cooldown),
			switch,
			default: false,
		}
	}

	/// State reported before any transition was recorded
	pub fn with_default(mut self, default: bool) -> Self {
		self.default = default;
		self
	}

	/// Same-direction repeat cooldown that never expires
	pub fn without_repeats(store: Arc<dyn KeyValueStore>, name: &str) -> Self {
		Self::new(store, name, INFINITE_COOLDOWN)
	}

	pub async fn turn_on(&self) -> Result<bool, StoreError> {
		self.turn(true).await
	}

	pub async fn turn_off(&self) -> Result<bool, StoreError> {
		self.turn(false).await
	}

	pub async fn turn(&self, on: bool) -> Result<bool, StoreError> {
		self.turn_at(on, now_ts()).await
	}

	/// Moves the trigger towards `on` at time `now`.
	///
	/// # Returns
	/// `true` if the caller should act on this transition
	pub async fn turn_at(&self, on: bool, now: f64) -> Result<bool, StoreError> {
		if let Some(switch) = &self.switch {
			if !switch.can_do_at(now).await? {
				return Ok(false);
			}
		}

		let (this, other) = if on {
			(&self.on, &self.off)
		} else {
			(&self.off, &self.on)
		};
		if !this.can_do_at(now).await? {
			return Ok(false);
		}

		this.record_action_at(now).await?;
		other.clear().await?;
		if let Some(switch) = &self.switch {
			switch.record_action_at(now).await?;
		}
		Ok(true)
	}

	/// Direction of the last recorded transition
	pub async fn get_state(&self) -> Result<bool, StoreError> {
		let (on, off) = (self.on.read().await?, self.off.read().await?);
		Ok(if on.time.is_some() {
			true
		} else if off.time.is_some() {
			false
		} else {
			self.default
		})
	}
}
