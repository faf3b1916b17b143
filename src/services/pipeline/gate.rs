//! Per-subscriber delivery gates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
	services::store::{load_json, save_json, KeyValueStore, StoreError},
	utils::now_ts,
};

/// Decides whether data from `producer` may reach `consumer`.
#[async_trait]
pub trait PassageGate: Send + Sync {
	async fn can_pass(&self, producer: &str, consumer: &str) -> bool;
}

/// Persisted state of one flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRecord {
	pub value: bool,
	pub last_changed_ts: f64,
	pub last_access_ts: f64,
	#[serde(default)]
	pub full_path: Option<String>,
}

/// Boolean flags kept in the shared store under `Flagship:{name}`.
///
/// Unknown flags read as `true` and are stored on first read so operators can find and
/// flip them.
pub struct Flagship {
	store: Arc<dyn KeyValueStore>,
	default_value: bool,
}

impl Flagship {
	pub const KEY_PREFIX: &'static str = "Flagship:";

	pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
		Self {
			store,
			default_value: true,
		}
	}

	fn key(flag_name: &str) -> String {
		format!("{}{}", Self::KEY_PREFIX, flag_name)
	}

	/// Flag name gating delivery from `producer` to `consumer`
	pub fn passage_flag(producer: &str, consumer: &str) -> String {
		format!("pass:{}:{}", producer, consumer)
	}

	pub async fn get_flag(&self, flag_name: &str) -> Result<Option<FlagRecord>, StoreError> {
		load_json(self.store.as_ref(), &Self::key(flag_name)).await
	}

	/// Reads a flag, recording the access. Missing flags are created with the default value.
	pub async fn is_flag_set(&self, flag_name: &str) -> Result<bool, StoreError> {
		match self.get_flag(flag_name).await? {
			Some(mut flag) => {
				flag.last_access_ts = now_ts();
				save_json(self.store.as_ref(), &Self::key(flag_name), &flag, None).await?;
				Ok(flag.value)
			}
			None => {
				self.set_flag(flag_name, self.default_value).await?;
				Ok(self.default_value)
			}
		}
	}

	/// Sets a flag; `last_changed_ts` moves only when the value changes.
	pub async fn set_flag(&self, flag_name: &str, value: bool) -> Result<(), StoreError> {
		let now = now_ts();
		let flag = match self.get_flag(flag_name).await? {
			Some(mut flag) => {
				if flag.value != value {
					flag.value = value;
					flag.last_changed_ts = now;
				}
				flag
			}
			None => FlagRecord {
				value,
				last_changed_ts: now,
				last_access_ts: now,
				full_path: Some(flag_name.to_string()),
			},
		};
		save_json(self.store.as_ref(), &Self::key(flag_name), &flag, None).await
	}
}

#[async_trait]
impl PassageGate for Flagship {
	async fn can_pass(&self, producer: &str, consumer: &str) -> bool {
		let flag = Self::passage_flag(producer, consumer);
		match self.is_flag_set(&flag).await {
			Ok(value) => value,
			Err(e) => {
				tracing::warn!(flag = %flag, "Flag unreadable, letting data pass: {}", e);
				true
			}
		}
	}
}
