//! Service level settings, one struct per configuration section.

use serde::{Deserialize, Serialize};

use crate::models::Network;

fn default_true() -> bool {
	true
}

fn default_max_attempts() -> u32 {
	5
}

fn default_max_blocks_per_tick() -> u32 {
	50
}

fn default_error_sleep_ms() -> u64 {
	3_000
}

fn default_dedup_name() -> String {
	"scanner".to_string()
}

fn default_dedup_capacity() -> u64 {
	1_000_000
}

fn default_dedup_error_rate() -> f64 {
	0.001
}

fn default_churn_schedule() -> String {
	"0 * * * * *".to_string()
}

fn default_node_list_ttl_secs() -> u64 {
	60
}

fn default_last_block_ttl_secs() -> u64 {
	6
}

fn default_retry_times() -> u32 {
	3
}

fn default_retry_delay_ms() -> u64 {
	1_000
}

/// Block scanner behaviour
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
	/// Sleep between ticks; defaults to 99% of the block time
	#[serde(default)]
	pub poll_interval_ms: Option<u64>,
	/// Skip pruned ranges instead of retrying them
	#[serde(default = "default_true")]
	pub jump_ahead: bool,
	/// Attempts on one height before it is skipped
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Catch up back-to-back when lagging behind the tip
	#[serde(default = "default_true")]
	pub aggressive: bool,
	/// Upper bound of blocks dispatched in one aggressive tick
	#[serde(default = "default_max_blocks_per_tick")]
	pub max_blocks_per_tick: u32,
	/// Jump to the tip once at startup, ignoring any backlog
	#[serde(default)]
	pub catch_up_once: bool,
	/// Drop failed transactions before dispatch
	#[serde(default = "default_true")]
	pub only_successful: bool,
	/// Continue from the persisted cursor after a restart
	#[serde(default = "default_true")]
	pub resume: bool,
	/// Explicit starting cursor; the first block fetched is `start_height + 1`
	#[serde(default)]
	pub start_height: Option<u64>,
	/// Sleep after a transport error
	#[serde(default = "default_error_sleep_ms")]
	pub error_sleep_ms: u64,
}

impl Default for ScannerConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: None,
			jump_ahead: true,
			max_attempts: default_max_attempts(),
			aggressive: true,
			max_blocks_per_tick: default_max_blocks_per_tick(),
			catch_up_once: false,
			only_successful: true,
			resume: true,
			start_height: None,
			error_sleep_ms: default_error_sleep_ms(),
		}
	}
}

/// Shared key-value store. Without a Redis URL an in-process store is used.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
	#[serde(default)]
	pub redis_url: Option<String>,
}

/// Transaction deduplication filter sizing
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DedupConfig {
	#[serde(default = "default_dedup_name")]
	pub name: String,
	#[serde(default = "default_dedup_capacity")]
	pub capacity: u64,
	#[serde(default = "default_dedup_error_rate")]
	pub error_rate: f64,
}

impl Default for DedupConfig {
	fn default() -> Self {
		Self {
			name: default_dedup_name(),
			capacity: default_dedup_capacity(),
			error_rate: default_dedup_error_rate(),
		}
	}
}

/// Node churn detection
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChurnConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	/// Six-field cron expression (seconds first)
	#[serde(default = "default_churn_schedule")]
	pub cron_schedule: String,
}

impl Default for ChurnConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			cron_schedule: default_churn_schedule(),
		}
	}
}

/// Cached auxiliary data sources
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
	#[serde(default = "default_node_list_ttl_secs")]
	pub node_list_ttl_secs: u64,
	#[serde(default = "default_last_block_ttl_secs")]
	pub last_block_ttl_secs: u64,
	#[serde(default = "default_retry_times")]
	pub retry_times: u32,
	#[serde(default = "default_retry_delay_ms")]
	pub retry_delay_ms: u64,
	/// Longest time a value may be served after failed refreshes; unset means forever
	#[serde(default)]
	pub max_stale_age_secs: Option<u64>,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			node_list_ttl_secs: default_node_list_ttl_secs(),
			last_block_ttl_secs: default_last_block_ttl_secs(),
			retry_times: default_retry_times(),
			retry_delay_ms: default_retry_delay_ms(),
			max_stale_age_secs: None,
		}
	}
}

/// Root of the JSON configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
	pub network: Network,
	#[serde(default)]
	pub store: StoreConfig,
	#[serde(default)]
	pub scanner: ScannerConfig,
	#[serde(default)]
	pub dedup: DedupConfig,
	#[serde(default)]
	pub churn: ChurnConfig,
	#[serde(default)]
	pub cache: CacheConfig,
}
