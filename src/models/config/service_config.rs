//! Loading and validation of the JSON service configuration.

use std::{collections::HashMap, env, path::Path};

use crate::{
	models::{config::error::ConfigError, ConfigLoader, ServiceConfig},
	utils::get_cron_interval_ms,
};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";

fn path_metadata(path: &Path) -> Option<HashMap<String, String>> {
	Some(HashMap::from([(
		"path".to_string(),
		path.display().to_string(),
	)]))
}

fn section(name: &str) -> Option<HashMap<String, String>> {
	Some(HashMap::from([("section".to_string(), name.to_string())]))
}

impl ServiceConfig {
	fn validate_network(&self) -> Result<(), ConfigError> {
		let network = &self.network;
		if network.slug.trim().is_empty() {
			return Err(ConfigError::validation_error(
				"network slug is required",
				None,
				section("network"),
			));
		}
		if network.block_time_ms == 0 {
			return Err(ConfigError::validation_error(
				"block_time_ms must be greater than 0",
				None,
				section("network"),
			));
		}
		if network.address_prefix.is_empty()
			|| network.address_prefix.to_lowercase() != network.address_prefix
		{
			return Err(ConfigError::validation_error(
				"address_prefix must be a non-empty lowercase string",
				None,
				section("network"),
			));
		}

		for type_ in ["rpc", "rest"] {
			if network.urls_of_type(type_).is_empty() {
				return Err(ConfigError::validation_error(
					format!("at least one enabled '{}' url is required", type_),
					None,
					section("network"),
				));
			}
		}

		for rpc_url in &network.rpc_urls {
			let parsed = url::Url::parse(&rpc_url.url).map_err(|e| {
				ConfigError::validation_error(
					format!("invalid url '{}'", rpc_url.url),
					Some(Box::new(e)),
					section("network"),
				)
			})?;
			match parsed.scheme() {
				"https" => {}
				"http" => tracing::warn!(
					url = %rpc_url.url,
					"Endpoint uses plain HTTP, consider HTTPS outside private networks"
				),
				other => {
					return Err(ConfigError::validation_error(
						format!("unsupported url scheme '{}'", other),
						None,
						section("network"),
					))
				}
			}
			if rpc_url.weight > 100 {
				return Err(ConfigError::validation_error(
					format!("weight of '{}' must be between 0 and 100", rpc_url.url),
					None,
					section("network"),
				));
			}
		}
		Ok(())
	}

	fn validate_sections(&self) -> Result<(), ConfigError> {
		if self.scanner.max_attempts == 0 {
			return Err(ConfigError::validation_error(
				"max_attempts must be at least 1",
				None,
				section("scanner"),
			));
		}
		if self.scanner.max_blocks_per_tick == 0 {
			return Err(ConfigError::validation_error(
				"max_blocks_per_tick must be at least 1",
				None,
				section("scanner"),
			));
		}
		if self.dedup.capacity == 0 {
			return Err(ConfigError::validation_error(
				"capacity must be greater than 0",
				None,
				section("dedup"),
			));
		}
		if !(self.dedup.error_rate > 0.0 && self.dedup.error_rate < 1.0) {
			return Err(ConfigError::validation_error(
				"error_rate must be within (0, 1)",
				None,
				section("dedup"),
			));
		}
		if self.cache.retry_times == 0 {
			return Err(ConfigError::validation_error(
				"retry_times must be at least 1",
				None,
				section("cache"),
			));
		}

		if self.churn.enabled {
			let interval_ms = get_cron_interval_ms(&self.churn.cron_schedule).ok_or_else(|| {
				ConfigError::validation_error(
					format!("invalid cron schedule '{}'", self.churn.cron_schedule),
					None,
					section("churn"),
				)
			})?;
			let ttl_ms = (self.cache.node_list_ttl_secs * 1000) as i64;
			if interval_ms < ttl_ms {
				tracing::warn!(
					interval_ms,
					ttl_ms,
					"Churn checks run more often than the node list cache refreshes"
				);
			}
		}
		Ok(())
	}
}

impl ConfigLoader for ServiceConfig {
	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		if !Self::is_json_file(path) {
			return Err(ConfigError::file_error(
				"configuration file must have a .json extension",
				None,
				path_metadata(path),
			));
		}

		let file = std::fs::File::open(path).map_err(|e| {
			ConfigError::file_error(
				format!("failed to open config file: {}", e),
				Some(Box::new(e)),
				path_metadata(path),
			)
		})?;
		let mut config: ServiceConfig = serde_json::from_reader(file).map_err(|e| {
			ConfigError::parse_error(
				format!("failed to parse config: {}", e),
				Some(Box::new(e)),
				path_metadata(path),
			)
		})?;

		config.apply_env_overrides();
		config.validate()?;
		Ok(config)
	}

	fn apply_env_overrides(&mut self) {
		if let Ok(url) = env::var("REDIS_URL") {
			if !url.trim().is_empty() {
				self.store.redis_url = Some(url);
			}
		}
		if let Some(height) = env::var("SCANNER_START_HEIGHT")
			.ok()
			.and_then(|raw| raw.parse::<u64>().ok())
		{
			self.scanner.start_height = Some(height);
		}
	}

	fn validate(&self) -> Result<(), ConfigError> {
		self.validate_network()?;
		self.validate_sections()
	}
}
