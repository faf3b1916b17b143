//! Configuration loading and validation.

#![allow(clippy::result_large_err)]

use std::path::Path;

mod error;
mod service_config;

pub use error::ConfigError;
pub use service_config::DEFAULT_CONFIG_PATH;

/// Common interface for configuration files
pub trait ConfigLoader: Sized {
	/// Loads, overrides from the environment and validates the configuration at `path`.
	fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	/// Applies environment variable overrides on top of the file contents.
	fn apply_env_overrides(&mut self);

	/// Returns Ok(()) if the configuration can be used as-is.
	fn validate(&self) -> Result<(), ConfigError>;

	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}
}
