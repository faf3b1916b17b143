//! THORChain ingestion service entry point.
//!
//! Loads the JSON configuration, connects to the shared store and the node, then runs the
//! block scanner and the scheduled node list poll until Ctrl+C.
//!
//! # Flow
//! 1. Applies CLI flags and `.env` on top of the environment
//! 2. Loads and validates the configuration file
//! 3. Builds the services and wires the pipelines
//! 4. Starts the scanner task, the churn job and optionally the metrics server
//! 5. On shutdown, lets the scanner finish the block in flight and stops the job

use clap::Parser;
use dotenvy::dotenv_override;
use std::{
	env::{set_var, var},
	path::PathBuf,
	sync::Arc,
};
use tokio::sync::watch;
use tokio_cron_scheduler::JobScheduler;
use tracing::{error, info};

use thorchain_ingest::{
	bootstrap::{create_store, initialize_services, Result},
	models::{ConfigLoader, ServiceConfig, DEFAULT_CONFIG_PATH},
	services::blockchain::{ChainClient, ThornodeClient},
	utils::{
		logging::setup_logging, metrics::server::create_metrics_server,
		parse_string_to_bytes_size, RetryConfig,
	},
};

const DEFAULT_METRICS_ADDRESS: &str = "127.0.0.1:8081";

#[derive(Parser)]
#[command(
	name = "thorchain-ingest",
	about = "Scans THORChain blocks, decodes native transactions and events, and fans them out to subscribers.",
	version
)]
struct Cli {
	/// Path to the JSON configuration file
	#[arg(long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Log destination: stdout or file
	#[arg(long, value_name = "MODE")]
	log_mode: Option<String>,

	/// Set log level (trace, debug, info, warn, error)
	#[arg(long, value_name = "LEVEL")]
	log_level: Option<String>,

	/// Path to store log files (default: logs/)
	#[arg(long, value_name = "PATH")]
	log_path: Option<String>,

	/// Maximum log file size before rolling (e.g., "1GB", "500MB", "1024KB")
	#[arg(long, value_name = "SIZE", value_parser = parse_string_to_bytes_size)]
	log_max_size: Option<u64>,

	/// Address to start the metrics server on (default: 127.0.0.1:8081)
	#[arg(long, value_name = "HOST:PORT")]
	metrics_address: Option<String>,

	/// Enable metrics server
	#[arg(long)]
	metrics: bool,

	/// Validate the configuration file without starting the service
	#[arg(long)]
	check: bool,
}

impl Cli {
	/// Apply CLI options to environment variables, overriding any existing values
	fn apply_to_env(&self) {
		dotenv_override().ok();

		if let Some(mode) = &self.log_mode {
			set_var("LOG_MODE", mode);
		}

		if let Ok(level) = var("RUST_LOG") {
			set_var("LOG_LEVEL", level);
		}
		if let Some(level) = &self.log_level {
			set_var("LOG_LEVEL", level);
			set_var("RUST_LOG", level);
		}

		if let Some(path) = &self.log_path {
			set_var("LOG_DATA_DIR", path);
		}
		if let Some(max_size) = &self.log_max_size {
			set_var("LOG_MAX_SIZE", max_size.to_string());
		}

		if self.metrics {
			set_var("METRICS_ENABLED", "true");
		}
		if let Some(address) = &self.metrics_address {
			if let Some((_, port)) = address.rsplit_once(':') {
				set_var("METRICS_PORT", port);
			}
		}
	}

	fn config_path(&self) -> PathBuf {
		self.config
			.clone()
			.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
	}
}

/// Metrics bind address from the CLI, with `METRICS_PORT` replacing the port.
fn resolve_metrics_address(cli_address: Option<&str>, env_port: Option<&str>) -> String {
	let address = cli_address.unwrap_or(DEFAULT_METRICS_ADDRESS);
	match (env_port, address.rsplit_once(':')) {
		(Some(port), Some((host, _))) => format!("{}:{}", host, port),
		(Some(port), None) => format!("{}:{}", address, port),
		(None, _) => address.to_string(),
	}
}

/// Main entry point for the ingestion service.
///
/// # Errors
/// Returns an error if the configuration is invalid or a service cannot be started.
#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	cli.apply_to_env();

	setup_logging().unwrap_or_else(|e| {
		error!("Failed to setup logging: {}", e);
	});

	let config_path = cli.config_path();
	let config = ServiceConfig::load_from_path(&config_path).map_err(|e| {
		anyhow::anyhow!(
			"Failed to load configuration from {}: {}",
			config_path.display(),
			e
		)
	})?;

	if cli.check {
		info!(network = %config.network.slug, "Configuration is valid");
		return Ok(());
	}

	let store = create_store(&config.store).await?;
	let client: Arc<dyn ChainClient> =
		Arc::new(ThornodeClient::new(&config.network, &RetryConfig::default()).await?);
	let services = initialize_services(config, client, store).await?;

	let metrics_enabled =
		cli.metrics || var("METRICS_ENABLED").map(|v| v == "true").unwrap_or(false);
	let metrics_server = if metrics_enabled {
		let address =
			resolve_metrics_address(cli.metrics_address.as_deref(), var("METRICS_PORT").ok().as_deref());
		match create_metrics_server(address) {
			Ok(server) => Some(server),
			Err(e) => {
				error!("Failed to create metrics server: {}", e);
				None
			}
		}
	} else {
		info!("Metrics server disabled. Use --metrics flag or METRICS_ENABLED=true to enable");
		None
	};

	let (shutdown_tx, shutdown_rx) = watch::channel(false);

	let mut scanner = services.create_scanner();
	let scanner_handle = tokio::spawn(async move {
		scanner.run(shutdown_rx).await;
	});

	let mut node_list_job = services.create_node_list_job::<JobScheduler>().await?;
	if let Some(job) = node_list_job.as_mut() {
		job.start().await?;
	}

	info!("Service started. Press Ctrl+C to shutdown");

	let ctrl_c = tokio::signal::ctrl_c();
	if let Some(metrics_future) = metrics_server {
		tokio::select! {
			result = ctrl_c => {
				if let Err(e) = result {
					error!("Error waiting for Ctrl+C: {}", e);
				}
				info!("Shutdown signal received, stopping services...");
			}
			result = metrics_future => {
				if let Err(e) = result {
					error!("Metrics server error: {}", e);
				}
				info!("Metrics server stopped, shutting down services...");
			}
		}
	} else {
		let _ = ctrl_c.await;
		info!("Shutdown signal received, stopping services...");
	}

	let _ = shutdown_tx.send(true);

	if let Some(job) = node_list_job.as_mut() {
		if let Err(e) = job.stop().await {
			error!("Error stopping node list job: {}", e);
		}
	}
	if let Err(e) = scanner_handle.await {
		error!("Scanner task failed: {}", e);
	}

	info!("Shutdown complete");
	Ok(())
}
