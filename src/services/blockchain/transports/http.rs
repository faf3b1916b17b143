//! HTTP transport over a set of weighted node endpoints.

use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::{
	models::RpcUrl,
	services::blockchain::transports::{
		endpoint_manager::join_url, BlockchainTransport, EndpointManager, RotatingTransport,
		TransientErrorRetryStrategy, TransportError,
	},
	utils::http::{create_retryable_http_client, RetryConfig},
};

/// GET transport for one endpoint kind ("rpc" or "rest").
///
/// Connects to the heaviest endpoint that passes the health check and keeps the others as
/// fallbacks.
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	pub client: ClientWithMiddleware,
	endpoint_manager: EndpointManager,
	/// Path requested to check that an endpoint is alive
	health_path: String,
}

impl HttpTransportClient {
	/// # Arguments
	/// * `urls` - Candidate endpoints, heaviest first
	/// * `health_path` - Path that must answer 2xx for an endpoint to be used
	/// * `retry_config` - Retry policy for transient failures
	pub async fn new(
		urls: &[&RpcUrl],
		health_path: &str,
		retry_config: &RetryConfig,
	) -> Result<Self, anyhow::Error> {
		let base_http_client = reqwest::ClientBuilder::new()
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(32)
			.timeout(Duration::from_secs(30))
			.connect_timeout(Duration::from_secs(20))
			.build()
			.context("Failed to create base HTTP client")?;

		let retryable_client = create_retryable_http_client(
			retry_config,
			base_http_client,
			Some(TransientErrorRetryStrategy),
		);

		for candidate in urls {
			if Url::parse(&candidate.url).is_err() {
				tracing::warn!(url = %candidate.url, "Skipping invalid endpoint URL");
				continue;
			}

			match retryable_client.get(join_url(&candidate.url, health_path)).send().await {
				Ok(response) if response.status().is_success() => {
					let fallback_urls = urls
						.iter()
						.filter(|url| url.url != candidate.url)
						.map(|url| url.url.clone())
						.collect();
					tracing::info!(url = %candidate.url, "Connected to node endpoint");
					return Ok(Self {
						client: retryable_client.clone(),
						endpoint_manager: EndpointManager::new(
							retryable_client,
							&candidate.url,
							fallback_urls,
						),
						health_path: health_path.to_string(),
					});
				}
				Ok(response) => {
					tracing::warn!(url = %candidate.url, status = %response.status(), "Endpoint unhealthy");
				}
				Err(e) => {
					tracing::warn!(url = %candidate.url, "Endpoint unreachable: {}", e);
				}
			}
		}

		Err(anyhow::anyhow!("All node URLs failed to connect"))
	}
}

#[async_trait]
impl BlockchainTransport for HttpTransportClient {
	async fn get_current_url(&self) -> String {
		self.endpoint_manager.active_url.read().await.clone()
	}

	async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, TransportError> {
		self.endpoint_manager.send_get(self, path, query).await
	}

	fn update_endpoint_manager_client(
		&mut self,
		client: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		self.endpoint_manager.update_client(client);
		Ok(())
	}
}

#[async_trait]
impl RotatingTransport for HttpTransportClient {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;
		let response = self
			.client
			.get(join_url(url, &self.health_path))
			.send()
			.await
			.map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", url, e))?;

		if response.status().is_success() {
			Ok(())
		} else {
			Err(anyhow::anyhow!(
				"Failed to connect to {}: {}",
				url,
				response.status().as_u16()
			))
		}
	}

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		let parsed_url = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;
		let mut active_url = self.endpoint_manager.active_url.write().await;
		*active_url = parsed_url.as_str().trim_end_matches('/').to_string();
		Ok(())
	}
}
