//! Active endpoint selection with failover.
//!
//! Requests go to the active URL. A network error or a rotation status code moves the
//! manager to the next fallback and the request is repeated there.

use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use crate::services::blockchain::transports::{
	RotatingTransport, TransportError, ROTATE_ON_ERROR_CODES,
};

/// Tracks the active endpoint and the fallbacks it can rotate to.
#[derive(Clone, Debug)]
pub struct EndpointManager {
	pub active_url: Arc<RwLock<String>>,
	pub fallback_urls: Arc<RwLock<Vec<String>>>,
	client: ClientWithMiddleware,
	rotation_lock: Arc<tokio::sync::Mutex<()>>,
}

/// Result of one request against one URL
#[derive(Debug)]
enum SingleRequestAttemptOutcome {
	/// A response arrived; its status may still be an error
	Success(reqwest::Response),
	/// The request never got a response (connection, timeout)
	NetworkError(reqwest_middleware::Error),
}

/// Joins a base URL and an absolute path without doubling the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
	format!(
		"{}/{}",
		base.trim_end_matches('/'),
		path.trim_start_matches('/')
	)
}

impl EndpointManager {
	pub fn new(client: ClientWithMiddleware, active_url: &str, fallback_urls: Vec<String>) -> Self {
		Self {
			active_url: Arc::new(RwLock::new(active_url.to_string())),
			fallback_urls: Arc::new(RwLock::new(fallback_urls)),
			rotation_lock: Arc::new(tokio::sync::Mutex::new(())),
			client,
		}
	}

	/// Replaces the HTTP client, e.g. to change the retry policy
	pub fn update_client(&mut self, client: ClientWithMiddleware) {
		self.client = client;
	}

	/// Switches to the first fallback that differs from the active URL.
	///
	/// The previously active URL becomes the last fallback.
	pub async fn try_rotate_url<T: RotatingTransport>(
		&self,
		transport: &T,
	) -> Result<String, TransportError> {
		let _guard = self.rotation_lock.lock().await;
		let initial_active_url = self.active_url.read().await.clone();
		let fallbacks = self.fallback_urls.read().await.clone();

		let Some(new_url) = fallbacks.iter().find(|url| **url != initial_active_url).cloned() else {
			return Err(TransportError::url_rotation(
				format!("No fallback URLs available for '{}'", initial_active_url),
				None,
				None,
			));
		};

		transport.try_connect(&new_url).await.map_err(|e| {
			TransportError::url_rotation(
				format!("Failed to connect to new URL '{}'", new_url),
				Some(e.into()),
				None,
			)
		})?;
		transport.update_client(&new_url).await.map_err(|e| {
			TransportError::url_rotation(
				format!("Failed to switch transport to '{}'", new_url),
				Some(e.into()),
				None,
			)
		})?;

		{
			let mut active_url = self.active_url.write().await;
			let mut fallback_urls = self.fallback_urls.write().await;
			let mut next: Vec<String> = fallback_urls
				.iter()
				.filter(|url| **url != new_url)
				.cloned()
				.collect();
			next.push(initial_active_url.clone());

			tracing::info!(from = %initial_active_url, to = %new_url, "Rotated node endpoint");
			*fallback_urls = next;
			*active_url = new_url.clone();
		}
		Ok(new_url)
	}

	async fn try_get_on_url(&self, url: &str, query: &[(&str, String)]) -> SingleRequestAttemptOutcome {
		match self.client.get(url).query(query).send().await {
			Ok(response) => SingleRequestAttemptOutcome::Success(response),
			Err(network_error) => SingleRequestAttemptOutcome::NetworkError(network_error),
		}
	}

	/// Sends `GET {active}{path}` and parses the JSON body, failing over as needed.
	///
	/// # Errors
	/// [`TransportError::Http`] for an error status that does not trigger rotation or after
	/// rotation ran out of URLs, [`TransportError::Network`] when no endpoint answered,
	/// [`TransportError::ResponseParse`] for a body that is not JSON.
	pub async fn send_get<T: RotatingTransport>(
		&self,
		transport: &T,
		path: &str,
		query: &[(&str, String)],
	) -> Result<Value, TransportError> {
		loop {
			let base_url = self.active_url.read().await.clone();
			let url = join_url(&base_url, path);
			tracing::debug!(url = %url, "Sending node request");

			match self.try_get_on_url(&url, query).await {
				SingleRequestAttemptOutcome::Success(response) => {
					let status = response.status();
					if status.is_success() {
						return response.json().await.map_err(|e| {
							TransportError::response_parse(
								"Failed to parse JSON response",
								Some(Box::new(e)),
								Some(HashMap::from([("url".to_string(), url.clone())])),
							)
						});
					}

					let body = response.text().await.unwrap_or_default();
					if !ROTATE_ON_ERROR_CODES.contains(&status.as_u16()) {
						return Err(TransportError::http(status, url, body, None, None));
					}

					tracing::warn!(url = %url, status = %status, "Endpoint is rate limiting, rotating");
					if let Err(rotation_error) = self.try_rotate_url(transport).await {
						return Err(TransportError::http(
							status,
							url,
							body,
							Some(Box::new(rotation_error)),
							None,
						));
					}
				}
				SingleRequestAttemptOutcome::NetworkError(network_error) => {
					tracing::warn!(url = %url, "Network error: {}", network_error);
					if let Err(rotation_error) = self.try_rotate_url(transport).await {
						return Err(TransportError::network(
							network_error.to_string(),
							Some(Box::new(rotation_error)),
							Some(HashMap::from([("url".to_string(), url)])),
						));
					}
				}
			}
		}
	}
}
