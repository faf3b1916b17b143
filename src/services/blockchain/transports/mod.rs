//! HTTP transport to the node endpoints.
//!
//! - [`HttpTransportClient`]: GET requests against weighted endpoints
//! - [`EndpointManager`]: active endpoint selection and failover

mod endpoint_manager;
mod error;
mod http;

pub use endpoint_manager::EndpointManager;
pub use error::TransportError;
pub use http::HttpTransportClient;

use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{
	default_on_request_failure, default_on_request_success, Retryable, RetryableStrategy,
};
use serde_json::Value;

/// HTTP status codes that trigger endpoint rotation
/// - 429: Too Many Requests - the current endpoint is rate limiting us
pub const ROTATE_ON_ERROR_CODES: [u16; 1] = [429];

/// Base trait for node transports
#[async_trait::async_trait]
pub trait BlockchainTransport: Send + Sync {
	/// URL of the endpoint currently in use
	async fn get_current_url(&self) -> String;

	/// Sends `GET {active_url}{path}` and returns the JSON body.
	async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, TransportError>;

	/// Replaces the HTTP client used by the endpoint manager
	fn update_endpoint_manager_client(
		&mut self,
		client: ClientWithMiddleware,
	) -> Result<(), anyhow::Error>;
}

/// Extension trait for transports that can fail over to another endpoint
#[async_trait::async_trait]
pub trait RotatingTransport: BlockchainTransport {
	/// Checks that `url` answers before switching to it
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error>;

	/// Makes `url` the active endpoint
	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error>;
}

/// Retries timeouts, connection failures, 429 and gateway errors.
///
/// A plain 500 is not retried: the node answers queries for missing heights with a 500
/// carrying the reason, which the client classifies instead.
pub struct TransientErrorRetryStrategy;

impl RetryableStrategy for TransientErrorRetryStrategy {
	fn handle(
		&self,
		res: &Result<reqwest::Response, reqwest_middleware::Error>,
	) -> Option<Retryable> {
		match res {
			Ok(response) if response.status() == reqwest::StatusCode::INTERNAL_SERVER_ERROR => None,
			Ok(success) => default_on_request_success(success),
			Err(error) => default_on_request_failure(error),
		}
	}
}
