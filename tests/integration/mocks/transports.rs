use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;

use thorchain_ingest::services::blockchain::{
	BlockchainTransport, RotatingTransport, TransportError,
};

/// Transport whose rotation hooks always succeed; requests go through the endpoint manager.
#[derive(Clone, Default)]
pub struct MockTransport;

impl MockTransport {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl BlockchainTransport for MockTransport {
	async fn get_current_url(&self) -> String {
		String::new()
	}

	async fn get_json(&self, _path: &str, _query: &[(&str, String)]) -> Result<Value, TransportError> {
		Ok(Value::Null)
	}

	fn update_endpoint_manager_client(
		&mut self,
		_: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		Ok(())
	}
}

#[async_trait]
impl RotatingTransport for MockTransport {
	async fn try_connect(&self, _url: &str) -> Result<(), anyhow::Error> {
		Ok(())
	}

	async fn update_client(&self, _url: &str) -> Result<(), anyhow::Error> {
		Ok(())
	}
}

/// Transport that refuses every fallback URL
#[derive(Clone, Default)]
pub struct AlwaysFailsToConnectTransport;

#[async_trait]
impl BlockchainTransport for AlwaysFailsToConnectTransport {
	async fn get_current_url(&self) -> String {
		String::new()
	}

	async fn get_json(&self, _path: &str, _query: &[(&str, String)]) -> Result<Value, TransportError> {
		Ok(Value::Null)
	}

	fn update_endpoint_manager_client(
		&mut self,
		_: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		Ok(())
	}
}

#[async_trait]
impl RotatingTransport for AlwaysFailsToConnectTransport {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		Err(anyhow::anyhow!("cannot connect to {}", url))
	}

	async fn update_client(&self, _url: &str) -> Result<(), anyhow::Error> {
		Ok(())
	}
}
