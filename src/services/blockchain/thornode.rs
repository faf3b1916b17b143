//! THORNode HTTP client.
//!
//! Blocks and nodes come from the REST API (`/thorchain/block`, `/thorchain/nodes`). The
//! chain height comes from Tendermint RPC `/status` when an RPC endpoint is configured and
//! from `/thorchain/lastblock` otherwise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::{
	models::{
		parse_last_available_height, BlockPayload, Network, NodeInfo, RawAttribute, RawBlock,
		RawEvent, RawTx, ScanErrorCode, ScannerError,
	},
	services::blockchain::{
		BlockChainError, BlockchainTransport, ChainClient, HttpTransportClient, TransportError,
	},
	utils::http::RetryConfig,
};

pub const BLOCK_PATH: &str = "/thorchain/block";
pub const NODES_PATH: &str = "/thorchain/nodes";
pub const LAST_BLOCK_PATH: &str = "/thorchain/lastblock";
pub const STATUS_PATH: &str = "/status";
pub const REST_HEALTH_PATH: &str = "/thorchain/ping";
pub const RPC_HEALTH_PATH: &str = "/health";

/// Client for one THORNode deployment.
pub struct ThornodeClient<T: BlockchainTransport> {
	rest: T,
	rpc: Option<T>,
}

impl<T: BlockchainTransport> ThornodeClient<T> {
	pub fn new_with_transport(rest: T, rpc: Option<T>) -> Self {
		Self { rest, rpc }
	}

	async fn latest_height_from_rpc(rpc: &T) -> Result<u64, BlockChainError> {
		let status = rpc
			.get_json(STATUS_PATH, &[])
			.await
			.map_err(|e| BlockChainError::from_transport(STATUS_PATH, e))?;
		let sync_info = status
			.get("result")
			.unwrap_or(&status)
			.get("sync_info")
			.and_then(|info| info.get("latest_block_height"));
		sync_info.and_then(as_u64).ok_or_else(|| {
			BlockChainError::response_error("status without latest_block_height", None, None)
		})
	}

	async fn latest_height_from_rest(&self) -> Result<u64, BlockChainError> {
		let value = self
			.rest
			.get_json(LAST_BLOCK_PATH, &[])
			.await
			.map_err(|e| BlockChainError::from_transport(LAST_BLOCK_PATH, e))?;
		value
			.as_array()
			.and_then(|chains| chains.iter().filter_map(|c| c.get("thorchain").and_then(as_u64)).max())
			.ok_or_else(|| BlockChainError::response_error("lastblock without thorchain height", None, None))
	}
}

impl ThornodeClient<HttpTransportClient> {
	/// Connects to the heaviest healthy "rest" endpoint and, if any are configured, "rpc" endpoint.
	pub async fn new(network: &Network, retry_config: &RetryConfig) -> Result<Self, anyhow::Error> {
		let rest = HttpTransportClient::new(
			&network.urls_of_type("rest"),
			REST_HEALTH_PATH,
			retry_config,
		)
		.await?;

		let rpc_urls = network.urls_of_type("rpc");
		let rpc = if rpc_urls.is_empty() {
			None
		} else {
			Some(HttpTransportClient::new(&rpc_urls, RPC_HEALTH_PATH, retry_config).await?)
		};

		Ok(Self::new_with_transport(rest, rpc))
	}
}

#[async_trait]
impl<T: BlockchainTransport> ChainClient for ThornodeClient<T> {
	async fn fetch_block(&self, height: u64) -> Result<BlockPayload, BlockChainError> {
		let query = [("height", height.to_string())];
		let value = match self.rest.get_json(BLOCK_PATH, &query).await {
			Ok(value) => value,
			Err(TransportError::Http {
				status_code, body, ..
			}) if status_code.is_client_error() || status_code.is_server_error() => {
				let error = classify_node_error(height, &body);
				tracing::debug!(height, code = ?error.code, "Node refused block: {}", error.message);
				return Ok(BlockPayload::Error(error));
			}
			Err(e) => return Err(BlockChainError::from_transport(BLOCK_PATH, e)),
		};

		if value.get("error").is_some() {
			return Ok(BlockPayload::Error(classify_node_error(height, &value.to_string())));
		}

		parse_block(height, &value).map(BlockPayload::Block)
	}

	async fn get_latest_height(&self) -> Result<u64, BlockChainError> {
		match &self.rpc {
			Some(rpc) => Self::latest_height_from_rpc(rpc).await,
			None => self.latest_height_from_rest().await,
		}
	}

	async fn fetch_nodes(&self) -> Result<Vec<NodeInfo>, BlockChainError> {
		let value = self
			.rest
			.get_json(NODES_PATH, &[])
			.await
			.map_err(|e| BlockChainError::from_transport(NODES_PATH, e))?;
		serde_json::from_value(value).map_err(|e| {
			BlockChainError::response_error("unexpected node list shape", Some(Box::new(e)), None)
		})
	}
}

/// Numbers arrive as JSON numbers or as decimal strings.
fn as_u64(value: &Value) -> Option<u64> {
	match value {
		Value::Number(n) => n.as_u64(),
		Value::String(s) => s.parse().ok(),
		_ => None,
	}
}

fn attribute_text(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(s) => Some(s.clone()),
		other => Some(other.to_string()),
	}
}

/// Reads an event either as `{type, attributes: [{key, value}]}` or as a flat map
/// `{type, key1: value1, ...}`.
fn parse_event(value: &Value) -> Option<RawEvent> {
	let map: &Map<String, Value> = value.as_object()?;
	let kind = map.get("type").and_then(Value::as_str).unwrap_or_default().to_string();

	if let Some(Value::Array(attributes)) = map.get("attributes") {
		let attributes = attributes
			.iter()
			.filter_map(|attr| {
				Some(RawAttribute {
					key: attr.get("key").and_then(attribute_text)?,
					value: attr.get("value").and_then(attribute_text),
				})
			})
			.collect();
		return Some(RawEvent { kind, attributes });
	}

	let attributes = map
		.iter()
		.filter(|(key, _)| key.as_str() != "type")
		.map(|(key, value)| RawAttribute {
			key: key.clone(),
			value: attribute_text(value),
		})
		.collect();
	Some(RawEvent { kind, attributes })
}

fn parse_events(value: Option<&Value>) -> Vec<RawEvent> {
	value
		.and_then(Value::as_array)
		.map(|events| events.iter().filter_map(parse_event).collect())
		.unwrap_or_default()
}

fn parse_tx(value: &Value) -> RawTx {
	let result = value.get("result");
	RawTx {
		hash: value.get("hash").and_then(Value::as_str).unwrap_or_default().to_string(),
		raw: value.get("raw").and_then(Value::as_str).unwrap_or_default().to_string(),
		body: value.get("tx").cloned().unwrap_or(Value::Null),
		code: result
			.and_then(|r| r.get("code"))
			.and_then(as_u64)
			.unwrap_or_default() as u32,
		log: result
			.and_then(|r| r.get("log"))
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string(),
		events: parse_events(result.and_then(|r| r.get("events"))),
	}
}

/// Converts a `/thorchain/block` response into a [`RawBlock`].
pub fn parse_block(requested_height: u64, value: &Value) -> Result<RawBlock, BlockChainError> {
	let header = value.get("header").ok_or_else(|| {
		BlockChainError::response_error(
			"block response without header",
			None,
			Some(HashMap::from([(
				"height".to_string(),
				requested_height.to_string(),
			)])),
		)
	})?;

	let height = header.get("height").and_then(as_u64).unwrap_or(requested_height);
	let time = header
		.get("time")
		.and_then(Value::as_str)
		.and_then(|t| DateTime::parse_from_rfc3339(t).ok())
		.map(|t| t.with_timezone(&Utc));

	let txs = value
		.get("txs")
		.and_then(Value::as_array)
		.map(|txs| txs.iter().map(parse_tx).collect())
		.unwrap_or_default();

	Ok(RawBlock {
		height,
		time,
		txs,
		begin_block_events: parse_events(value.get("begin_block_events")),
		end_block_events: parse_events(value.get("end_block_events")),
	})
}

/// Message of a node error body, in either the JSON-RPC or the REST shape.
fn node_error_message(body: &str) -> String {
	let Ok(value) = serde_json::from_str::<Value>(body) else {
		return body.trim().to_string();
	};
	let error = value.get("error").unwrap_or(&value);
	for field in ["data", "message"] {
		if let Some(text) = error.get(field).and_then(Value::as_str).filter(|t| !t.is_empty()) {
			return text.to_string();
		}
	}
	match error {
		Value::String(text) => text.clone(),
		_ => body.trim().to_string(),
	}
}

/// Classifies a node refusal of `height`.
///
/// The last integer of the message is the height the node is talking about: a value above
/// the request means the block was pruned, a value below means it is not produced yet.
pub fn classify_node_error(height: u64, body: &str) -> ScannerError {
	let message = node_error_message(body);
	let code = match parse_last_available_height(&message) {
		Some(last) if last > height => ScanErrorCode::Ancient,
		Some(last) if last < height => ScanErrorCode::Future,
		_ => ScanErrorCode::Other,
	};
	ScannerError::new(code, message)
}
