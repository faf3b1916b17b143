use serde::{Deserialize, Serialize};

fn default_block_time_ms() -> u64 {
	6_000
}

fn default_address_prefix() -> String {
	"thor".to_string()
}

/// Connection details for the chain being scanned.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Network {
	/// Unique identifier used in logs, metrics and store keys
	pub slug: String,

	/// Human-readable name
	pub name: String,

	/// Node endpoints. `"rpc"` entries serve Tendermint JSON-RPC, `"rest"` entries the
	/// node's REST API.
	pub rpc_urls: Vec<RpcUrl>,

	/// Average block time in milliseconds
	#[serde(default = "default_block_time_ms")]
	pub block_time_ms: u64,

	/// Human-readable prefix for bech32 addresses
	#[serde(default = "default_address_prefix")]
	pub address_prefix: String,

	/// How event attribute keys and values are encoded by the node
	#[serde(default)]
	pub attribute_encoding: AttributeEncoding,
}

/// Encoding of event attributes in block payloads.
///
/// Older Tendermint releases base64-encode attribute keys and values; newer ones send them
/// as plain text. `Auto` decodes base64 when the result is printable UTF-8 and keeps the
/// text otherwise.
///
/// `Auto` cannot tell plain text that happens to be valid base64 from encoded text, so it is
/// meant for mixed or unknown node versions only.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttributeEncoding {
	Base64,
	Plain,
	#[default]
	Auto,
}

/// Endpoint with a load balancing weight
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RpcUrl {
	/// Endpoint kind: "rpc" or "rest"
	pub type_: String,

	pub url: String,

	/// Weight for endpoint ordering (0-100); zero disables the endpoint
	pub weight: u32,
}

impl Network {
	/// Endpoints of `type_` with a non-zero weight, heaviest first.
	pub fn urls_of_type(&self, type_: &str) -> Vec<&RpcUrl> {
		let mut urls: Vec<&RpcUrl> = self
			.rpc_urls
			.iter()
			.filter(|rpc_url| rpc_url.type_ == type_ && rpc_url.weight > 0)
			.collect();
		urls.sort_by(|a, b| b.weight.cmp(&a.weight));
		urls
	}
}
