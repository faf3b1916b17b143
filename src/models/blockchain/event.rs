use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Block or transaction event with decoded attributes.
///
/// When the event carries an `amount` or `coin` attribute, `amount` and `asset` hold its
/// parsed form; the raw string stays in `attributes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DecodedEvent {
	#[serde(rename = "type")]
	pub kind: String,
	pub attributes: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount: Option<u128>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub asset: Option<String>,
}

impl DecodedEvent {
	pub fn get(&self, key: &str) -> Option<&str> {
		self.attributes.get(key).map(String::as_str)
	}
}
