//! Transaction and event decoding.
//!
//! [`BlockDecoder`] turns a [`RawBlock`] from the chain client into a [`BlockResult`].
//! Malformed items are isolated: a transaction or event that fails to decode is logged and
//! skipped, and the rest of the block is kept.
//!
//! - `amount`: amount fields such as `"114731984rune"`
//! - `address`: bech32 rendering of address bytes
//! - `event`: base64/plain attribute decoding
//! - `registry`: message type URL to decoder mapping

mod address;
mod amount;
mod error;
mod event;
mod registry;

pub use address::{is_valid_address, normalize_address, parse_thor_address};
pub use amount::{parse_amount, parse_coin, parse_coins};
pub use error::DecodeError;
pub use event::{decode_attribute_text, decode_event};
pub use registry::{
	DecodeContext, MessageDecoder, MessageRegistry, MSG_DEPOSIT, MSG_OBSERVED_TX_IN,
	MSG_OBSERVED_TX_OUT, MSG_SEND, MSG_SEND_COSMOS,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::models::{
	AttributeEncoding, BlockResult, DecodedEvent, NativeTx, RawBlock, RawEvent, RawTx, TxMessage,
};

/// Decodes raw blocks into typed transactions and events
#[derive(Clone)]
pub struct BlockDecoder {
	registry: MessageRegistry,
	address_prefix: String,
	attribute_encoding: AttributeEncoding,
}

impl BlockDecoder {
	pub fn new(address_prefix: impl Into<String>, attribute_encoding: AttributeEncoding) -> Self {
		Self {
			registry: MessageRegistry::default(),
			address_prefix: address_prefix.into(),
			attribute_encoding,
		}
	}

	/// Replaces the message registry.
	pub fn with_registry(mut self, registry: MessageRegistry) -> Self {
		self.registry = registry;
		self
	}

	/// Decodes every transaction and block event of `raw`.
	pub fn decode(&self, raw: &RawBlock) -> BlockResult {
		let txs = raw
			.txs
			.iter()
			.enumerate()
			.filter_map(|(index, tx)| match self.decode_tx(tx) {
				Ok(tx) => Some(tx),
				Err(e) => {
					tracing::warn!(height = raw.height, index, "Skipping undecodable transaction: {}", e);
					None
				}
			})
			.collect();

		BlockResult {
			height: raw.height,
			txs,
			begin_block_events: self.decode_events(&raw.begin_block_events, raw.height),
			end_block_events: self.decode_events(&raw.end_block_events, raw.height),
			error: None,
			timestamp: raw.time,
		}
	}

	/// Decodes one transaction.
	///
	/// A message that fails its registered decoder is kept as [`TxMessage::Opaque`]; only
	/// envelope problems (no hash, unreadable body) fail the transaction.
	pub fn decode_tx(&self, raw: &RawTx) -> Result<NativeTx, DecodeError> {
		let hash = tx_hash(raw)?;
		let body = raw.body.get("body").unwrap_or(&raw.body);
		if !(body.is_object() || body.is_null()) {
			return Err(DecodeError::invalid_transaction(
				"transaction body is not an object",
				None,
				Some(HashMap::from([("hash".to_string(), hash)])),
			));
		}

		let ctx = DecodeContext {
			address_prefix: &self.address_prefix,
		};
		let messages = body
			.get("messages")
			.and_then(Value::as_array)
			.map(|messages| {
				messages
					.iter()
					.map(|message| {
						self.registry.decode(message, &ctx).unwrap_or_else(|e| {
							tracing::warn!(tx = %hash, "Keeping malformed message as opaque: {}", e);
							TxMessage::Opaque {
								type_url: message
									.get("@type")
									.and_then(Value::as_str)
									.unwrap_or_default()
									.to_string(),
								value: message.clone(),
							}
						})
					})
					.collect()
			})
			.unwrap_or_default();

		let memo = body
			.get("memo")
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string();

		Ok(NativeTx {
			events: self.decode_events(&raw.events, 0),
			hash,
			code: raw.code,
			memo,
			messages,
		})
	}

	fn decode_events(&self, raw: &[RawEvent], height: u64) -> Vec<DecodedEvent> {
		raw.iter()
			.filter_map(|event| match decode_event(event, self.attribute_encoding) {
				Ok(event) => Some(event),
				Err(e) => {
					tracing::warn!(height, "Skipping undecodable event: {}", e);
					None
				}
			})
			.collect()
	}
}

/// Hash reported by the node, or the upper-case hex SHA-256 of the wire bytes.
fn tx_hash(raw: &RawTx) -> Result<String, DecodeError> {
	if !raw.hash.is_empty() {
		return Ok(raw.hash.to_uppercase());
	}
	if raw.raw.is_empty() {
		return Err(DecodeError::invalid_transaction(
			"transaction has neither hash nor wire bytes",
			None,
			None,
		));
	}
	let bytes = STANDARD.decode(raw.raw.trim()).map_err(|e| {
		DecodeError::invalid_transaction("wire bytes are not base64", Some(Box::new(e)), None)
	})?;
	Ok(hex::encode_upper(Sha256::digest(&bytes)))
}
