//! Message type registry.
//!
//! Maps the `@type` URL of a transaction message to the function that decodes it.
//! Unregistered types pass through as [`TxMessage::Opaque`].

use serde_json::Value;
use std::collections::HashMap;

use crate::{
	models::{Coin, MsgDeposit, MsgObservedTx, MsgSend, TxMessage},
	services::decoder::{address::normalize_address, DecodeError},
};

pub const MSG_SEND: &str = "/types.MsgSend";
pub const MSG_SEND_COSMOS: &str = "/cosmos.bank.v1beta1.MsgSend";
pub const MSG_DEPOSIT: &str = "/types.MsgDeposit";
pub const MSG_OBSERVED_TX_IN: &str = "/types.MsgObservedTxIn";
pub const MSG_OBSERVED_TX_OUT: &str = "/types.MsgObservedTxOut";

/// Settings shared by every message decoder
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
	pub address_prefix: &'a str,
}

/// Turns the JSON form of one message into a [`TxMessage`]
pub type MessageDecoder = fn(&Value, &DecodeContext<'_>) -> Result<TxMessage, DecodeError>;

/// Registry of message decoders keyed by type URL
#[derive(Clone)]
pub struct MessageRegistry {
	decoders: HashMap<String, MessageDecoder>,
}

impl Default for MessageRegistry {
	fn default() -> Self {
		let mut registry = Self::empty();
		registry.register(MSG_SEND, decode_send);
		registry.register(MSG_SEND_COSMOS, decode_send);
		registry.register(MSG_DEPOSIT, decode_deposit);
		registry.register(MSG_OBSERVED_TX_IN, decode_observed_in);
		registry.register(MSG_OBSERVED_TX_OUT, decode_observed_out);
		registry
	}
}

impl MessageRegistry {
	/// Registry with no decoders; every message stays opaque.
	pub fn empty() -> Self {
		Self {
			decoders: HashMap::new(),
		}
	}

	/// Registers `decoder` for `type_url`, replacing any previous one.
	pub fn register(&mut self, type_url: impl Into<String>, decoder: MessageDecoder) {
		self.decoders.insert(type_url.into(), decoder);
	}

	pub fn is_registered(&self, type_url: &str) -> bool {
		self.decoders.contains_key(type_url)
	}

	/// Decodes one message object.
	///
	/// # Errors
	/// Returns [`DecodeError::InvalidMessage`] when the message has no `@type` or a registered
	/// decoder rejects it.
	pub fn decode(&self, message: &Value, ctx: &DecodeContext<'_>) -> Result<TxMessage, DecodeError> {
		let type_url = message
			.get("@type")
			.or_else(|| message.get("type_url"))
			.and_then(Value::as_str)
			.ok_or_else(|| DecodeError::invalid_message("message without @type", None, None))?;

		match self.decoders.get(type_url) {
			Some(decoder) => decoder(message, ctx).map_err(|e| match e {
				DecodeError::InvalidMessage(context) => {
					DecodeError::InvalidMessage(context.with_metadata("type_url", type_url))
				}
				other => other,
			}),
			None => Ok(TxMessage::Opaque {
				type_url: type_url.to_string(),
				value: message.clone(),
			}),
		}
	}
}

fn str_field<'a>(message: &'a Value, field: &str) -> Result<&'a str, DecodeError> {
	message.get(field).and_then(Value::as_str).ok_or_else(|| {
		DecodeError::invalid_message(format!("missing string field '{}'", field), None, None)
	})
}

fn address_field(message: &Value, field: &str, ctx: &DecodeContext<'_>) -> Result<String, DecodeError> {
	normalize_address(str_field(message, field)?, ctx.address_prefix)
}

fn amount_value(value: &Value) -> Result<u128, DecodeError> {
	let parsed = match value {
		Value::String(s) => s.parse::<u128>().ok(),
		Value::Number(n) => n.as_u64().map(u128::from),
		_ => None,
	};
	parsed.ok_or_else(|| {
		DecodeError::invalid_message(format!("invalid coin amount {}", value), None, None)
	})
}

/// Asset of a coin object: `asset` as `"CHAIN.SYMBOL"` or an object, else `denom`.
fn asset_value(coin: &Value) -> Result<String, DecodeError> {
	match (coin.get("asset"), coin.get("denom")) {
		(Some(Value::String(asset)), _) => Ok(asset.to_uppercase()),
		(Some(asset @ Value::Object(_)), _) => {
			let chain = asset.get("chain").and_then(Value::as_str).unwrap_or_default();
			let symbol = asset.get("symbol").and_then(Value::as_str).unwrap_or_default();
			Ok(format!("{}.{}", chain, symbol).to_uppercase())
		}
		(_, Some(Value::String(denom))) => Ok(denom.to_uppercase()),
		_ => Err(DecodeError::invalid_message("coin without asset", None, None)),
	}
}

fn coins_field(message: &Value, field: &str) -> Result<Vec<Coin>, DecodeError> {
	let Some(items) = message.get(field) else {
		return Ok(Vec::new());
	};
	let items = items.as_array().ok_or_else(|| {
		DecodeError::invalid_message(format!("field '{}' is not a list", field), None, None)
	})?;
	items
		.iter()
		.map(|coin| {
			Ok(Coin {
				asset: asset_value(coin)?,
				amount: amount_value(coin.get("amount").unwrap_or(&Value::Null))?,
			})
		})
		.collect()
}

fn decode_send(message: &Value, ctx: &DecodeContext<'_>) -> Result<TxMessage, DecodeError> {
	Ok(TxMessage::Send(MsgSend {
		from_address: address_field(message, "from_address", ctx)?,
		to_address: address_field(message, "to_address", ctx)?,
		amount: coins_field(message, "amount")?,
	}))
}

fn decode_deposit(message: &Value, ctx: &DecodeContext<'_>) -> Result<TxMessage, DecodeError> {
	Ok(TxMessage::Deposit(MsgDeposit {
		coins: coins_field(message, "coins")?,
		memo: message
			.get("memo")
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string(),
		signer: address_field(message, "signer", ctx)?,
	}))
}

fn observed(message: &Value, ctx: &DecodeContext<'_>) -> Result<MsgObservedTx, DecodeError> {
	let txs = match message.get("txs") {
		Some(Value::Array(txs)) => txs.clone(),
		None | Some(Value::Null) => Vec::new(),
		Some(_) => {
			return Err(DecodeError::invalid_message("field 'txs' is not a list", None, None))
		}
	};
	Ok(MsgObservedTx {
		txs,
		signer: address_field(message, "signer", ctx)?,
	})
}

fn decode_observed_in(message: &Value, ctx: &DecodeContext<'_>) -> Result<TxMessage, DecodeError> {
	observed(message, ctx).map(TxMessage::ObservedTxIn)
}

fn decode_observed_out(message: &Value, ctx: &DecodeContext<'_>) -> Result<TxMessage, DecodeError> {
	observed(message, ctx).map(TxMessage::ObservedTxOut)
}
