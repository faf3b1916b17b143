//! Test helper utilities for raw chain data
//!
//! - `RawBlockBuilder`: Builder for creating test RawBlock instances
//! - `RawTxBuilder`: Builder for creating test RawTx instances

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::models::{RawAttribute, RawBlock, RawEvent, RawTx};

/// Event with plain-text attributes
pub fn plain_event(kind: &str, attributes: &[(&str, &str)]) -> RawEvent {
	RawEvent {
		kind: kind.to_string(),
		attributes: attributes
			.iter()
			.map(|(key, value)| RawAttribute {
				key: key.to_string(),
				value: Some(value.to_string()),
			})
			.collect(),
	}
}

/// Builder for creating test RawTx instances
pub struct RawTxBuilder {
	tx: RawTx,
	messages: Vec<Value>,
	memo: String,
}

impl RawTxBuilder {
	pub fn new(hash: &str) -> Self {
		Self {
			tx: RawTx {
				hash: hash.to_string(),
				..Default::default()
			},
			messages: Vec::new(),
			memo: String::new(),
		}
	}

	pub fn code(mut self, code: u32) -> Self {
		self.tx.code = code;
		self
	}

	pub fn memo(mut self, memo: &str) -> Self {
		self.memo = memo.to_string();
		self
	}

	pub fn message(mut self, message: Value) -> Self {
		self.messages.push(message);
		self
	}

	/// Adds a `MsgSend` of `amount` RUNE.
	pub fn send(self, from: &str, to: &str, amount: u128) -> Self {
		self.message(json!({
			"@type": "/types.MsgSend",
			"from_address": from,
			"to_address": to,
			"amount": [{"denom": "rune", "amount": amount.to_string()}],
		}))
	}

	/// Adds a `MsgDeposit` of `amount` RUNE carrying `memo`.
	pub fn deposit(self, signer: &str, amount: u128, memo: &str) -> Self {
		self.message(json!({
			"@type": "/types.MsgDeposit",
			"coins": [{"asset": "THOR.RUNE", "amount": amount.to_string()}],
			"memo": memo,
			"signer": signer,
		}))
		.memo(memo)
	}

	pub fn event(mut self, event: RawEvent) -> Self {
		self.tx.events.push(event);
		self
	}

	pub fn build(mut self) -> RawTx {
		self.tx.body = json!({
			"body": {
				"messages": self.messages,
				"memo": self.memo,
			}
		});
		self.tx
	}
}

/// Builder for creating test RawBlock instances
pub struct RawBlockBuilder {
	block: RawBlock,
}

impl RawBlockBuilder {
	pub fn new(height: u64) -> Self {
		Self {
			block: RawBlock {
				height,
				..Default::default()
			},
		}
	}

	pub fn time(mut self, time: DateTime<Utc>) -> Self {
		self.block.time = Some(time);
		self
	}

	pub fn tx(mut self, tx: RawTx) -> Self {
		self.block.txs.push(tx);
		self
	}

	pub fn begin_block_event(mut self, event: RawEvent) -> Self {
		self.block.begin_block_events.push(event);
		self
	}

	pub fn end_block_event(mut self, event: RawEvent) -> Self {
		self.block.end_block_events.push(event);
		self
	}

	pub fn build(self) -> RawBlock {
		self.block
	}
}
