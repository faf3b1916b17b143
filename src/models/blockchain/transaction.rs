//! Decoded native transactions and their messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::blockchain::DecodedEvent;

/// Amount of one asset. Amounts are integers in the chain's base units (1e8).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Coin {
	pub asset: String,
	pub amount: u128,
}

/// Bank transfer between two native addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MsgSend {
	pub from_address: String,
	pub to_address: String,
	pub amount: Vec<Coin>,
}

/// Native deposit carrying a memo (swaps, liquidity, bonds, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MsgDeposit {
	pub coins: Vec<Coin>,
	pub memo: String,
	pub signer: String,
}

/// Observation of an external-chain transaction by a validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MsgObservedTx {
	pub txs: Vec<Value>,
	pub signer: String,
}

/// One message inside a transaction body.
///
/// Unregistered type URLs stay available as [`TxMessage::Opaque`] so new message kinds
/// reach subscribers even before a decoder exists for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxMessage {
	Send(MsgSend),
	Deposit(MsgDeposit),
	ObservedTxIn(MsgObservedTx),
	ObservedTxOut(MsgObservedTx),
	Opaque { type_url: String, value: Value },
}

impl TxMessage {
	/// Short name of the message kind, used in logs and metrics labels
	pub fn kind(&self) -> &str {
		match self {
			Self::Send(_) => "send",
			Self::Deposit(_) => "deposit",
			Self::ObservedTxIn(_) => "observed_tx_in",
			Self::ObservedTxOut(_) => "observed_tx_out",
			Self::Opaque { type_url, .. } => type_url.as_str(),
		}
	}

	pub fn is_opaque(&self) -> bool {
		matches!(self, Self::Opaque { .. })
	}
}

/// A decoded transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NativeTx {
	/// Upper-case hex SHA-256 of the wire bytes
	pub hash: String,
	/// Execution code, zero on success
	pub code: u32,
	pub memo: String,
	pub messages: Vec<TxMessage>,
	pub events: Vec<DecodedEvent>,
}

impl NativeTx {
	pub fn is_success(&self) -> bool {
		self.code == 0
	}

	pub fn first_message(&self) -> Option<&TxMessage> {
		self.messages.first()
	}

	/// Signer or sender of the first message, when it has one.
	pub fn sender(&self) -> Option<&str> {
		match self.first_message()? {
			TxMessage::Send(msg) => Some(msg.from_address.as_str()),
			TxMessage::Deposit(msg) => Some(msg.signer.as_str()),
			TxMessage::ObservedTxIn(msg) | TxMessage::ObservedTxOut(msg) => {
				Some(msg.signer.as_str())
			}
			TxMessage::Opaque { .. } => None,
		}
	}

	/// Memo of the transaction, falling back to memos carried inside its messages
	/// (deposits, or the observed external transactions of an observation).
	pub fn deep_memo(&self) -> Option<&str> {
		if !self.memo.is_empty() {
			return Some(&self.memo);
		}
		self.messages.iter().find_map(|message| match message {
			TxMessage::Deposit(msg) if !msg.memo.is_empty() => Some(msg.memo.as_str()),
			TxMessage::ObservedTxIn(msg) | TxMessage::ObservedTxOut(msg) => {
				msg.txs.iter().find_map(|tx| {
					tx.pointer("/tx/memo")
						.and_then(Value::as_str)
						.filter(|memo| !memo.is_empty())
				})
			}
			_ => None,
		})
	}
}
