//! Block level data: what the chain client returns and what the scanner dispatches.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::models::blockchain::{DecodedEvent, NativeTx};

lazy_static! {
	static ref INTEGER: Regex = Regex::new(r"\d+").expect("static regex");
}

/// Outcome code of a block fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanErrorCode {
	/// The request succeeded
	Ok,
	/// The block is not produced yet
	Future,
	/// The node pruned the block
	Ancient,
	/// Any other node-side failure
	Other,
}

impl ScanErrorCode {
	/// Maps the numeric protocol code (0, 2, 3) to a variant.
	pub fn from_code(code: i64) -> Self {
		match code {
			0 => Self::Ok,
			2 => Self::Future,
			3 => Self::Ancient,
			_ => Self::Other,
		}
	}

	pub fn as_code(&self) -> i64 {
		match self {
			Self::Ok => 0,
			Self::Future => 2,
			Self::Ancient => 3,
			Self::Other => -1,
		}
	}
}

/// Typed failure returned by the chain client for one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerError {
	pub code: ScanErrorCode,
	pub message: String,
	/// Trailing integer of `message`, if it has one
	pub last_available_height: Option<u64>,
}

impl ScannerError {
	pub fn new(code: ScanErrorCode, message: impl Into<String>) -> Self {
		let message = message.into();
		let last_available_height = parse_last_available_height(&message);
		Self {
			code,
			message,
			last_available_height,
		}
	}

	pub fn future(message: impl Into<String>) -> Self {
		Self::new(ScanErrorCode::Future, message)
	}

	pub fn ancient(message: impl Into<String>) -> Self {
		Self::new(ScanErrorCode::Ancient, message)
	}

	pub fn other(message: impl Into<String>) -> Self {
		Self::new(ScanErrorCode::Other, message)
	}
}

/// Extracts the last run of ASCII digits from a node error message.
///
/// Nodes report pruning as free text such as
/// `"height 11 is not available, lowest height is 12"`; the last integer is the
/// first height the node still serves.
pub fn parse_last_available_height(message: &str) -> Option<u64> {
	INTEGER
		.find_iter(message)
		.last()
		.and_then(|m| m.as_str().parse::<u64>().ok())
}

/// One attribute of an event exactly as the node sent it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawAttribute {
	#[serde(default)]
	pub key: String,
	#[serde(default)]
	pub value: Option<String>,
}

/// Event as the node sent it, attributes still encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawEvent {
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub attributes: Vec<RawAttribute>,
}

/// Transaction as assembled by the chain client.
///
/// `hash` is the node-reported hash; when empty it is derived from `raw`, the base64 wire
/// encoding. `body` is the node's JSON rendering of the transaction and
/// `code`/`log`/`events` come from the execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawTx {
	#[serde(default)]
	pub hash: String,
	#[serde(default)]
	pub raw: String,
	#[serde(default)]
	pub body: Value,
	#[serde(default)]
	pub code: u32,
	#[serde(default)]
	pub log: String,
	#[serde(default)]
	pub events: Vec<RawEvent>,
}

/// Undecoded block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawBlock {
	pub height: u64,
	#[serde(default)]
	pub time: Option<DateTime<Utc>>,
	#[serde(default)]
	pub txs: Vec<RawTx>,
	#[serde(default)]
	pub begin_block_events: Vec<RawEvent>,
	#[serde(default)]
	pub end_block_events: Vec<RawEvent>,
}

/// What the chain client returns for one height
#[derive(Debug, Clone, PartialEq)]
pub enum BlockPayload {
	Block(RawBlock),
	Error(ScannerError),
}

/// A decoded block handed to pipeline subscribers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockResult {
	pub height: u64,
	pub txs: Vec<NativeTx>,
	pub begin_block_events: Vec<DecodedEvent>,
	pub end_block_events: Vec<DecodedEvent>,
	pub error: Option<ScannerError>,
	pub timestamp: Option<DateTime<Utc>>,
}

impl BlockResult {
	/// Result standing for a failed fetch of `height`
	pub fn from_error(height: u64, error: ScannerError) -> Self {
		Self {
			height,
			error: Some(error),
			..Default::default()
		}
	}

	pub fn is_error(&self) -> bool {
		self.error.is_some()
	}

	/// The node already pruned this height and serves later ones.
	pub fn is_behind(&self) -> bool {
		matches!(
			&self.error,
			Some(ScannerError { last_available_height: Some(last), .. }) if self.height < *last
		)
	}

	/// The height is past the node's tip.
	pub fn is_ahead(&self) -> bool {
		matches!(
			&self.error,
			Some(ScannerError { last_available_height: Some(last), .. }) if self.height > *last
		)
	}

	/// Drops transactions whose execution code is not zero.
	pub fn only_successful(mut self) -> Self {
		self.txs.retain(NativeTx::is_success);
		self
	}

	pub fn all_event_types(&self) -> BTreeSet<&str> {
		self.begin_block_events
			.iter()
			.chain(self.end_block_events.iter())
			.map(|event| event.kind.as_str())
			.collect()
	}

	/// Block-level and transaction-level events of `kind`, in block order.
	pub fn find_events_by_type<'a>(
		&'a self,
		kind: &'a str,
	) -> impl Iterator<Item = &'a DecodedEvent> + 'a {
		self.begin_block_events
			.iter()
			.chain(self.txs.iter().flat_map(|tx| tx.events.iter()))
			.chain(self.end_block_events.iter())
			.filter(move |event| event.kind == kind)
	}
}
