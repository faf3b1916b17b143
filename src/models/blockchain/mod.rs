//! Chain data models.
//!
//! - `block`: raw payloads from the chain client, typed fetch errors and decoded blocks
//! - `transaction`: decoded native transactions and their messages
//! - `event`: decoded block and transaction events
//! - `node`: validator node snapshots and churn diffs

mod block;
mod event;
mod node;
mod transaction;

pub use block::{
	parse_last_available_height, BlockPayload, BlockResult, RawAttribute, RawBlock, RawEvent,
	RawTx, ScanErrorCode, ScannerError,
};
pub use event::DecodedEvent;
pub use node::{NodeInfo, NodeSetChanges, NodeStatus};
pub use transaction::{Coin, MsgDeposit, MsgObservedTx, MsgSend, NativeTx, TxMessage};
