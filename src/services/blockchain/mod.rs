//! Chain access.
//!
//! - [`ChainClient`]: what the scanner and cached sources need from the chain
//! - [`ThornodeClient`]: implementation over the THORNode REST and Tendermint RPC APIs
//! - transports: HTTP with retries and endpoint failover

mod client;
mod error;
mod thornode;
mod transports;

pub use client::ChainClient;
pub use error::BlockChainError;
pub use thornode::{classify_node_error, parse_block, ThornodeClient};
pub use transports::{
	BlockchainTransport, EndpointManager, HttpTransportClient, RotatingTransport,
	TransientErrorRetryStrategy, TransportError, ROTATE_ON_ERROR_CODES,
};
