//! Chain client interface.

use async_trait::async_trait;

use crate::{
	models::{BlockPayload, NodeInfo},
	services::blockchain::BlockChainError,
};

/// Read access to the chain needed by the scanner and the cached sources.
///
/// `Err` means the node could not be asked. A node refusing one height is a successful
/// call returning [`BlockPayload::Error`].
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Fetches the block at `height`
	async fn fetch_block(&self, height: u64) -> Result<BlockPayload, BlockChainError>;

	/// Height of the newest block the node has
	async fn get_latest_height(&self) -> Result<u64, BlockChainError>;

	/// Current validator node list
	async fn fetch_nodes(&self) -> Result<Vec<NodeInfo>, BlockChainError>;
}
