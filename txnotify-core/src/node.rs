//! Queries the engine makes against the blockchain node.

use async_trait::async_trait;
use bitcoin::BlockHash;
use thiserror::Error;

/// Errors returned by a node query.
#[derive(Debug, Error)]
pub enum NodeError {
    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The node rejected the RPC credentials
    #[error("node rejected the RPC credentials")]
    Unauthorized,

    /// The node answered with an RPC error
    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node does not know the block
    #[error("block not found: {0}")]
    BlockNotFound(BlockHash),

    /// The response could not be understood
    #[error("malformed node response: {0}")]
    Malformed(String),
}

/// Resolves the height of a block on the node's active chain.
#[async_trait]
pub trait BlockHeightSource: Send + Sync {
    async fn block_height(&self, hash: &BlockHash) -> Result<u64, NodeError>;
}
