//! Event type definitions.
//!
//! Events carry fully decoded chain data; listeners never go back to the
//! node for transaction contents.

use bitcoin::{Block, BlockHash, Transaction, Txid};

/// A transaction observed by the node, usually on mempool acceptance.
#[derive(Debug, Clone)]
pub struct TransactionEvent {
    pub tx: Transaction,
}

impl TransactionEvent {
    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }
}

impl From<Transaction> for TransactionEvent {
    fn from(tx: Transaction) -> Self {
        Self { tx }
    }
}

/// A block connected to the node's active chain.
#[derive(Debug, Clone)]
pub struct BlockEvent {
    pub block: Block,
}

impl BlockEvent {
    pub fn block_hash(&self) -> BlockHash {
        self.block.block_hash()
    }

    /// Txids of every transaction in the block, coinbase included.
    pub fn txids(&self) -> impl Iterator<Item = Txid> + '_ {
        self.block.txdata.iter().map(Transaction::compute_txid)
    }
}

impl From<Block> for BlockEvent {
    fn from(block: Block) -> Self {
        Self { block }
    }
}
