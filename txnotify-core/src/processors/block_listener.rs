//! BlockListener processor.
//!
//! The BlockListener is responsible for:
//! - Receiving `BlockEvent` from the node transport
//! - Resolving the block height through a `BlockHeightSource`
//! - Recording the height on watched transactions the block contains
//! - Retiring every watch whose confirmation target is reached as `Confirmed`
//!
//! Confirmation runs before the sweep so that a transaction wanting a single
//! confirmation fires in the block that contains it.

use crate::events::{BlockEvent, BlockEventReceiver, NotificationSender};
use crate::models::Notification;
use crate::node::{BlockHeightSource, NodeError};
use crate::registry::WatchRegistry;
use bitcoin::BlockHash;
use kanau::processor::Processor;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that can occur while processing a block.
#[derive(Debug, Error)]
pub enum BlockListenerError {
    /// The node could not tell the block's height
    #[error("could not query node for block {hash}: {source}")]
    NodeQueryFailed {
        hash: BlockHash,
        #[source]
        source: NodeError,
    },
}

/// BlockListener confirms watched transactions and fires due notifications.
pub struct BlockListener {
    registry: WatchRegistry,
    height_source: Arc<dyn BlockHeightSource>,
    notification_tx: NotificationSender,
}

impl BlockListener {
    /// Create a new BlockListener.
    ///
    /// # Arguments
    ///
    /// * `registry` - Shared watch registry
    /// * `height_source` - Node query resolving block hashes to heights
    /// * `notification_tx` - Sender for retired watches
    pub fn new(
        registry: WatchRegistry,
        height_source: Arc<dyn BlockHeightSource>,
        notification_tx: NotificationSender,
    ) -> Self {
        Self {
            registry,
            height_source,
            notification_tx,
        }
    }

    /// Run the BlockListener until every block sender is dropped.
    ///
    /// A block whose height cannot be resolved is abandoned; the loop carries on.
    pub async fn run(self, mut block_rx: BlockEventReceiver) {
        info!("BlockListener started");

        while let Some(event) = block_rx.recv().await {
            if let Err(e) = self.process(event).await {
                error!(error = %e, "Failed to process BlockEvent");
            }
        }

        info!("BlockEvent channel closed");
        info!("BlockListener shutdown complete");
    }

    async fn emit(&self, notification: Notification) {
        let id = notification.watch.id;
        if let Err(e) = self.notification_tx.send(notification).await {
            warn!(%id, error = %e, "Failed to send Notification, receiver dropped");
        }
    }
}

impl Processor<BlockEvent> for BlockListener {
    type Output = ();
    type Error = BlockListenerError;

    async fn process(&self, event: BlockEvent) -> Result<(), BlockListenerError> {
        let hash = event.block_hash();
        let height = self
            .height_source
            .block_height(&hash)
            .await
            .map_err(|source| BlockListenerError::NodeQueryFailed { hash, source })?;
        debug!(%hash, height, txs = event.block.txdata.len(), "Received BlockEvent");

        for txid in self.registry.mark_confirmed(event.txids(), height).await {
            info!(%txid, height, "Watched transaction confirmed");
        }

        let due = self.registry.take_confirmed(height).await;
        let notified = due.len();
        for watch in due {
            info!(
                id = %watch.id,
                txid = %watch.txid,
                want_confirmations = watch.want_confirmations,
                confirmed_at = ?watch.confirmed_at_height,
                height,
                "Watched transaction reached target depth"
            );
            self.emit(Notification::confirmed(watch, height)).await;
        }

        debug!(%hash, height, notified, "Processed BlockEvent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NotificationReceiver, block_event_channel, notification_channel};
    use crate::models::Outcome;
    use crate::models::fixtures::{address, tx_watch, txid};
    use crate::processors::testing::{FixedHeights, block_with, payment};

    fn listener(
        registry: &WatchRegistry,
        heights: &Arc<FixedHeights>,
    ) -> (BlockListener, NotificationReceiver) {
        let (notification_tx, notification_rx) = notification_channel();
        (
            BlockListener::new(registry.clone(), heights.clone(), notification_tx),
            notification_rx,
        )
    }

    /// Registers a watch on a fresh payment and returns the payment.
    async fn watched_payment(registry: &WatchRegistry, n: u8, want: u32) -> bitcoin::Transaction {
        let tx = payment(&[(address(n), 1_000)]);
        let mut watch = tx_watch(n, want);
        watch.txid = tx.compute_txid();
        registry.watch_derived(watch).await;
        tx
    }

    #[tokio::test]
    async fn test_single_confirmation_fires_in_containing_block() {
        let registry = WatchRegistry::new();
        let heights = Arc::new(FixedHeights::default());
        let (listener, mut rx) = listener(&registry, &heights);

        let tx = watched_payment(&registry, 1, 1).await;
        let block = block_with(vec![tx.clone()], 1);
        heights.insert(block.block_hash(), 100);
        listener.process(block.into()).await.unwrap();

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.outcome, Outcome::Confirmed);
        assert_eq!(notification.watch.confirmed_at_height, Some(100));
        assert_eq!(notification.confirmations(), 1);
        assert!(registry.lookup_transaction(&tx.compute_txid()).await.is_none());
    }

    #[tokio::test]
    async fn test_fires_exactly_at_target_depth() {
        let registry = WatchRegistry::new();
        let heights = Arc::new(FixedHeights::default());
        let (listener, mut rx) = listener(&registry, &heights);

        let tx = watched_payment(&registry, 1, 3).await;
        let txid = tx.compute_txid();

        let containing = block_with(vec![tx], 1);
        heights.insert(containing.block_hash(), 200);
        listener.process(containing.into()).await.unwrap();
        assert!(rx.try_recv().is_err());

        let next = block_with(vec![], 2);
        heights.insert(next.block_hash(), 201);
        listener.process(next.into()).await.unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(
            registry.lookup_transaction(&txid).await.unwrap().confirmed_at_height,
            Some(200)
        );

        let third = block_with(vec![], 3);
        heights.insert(third.block_hash(), 202);
        listener.process(third.into()).await.unwrap();
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.watch.txid, txid);
        assert_eq!(notification.confirmations(), 3);
        assert!(registry.lookup_transaction(&txid).await.is_none());
    }

    #[tokio::test]
    async fn test_confirmation_height_is_never_overwritten() {
        let registry = WatchRegistry::new();
        let heights = Arc::new(FixedHeights::default());
        let (listener, _rx) = listener(&registry, &heights);

        let tx = watched_payment(&registry, 1, 10).await;
        let first = block_with(vec![tx.clone()], 1);
        let again = block_with(vec![tx.clone()], 2);
        heights.insert(first.block_hash(), 50);
        heights.insert(again.block_hash(), 51);

        listener.process(first.into()).await.unwrap();
        listener.process(again.into()).await.unwrap();

        let watch = registry.lookup_transaction(&tx.compute_txid()).await.unwrap();
        assert_eq!(watch.confirmed_at_height, Some(50));
    }

    #[tokio::test]
    async fn test_zero_conf_confirmed_before_seen_fires_immediately() {
        let registry = WatchRegistry::new();
        let heights = Arc::new(FixedHeights::default());
        let (listener, mut rx) = listener(&registry, &heights);

        let tx = watched_payment(&registry, 1, 0).await;
        let block = block_with(vec![tx], 1);
        heights.insert(block.block_hash(), 7);
        listener.process(block.into()).await.unwrap();

        assert_eq!(rx.try_recv().unwrap().outcome, Outcome::Confirmed);
        assert_eq!(registry.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_block_is_abandoned() {
        let registry = WatchRegistry::new();
        let heights = Arc::new(FixedHeights::default());
        let (listener, mut rx) = listener(&registry, &heights);

        let tx = watched_payment(&registry, 1, 1).await;
        let block = block_with(vec![tx.clone()], 1);
        let err = listener.process(block.into()).await.unwrap_err();
        assert!(matches!(err, BlockListenerError::NodeQueryFailed { .. }));

        let watch = registry.lookup_transaction(&tx.compute_txid()).await.unwrap();
        assert_eq!(watch.confirmed_at_height, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_continues_after_node_failure() {
        let registry = WatchRegistry::new();
        let heights = Arc::new(FixedHeights::default());
        let (listener, mut rx) = listener(&registry, &heights);
        let (block_tx, block_rx) = block_event_channel();

        let tx = watched_payment(&registry, 1, 1).await;
        let unknown = block_with(vec![tx.clone()], 1);
        let known = block_with(vec![tx.clone()], 2);
        heights.insert(known.block_hash(), 300);

        let handle = tokio::spawn(listener.run(block_rx));
        block_tx.send(unknown.into()).await.unwrap();
        block_tx.send(known.into()).await.unwrap();
        drop(block_tx);
        handle.await.unwrap();

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.watch.confirmed_at_height, Some(300));
    }

    #[tokio::test]
    async fn test_unwatched_transactions_are_ignored() {
        let registry = WatchRegistry::new();
        let heights = Arc::new(FixedHeights::default());
        let (listener, mut rx) = listener(&registry, &heights);
        registry.watch_derived(tx_watch(5, 1)).await;

        let block = block_with(vec![payment(&[(address(3), 1)])], 1);
        heights.insert(block.block_hash(), 10);
        listener.process(block.into()).await.unwrap();

        assert!(rx.try_recv().is_err());
        let watch = registry.lookup_transaction(&txid(5)).await.unwrap();
        assert_eq!(watch.confirmed_at_height, None);
    }
}
