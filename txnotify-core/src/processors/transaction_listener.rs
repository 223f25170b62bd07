//! TransactionListener processor.
//!
//! The TransactionListener is responsible for:
//! - Receiving `TransactionEvent` from the node transport
//! - Matching every output's address against the watched addresses
//! - Promoting a match into a transaction watch keyed by the txid
//! - Retiring zero-confirmation watches as `Seen` notifications
//!
//! Outputs whose script has no address form (non-standard, OP_RETURN, bare
//! multisig) are skipped without logging a failure. When several outputs of
//! one transaction pay watched addresses, the last match wins.

use crate::events::{NotificationSender, TransactionEvent, TransactionEventReceiver};
use crate::models::{Notification, TxWatch};
use crate::registry::WatchRegistry;
use bitcoin::{Address, Network};
use kanau::processor::Processor;
use std::convert::Infallible;
use tracing::{debug, info, trace, warn};

/// TransactionListener matches new transactions against watched addresses.
pub struct TransactionListener {
    registry: WatchRegistry,
    network: Network,
    notification_tx: NotificationSender,
}

impl TransactionListener {
    /// Create a new TransactionListener.
    ///
    /// # Arguments
    ///
    /// * `registry` - Shared watch registry
    /// * `network` - Network used to decode output scripts into addresses
    /// * `notification_tx` - Sender for retired watches
    pub fn new(
        registry: WatchRegistry,
        network: Network,
        notification_tx: NotificationSender,
    ) -> Self {
        Self {
            registry,
            network,
            notification_tx,
        }
    }

    /// Run the TransactionListener until every transaction sender is dropped.
    pub async fn run(self, mut tx_rx: TransactionEventReceiver) {
        info!("TransactionListener started");

        while let Some(event) = tx_rx.recv().await {
            let _ = self.process(event).await;
        }

        info!("TransactionEvent channel closed");
        info!("TransactionListener shutdown complete");
    }

    async fn emit(&self, notification: Notification) {
        let id = notification.watch.id;
        if let Err(e) = self.notification_tx.send(notification).await {
            warn!(%id, error = %e, "Failed to send Notification, receiver dropped");
        }
    }
}

impl Processor<TransactionEvent> for TransactionListener {
    type Output = ();
    type Error = Infallible;

    async fn process(&self, event: TransactionEvent) -> Result<(), Infallible> {
        let txid = event.txid();
        debug!(%txid, outputs = event.tx.output.len(), "Received TransactionEvent");

        for (index, output) in event.tx.output.iter().enumerate() {
            let Ok(vout) = u32::try_from(index) else {
                warn!(%txid, index, "Output index out of range, skipping");
                continue;
            };
            let Ok(address) = Address::from_script(&output.script_pubkey, self.network) else {
                trace!(%txid, vout, "Output has no address form, skipping");
                continue;
            };
            let Some(watch) = self.registry.lookup_address(&address).await else {
                continue;
            };
            info!(
                id = %watch.id,
                %txid,
                vout,
                %address,
                amount_sat = output.value.to_sat(),
                "Watched address received transaction"
            );
            self.registry
                .watch_derived(TxWatch::derived(&watch, txid, vout, output.value))
                .await;
        }

        for watch in self.registry.take_seen().await {
            info!(id = %watch.id, txid = %watch.txid, "Zero-confirmation watch triggered");
            self.emit(Notification::seen(watch)).await;
        }

        Ok(())
    }
}
