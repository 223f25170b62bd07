//! ZMQ feeder.
//!
//! Subscribes to bitcoind's `rawtx` and `rawblock` publishers and forwards
//! decoded transactions and blocks into the core's event channels. Dropping
//! the feeder drops the channel senders, which stops both listeners.

use crate::config::runtime::NodeConfig;
use bitcoincore_zmq::Message;
use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};
use txnotify_core::events::EventSenders;

/// Forwards node notifications into the event channels.
pub struct ZmqFeeder {
    endpoints: Vec<String>,
    senders: EventSenders,
    shutdown_rx: watch::Receiver<bool>,
}

impl ZmqFeeder {
    /// Create a new ZmqFeeder.
    ///
    /// # Arguments
    ///
    /// * `config` - Node configuration holding the ZMQ endpoints
    /// * `senders` - Senders for transaction and block events
    /// * `shutdown_rx` - Receiver for shutdown signal
    pub fn new(
        config: &NodeConfig,
        senders: EventSenders,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let mut endpoints = vec![config.zmq_raw_tx.clone()];
        if config.zmq_raw_block != config.zmq_raw_tx {
            endpoints.push(config.zmq_raw_block.clone());
        }
        Self {
            endpoints,
            senders,
            shutdown_rx,
        }
    }

    /// Run the ZmqFeeder until shutdown, stream end, or both listeners are gone.
    pub async fn run(mut self) -> Result<(), bitcoincore_zmq::Error> {
        let endpoints: Vec<&str> = self.endpoints.iter().map(String::as_str).collect();
        let mut stream = bitcoincore_zmq::subscribe_async(&endpoints)?;
        info!(endpoints = ?self.endpoints, "ZmqFeeder started");

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("ZmqFeeder received shutdown signal");
                        break;
                    }
                }

                next = stream.next() => match next {
                    Some(Ok(message)) => {
                        if !self.forward(message).await {
                            warn!("Event channel closed, stopping ZmqFeeder");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Failed to receive ZMQ message");
                    }
                    None => {
                        warn!("ZMQ stream ended");
                        break;
                    }
                },
            }
        }

        info!("ZmqFeeder shutdown complete");
        Ok(())
    }

    /// Forward one message. Returns false once the receiving side is gone.
    async fn forward(&self, message: Message) -> bool {
        match message {
            Message::Tx(tx, sequence) => {
                trace!(txid = %tx.compute_txid(), sequence, "Received rawtx");
                self.senders.transaction.send(tx.into()).await.is_ok()
            }
            Message::Block(block, sequence) => {
                debug!(hash = %block.block_hash(), sequence, "Received rawblock");
                self.senders.block.send(block.into()).await.is_ok()
            }
            _ => true,
        }
    }
}
