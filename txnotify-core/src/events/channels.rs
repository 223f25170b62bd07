//! Event channel factories and handles.

use super::types::{BlockEvent, TransactionEvent};
use crate::models::Notification;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// Enough to absorb a burst of mempool transactions while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for TransactionEvent events.
pub type TransactionEventSender = mpsc::Sender<TransactionEvent>;
/// Receiver handle for TransactionEvent events.
pub type TransactionEventReceiver = mpsc::Receiver<TransactionEvent>;

/// Sender handle for BlockEvent events.
pub type BlockEventSender = mpsc::Sender<BlockEvent>;
/// Receiver handle for BlockEvent events.
pub type BlockEventReceiver = mpsc::Receiver<BlockEvent>;

/// Sender handle for retired watches awaiting delivery.
pub type NotificationSender = mpsc::Sender<Notification>;
/// Receiver handle for retired watches awaiting delivery.
pub type NotificationReceiver = mpsc::Receiver<Notification>;

/// Create a new TransactionEvent channel.
///
/// The listener stops once every clone of the returned sender is dropped.
pub fn transaction_event_channel() -> (TransactionEventSender, TransactionEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new BlockEvent channel.
pub fn block_event_channel() -> (BlockEventSender, BlockEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new Notification channel.
///
/// Both listeners hold a clone of the sender; the dispatcher stops once both are gone.
pub fn notification_channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Container for both event senders, handed to the node transport.
#[derive(Clone)]
pub struct EventSenders {
    /// Sender for newly seen transactions
    pub transaction: TransactionEventSender,
    /// Sender for newly connected blocks
    pub block: BlockEventSender,
}

impl EventSenders {
    pub fn new(transaction: TransactionEventSender, block: BlockEventSender) -> Self {
        Self { transaction, block }
    }
}
