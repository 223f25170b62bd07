//! Event streams fed by the node transport.
//!
//! # Event Flow
//!
//! 1. Node transport emits `TransactionEvent` -> `TransactionListener`
//! 2. Node transport emits `BlockEvent` -> `BlockListener`
//! 3. Both listeners emit `Notification` -> `NotificationDispatcher`
//!
//! Both listeners mutate the shared `WatchRegistry`. The two node streams are
//! independent; there is no ordering between a transaction and the block that
//! confirms it.

pub mod channels;
pub mod types;

pub use channels::{
    BlockEventReceiver, BlockEventSender, DEFAULT_CHANNEL_BUFFER, EventSenders,
    NotificationReceiver, NotificationSender, TransactionEventReceiver, TransactionEventSender,
    block_event_channel, notification_channel, transaction_event_channel,
};

pub use types::{BlockEvent, TransactionEvent};
