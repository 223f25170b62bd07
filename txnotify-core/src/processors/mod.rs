//! Event processors.
//!
//! - `TransactionListener`: Receives `TransactionEvent`, emits `Notification` for zero-confirmation watches
//! - `BlockListener`: Receives `BlockEvent`, emits `Notification` for watches at target depth
//! - `NotificationDispatcher` (in `crate::notification`): Receives `Notification`, delivers it

pub mod block_listener;
pub mod transaction_listener;

pub use block_listener::{BlockListener, BlockListenerError};
pub use transaction_listener::TransactionListener;
