pub mod notification;
pub mod webhook;

pub use notification::{
    AddressWatchView, CreateNotification, CreateNotificationResponse, TxWatchView, WatchKind,
};
pub use webhook::{CallbackPayload, ChatBlock, ChatMessage, ChatText, Outcome};
