use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request payload for registering a new watch.
///
/// `identifier` is either a Bitcoin address or a transaction id. At least one
/// of the delivery channels must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNotification {
    pub identifier: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Confirmations to wait for. `0` notifies as soon as the transaction is seen.
    #[serde(default)]
    pub confirmations: u32,
}

/// What kind of identifier a registration resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchKind {
    Address,
    Transaction,
}

impl std::fmt::Display for WatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchKind::Address => write!(f, "address"),
            WatchKind::Transaction => write!(f, "transaction"),
        }
    }
}

/// Response returned when a watch was registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNotificationResponse {
    pub id: Uuid,
    pub kind: WatchKind,
}

/// Current state of a watched address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressWatchView {
    pub id: Uuid,
    pub address: String,
    pub want_confirmations: u32,
    pub description: Option<String>,
}

/// Current state of a watched transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxWatchView {
    pub id: Uuid,
    pub txid: String,
    pub want_confirmations: u32,
    /// Height of the block that first confirmed the transaction, if any.
    pub confirmed_at_block: Option<u64>,
    pub description: Option<String>,
}
