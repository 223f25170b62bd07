//! Watch records held by the registry.

use bitcoin::{Address, Amount, Txid};
pub use txnotify_sdk::objects::Outcome;
use uuid::Uuid;

/// Identifier assigned to every watch at creation.
pub type WatchId = Uuid;

/// Where notifications for a watch are delivered.
///
/// Every channel is independently optional. Blank strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationTarget {
    pub email: Option<String>,
    pub callback_url: Option<String>,
    pub chat_webhook_url: Option<String>,
}

impl NotificationTarget {
    pub fn new(
        email: Option<String>,
        callback_url: Option<String>,
        chat_webhook_url: Option<String>,
    ) -> Self {
        Self {
            email: non_blank(email),
            callback_url: non_blank(callback_url),
            chat_webhook_url: non_blank(chat_webhook_url),
        }
    }

    pub fn email(email: impl Into<String>) -> Self {
        Self::new(Some(email.into()), None, None)
    }

    /// True when no delivery channel is set.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.callback_url.is_none() && self.chat_webhook_url.is_none()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A standing request to be told about payments to an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressWatch {
    pub id: WatchId,
    pub address: Address,
    pub target: NotificationTarget,
    pub want_confirmations: u32,
    pub description: Option<String>,
}

/// The output of a transaction that paid a watched address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedOutput {
    pub address: Address,
    pub vout: u32,
    pub value: Amount,
}

/// A request to be told when a transaction reaches a confirmation depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxWatch {
    pub id: WatchId,
    pub txid: Txid,
    pub target: NotificationTarget,
    pub want_confirmations: u32,
    /// Height of the first block seen containing the transaction. Never unset once set.
    pub confirmed_at_height: Option<u64>,
    pub description: Option<String>,
    /// Present when the watch was derived from an address watch.
    pub output: Option<MatchedOutput>,
}

impl TxWatch {
    /// Derive a transaction watch from an address watch whose address was paid.
    pub fn derived(watch: &AddressWatch, txid: Txid, vout: u32, value: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            txid,
            target: watch.target.clone(),
            want_confirmations: watch.want_confirmations,
            confirmed_at_height: None,
            description: watch.description.clone(),
            output: Some(MatchedOutput {
                address: watch.address.clone(),
                vout,
                value,
            }),
        }
    }

    /// Height at which the watch has the confirmations it asked for.
    ///
    /// The confirming block counts as the first confirmation.
    pub fn target_height(&self) -> Option<u64> {
        self.confirmed_at_height.map(|confirmed_at| {
            confirmed_at
                .saturating_add(u64::from(self.want_confirmations))
                .saturating_sub(1)
        })
    }

    /// Number of confirmations the transaction has at `height`.
    pub fn confirmations_at(&self, height: u64) -> u32 {
        match self.confirmed_at_height {
            Some(confirmed_at) if height >= confirmed_at => {
                u32::try_from(height - confirmed_at + 1).unwrap_or(u32::MAX)
            }
            _ => 0,
        }
    }
}

/// A retired watch handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub watch: TxWatch,
    pub outcome: Outcome,
    /// Chain height when the notification fired, for confirmed notifications.
    pub height: Option<u64>,
}

impl Notification {
    pub fn seen(watch: TxWatch) -> Self {
        Self {
            watch,
            outcome: Outcome::Seen,
            height: None,
        }
    }

    pub fn confirmed(watch: TxWatch, height: u64) -> Self {
        Self {
            watch,
            outcome: Outcome::Confirmed,
            height: Some(height),
        }
    }

    /// Confirmations reported to the recipient.
    pub fn confirmations(&self) -> u32 {
        match self.height {
            Some(height) => self.watch.confirmations_at(height),
            None => 0,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_target_normalises_blank_channels() {
        let target = NotificationTarget::new(
            Some("  ".to_string()),
            Some("https://example.com/cb".to_string()),
            Some(String::new()),
        );
        assert!(target.email.is_none());
        assert_eq!(target.callback_url.as_deref(), Some("https://example.com/cb"));
        assert!(target.chat_webhook_url.is_none());
        assert!(!target.is_empty());
        assert!(NotificationTarget::default().is_empty());
    }

    #[test]
    fn test_target_height() {
        let mut watch = tx_watch(1, 2);
        assert_eq!(watch.target_height(), None);
        watch.confirmed_at_height = Some(100);
        assert_eq!(watch.target_height(), Some(101));

        watch.want_confirmations = 1;
        assert_eq!(watch.target_height(), Some(100));

        // confirmed before it was ever seen
        watch.want_confirmations = 0;
        assert_eq!(watch.target_height(), Some(99));
    }

    #[test]
    fn test_confirmations_at() {
        let mut watch = tx_watch(1, 3);
        assert_eq!(watch.confirmations_at(100), 0);
        watch.confirmed_at_height = Some(100);
        assert_eq!(watch.confirmations_at(99), 0);
        assert_eq!(watch.confirmations_at(100), 1);
        assert_eq!(watch.confirmations_at(102), 3);
    }

    #[test]
    fn test_derived_copies_address_watch() {
        let watch = AddressWatch {
            id: Uuid::new_v4(),
            address: address(7),
            target: NotificationTarget::email("a@example.com"),
            want_confirmations: 4,
            description: Some("rent".to_string()),
        };
        let derived = TxWatch::derived(&watch, txid(9), 1, Amount::from_sat(5_000));
        assert_ne!(derived.id, watch.id);
        assert_eq!(derived.txid, txid(9));
        assert_eq!(derived.target, watch.target);
        assert_eq!(derived.want_confirmations, 4);
        assert_eq!(derived.description.as_deref(), Some("rent"));
        assert_eq!(derived.confirmed_at_height, None);
        let output = derived.output.unwrap();
        assert_eq!(output.vout, 1);
        assert_eq!(output.address, address(7));
        assert_eq!(output.value, Amount::from_sat(5_000));
    }
}
