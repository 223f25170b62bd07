//! Rendering of notifications into channel-specific messages.

use crate::models::{Notification, Outcome};
use txnotify_sdk::objects::{CallbackPayload, ChatBlock, ChatMessage, ChatText, WatchKind};

/// Delivery channel of a rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Email,
    Callback,
    Chat,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Callback => write!(f, "callback"),
            Channel::Chat => write!(f, "chat"),
        }
    }
}

/// A message ready to be handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedMessage {
    Email { subject: String, body: String },
    Callback(CallbackPayload),
    Chat(ChatMessage),
}

impl RenderedMessage {
    pub fn channel(&self) -> Channel {
        match self {
            RenderedMessage::Email { .. } => Channel::Email,
            RenderedMessage::Callback(_) => Channel::Callback,
            RenderedMessage::Chat(_) => Channel::Chat,
        }
    }
}

/// Render `notification` for `channel`.
pub fn render(channel: Channel, notification: &Notification) -> RenderedMessage {
    match channel {
        Channel::Email => render_email(notification),
        Channel::Callback => RenderedMessage::Callback(callback_payload(notification)),
        Channel::Chat => RenderedMessage::Chat(chat_message(notification)),
    }
}

fn render_email(notification: &Notification) -> RenderedMessage {
    let watch = &notification.watch;
    let (subject, mut body) = match notification.outcome {
        Outcome::Seen => match &watch.output {
            Some(output) => (
                "Address received transaction",
                format!(
                    "Address received new transaction with\ntxid: {}\nvout: {}\namount: {:.8} BTC",
                    watch.txid,
                    output.vout,
                    output.value.to_btc()
                ),
            ),
            None => (
                "Transaction seen",
                format!("Transaction seen\ntxid: {}", watch.txid),
            ),
        },
        Outcome::Confirmed => (
            "Transaction was confirmed",
            format!(
                "Transaction confirmed\ntxid: {}\nconfirmed in block: {}\nconfirmations: {}",
                watch.txid,
                watch.confirmed_at_height.unwrap_or_default(),
                notification.confirmations()
            ),
        ),
    };
    if let Some(description) = &watch.description {
        body.push_str("\ndescription: ");
        body.push_str(description);
    }
    RenderedMessage::Email {
        subject: subject.to_string(),
        body,
    }
}

/// Build the JSON body posted to a callback URL.
pub fn callback_payload(notification: &Notification) -> CallbackPayload {
    let watch = &notification.watch;
    CallbackPayload {
        id: watch.id,
        event: notification.outcome,
        txid: watch.txid.to_string(),
        vout: watch.output.as_ref().map(|o| o.vout),
        amount_sat: watch.output.as_ref().map(|o| o.value.to_sat()),
        address: watch.output.as_ref().map(|o| o.address.to_string()),
        confirmed_at_block: watch.confirmed_at_height,
        confirmations: notification.confirmations(),
        description: watch.description.clone(),
        timestamp: time::OffsetDateTime::now_utc().unix_timestamp(),
    }
}

fn chat_message(notification: &Notification) -> ChatMessage {
    let title = match notification.outcome {
        Outcome::Seen => "Transaction seen",
        Outcome::Confirmed => "Transaction confirmed",
    };
    let details = serde_json::to_string_pretty(&callback_payload(notification))
        .unwrap_or_else(|_| notification.watch.txid.to_string());
    ChatMessage {
        text: format!("{title}: {}", notification.watch.txid),
        blocks: vec![
            ChatBlock::Header {
                text: ChatText::Plain {
                    text: title.to_string(),
                },
            },
            ChatBlock::Divider,
            ChatBlock::Section {
                text: ChatText::Markdown {
                    text: format!("```{details}```"),
                },
            },
        ],
    }
}

/// Email sent to the operator whenever a watch is registered.
pub fn registration_alert(identifier: &str, kind: WatchKind, target: &str) -> RenderedMessage {
    RenderedMessage::Email {
        subject: "New notification created".to_string(),
        body: format!("New notification created to {target}\n{kind}: {identifier}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{address, tx_watch};
    use crate::models::{MatchedOutput, TxWatch};
    use bitcoin::Amount;

    fn address_watch_tx() -> TxWatch {
        let mut watch = tx_watch(4, 0);
        watch.description = Some("donations".to_string());
        watch.output = Some(MatchedOutput {
            address: address(2),
            vout: 1,
            value: Amount::from_sat(150_000),
        });
        watch
    }

    #[test]
    fn test_seen_email_lists_output() {
        let watch = address_watch_tx();
        let txid = watch.txid;
        let RenderedMessage::Email { subject, body } =
            render(Channel::Email, &Notification::seen(watch))
        else {
            panic!("expected email");
        };
        assert_eq!(subject, "Address received transaction");
        assert_eq!(
            body,
            format!(
                "Address received new transaction with\ntxid: {txid}\nvout: 1\namount: 0.00150000 BTC\ndescription: donations"
            )
        );
    }

    #[test]
    fn test_confirmed_email() {
        let mut watch = tx_watch(5, 2);
        watch.confirmed_at_height = Some(100);
        let txid = watch.txid;
        let RenderedMessage::Email { subject, body } =
            render(Channel::Email, &Notification::confirmed(watch, 101))
        else {
            panic!("expected email");
        };
        assert_eq!(subject, "Transaction was confirmed");
        assert_eq!(
            body,
            format!("Transaction confirmed\ntxid: {txid}\nconfirmed in block: 100\nconfirmations: 2")
        );
    }

    #[test]
    fn test_callback_payload() {
        let mut watch = address_watch_tx();
        watch.want_confirmations = 3;
        watch.confirmed_at_height = Some(50);
        let notification = Notification::confirmed(watch.clone(), 52);

        let RenderedMessage::Callback(payload) = render(Channel::Callback, &notification) else {
            panic!("expected callback");
        };
        assert_eq!(payload.id, watch.id);
        assert_eq!(payload.event, Outcome::Confirmed);
        assert_eq!(payload.txid, watch.txid.to_string());
        assert_eq!(payload.vout, Some(1));
        assert_eq!(payload.amount_sat, Some(150_000));
        assert_eq!(payload.address, Some(address(2).to_string()));
        assert_eq!(payload.confirmed_at_block, Some(50));
        assert_eq!(payload.confirmations, 3);
    }

    #[test]
    fn test_chat_message_header() {
        let notification = Notification::seen(address_watch_tx());
        let message = render(Channel::Chat, &notification);
        assert_eq!(message.channel(), Channel::Chat);
        let RenderedMessage::Chat(chat) = message else {
            panic!("expected chat");
        };
        assert_eq!(chat.blocks.len(), 3);
        assert_eq!(
            chat.blocks[0],
            ChatBlock::Header {
                text: ChatText::Plain {
                    text: "Transaction seen".to_string()
                }
            }
        );
        let ChatBlock::Section {
            text: ChatText::Markdown { text },
        } = &chat.blocks[2]
        else {
            panic!("expected markdown section");
        };
        assert!(text.contains(&notification.watch.txid.to_string()));
        assert!(text.contains("\"vout\": 1"));
    }
}
