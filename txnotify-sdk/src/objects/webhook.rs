//! Payloads posted to callback and chat webhooks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The transaction was observed, not yet confirmed.
    Seen,
    /// The transaction reached the requested confirmation depth.
    Confirmed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Seen => write!(f, "seen"),
            Outcome::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// Body of the HTTP POST sent to a registered callback URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub id: Uuid,
    pub event: Outcome,
    pub txid: String,
    /// Output index that paid the watched address, for address watches.
    pub vout: Option<u32>,
    pub amount_sat: Option<u64>,
    pub address: Option<String>,
    pub confirmed_at_block: Option<u64>,
    pub confirmations: u32,
    pub description: Option<String>,
    pub timestamp: i64,
}

/// Slack-compatible incoming webhook message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Fallback text for clients that do not render blocks.
    pub text: String,
    pub blocks: Vec<ChatBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatBlock {
    Header { text: ChatText },
    Divider,
    Section { text: ChatText },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatText {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Markdown { text: String },
}
