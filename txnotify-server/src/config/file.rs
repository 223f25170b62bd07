//! TOML file configuration structures.
//!
//! These structs directly map to the `txnotify.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use txnotify_core::notification::DEFAULT_EMAIL_FROM;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub bitcoind: BitcoindConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:9002").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9002))
}

/// bitcoind connection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoindConfig {
    /// One of mainnet, testnet, testnet3, signet, regtest. Empty means regtest.
    #[serde(default)]
    pub network: String,
    /// JSON-RPC endpoint, e.g. "http://127.0.0.1:18443".
    pub rpc_url: String,
    pub rpc_user: String,
    /// May be left out and supplied through the environment instead.
    #[serde(default)]
    pub rpc_password: Option<String>,
    /// `zmqpubrawblock` endpoint of the node.
    pub zmq_raw_block: String,
    /// `zmqpubrawtx` endpoint of the node.
    pub zmq_raw_tx: String,
}

/// Outbound notification section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_email_from")]
    pub email_from: String,
    /// Operator address told about every new registration.
    #[serde(default)]
    pub registration_alert_email: Option<String>,
    /// Email is disabled when this section is left out.
    #[serde(default)]
    pub smtp: Option<SmtpFileConfig>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            email_from: default_email_from(),
            registration_alert_email: None,
            smtp: None,
        }
    }
}

/// `[notifications.smtp]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpFileConfig {
    pub host: String,
    /// Defaults to the usual port for `security`.
    #[serde(default)]
    pub port: Option<u16>,
    /// One of starttls, tls, none.
    #[serde(default = "default_smtp_security")]
    pub security: String,
    #[serde(default)]
    pub username: Option<String>,
    /// May be left out and supplied through the environment instead.
    #[serde(default)]
    pub password: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_email_from() -> String {
    DEFAULT_EMAIL_FROM.to_string()
}

fn default_smtp_security() -> String {
    "starttls".to_string()
}
