//! Validated configuration used at runtime.

use bitcoin::Network;
use std::net::SocketAddr;
use std::time::Duration;
use txnotify_core::notification::{ChannelTransportConfig, SmtpConfig};
use url::Url;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Connection details for the bitcoind node.
#[derive(Clone)]
pub struct NodeConfig {
    pub network: Network,
    pub rpc_url: Url,
    pub rpc_user: String,
    pub rpc_password: String,
    pub zmq_raw_block: String,
    pub zmq_raw_tx: String,
}

impl std::fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConfig")
            .field("network", &self.network)
            .field("rpc_url", &self.rpc_url.as_str())
            .field("rpc_user", &self.rpc_user)
            .field("rpc_password", &"<redacted>")
            .field("zmq_raw_block", &self.zmq_raw_block)
            .field("zmq_raw_tx", &self.zmq_raw_tx)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub request_timeout: Duration,
    pub email_from: String,
    pub smtp: Option<SmtpConfig>,
    pub registration_alert_email: Option<String>,
}

impl NotificationConfig {
    pub fn transport_config(&self) -> ChannelTransportConfig {
        ChannelTransportConfig {
            request_timeout: self.request_timeout,
            email_from: self.email_from.clone(),
            smtp: self.smtp.clone(),
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub server: ServerConfig,
    pub node: NodeConfig,
    pub notifications: NotificationConfig,
}
