//! Configuration module for txnotify-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;
pub mod runtime;

use crate::config::file::{BitcoindConfig, FileConfig, NotificationsConfig, SmtpFileConfig};
use crate::config::runtime::{NodeConfig, NotificationConfig, RuntimeConfig, ServerConfig};
use bitcoin::Network;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use txnotify_core::notification::{SmtpConfig, SmtpSecurity};
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("bitcoind RPC password not set in config or environment")]
    MissingRpcPassword,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
    rpc_password_override: Option<String>,
    smtp_password_override: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(
        config_path: impl AsRef<Path>,
        listen_override: Option<SocketAddr>,
        rpc_password_override: Option<String>,
        smtp_password_override: Option<String>,
    ) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            rpc_password_override,
            smtp_password_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI and environment overrides
    /// 3. Validate and convert into the runtime configuration
    pub fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, config_content: &str) -> Result<RuntimeConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if let Some(password) = &self.rpc_password_override {
            file_config.bitcoind.rpc_password = Some(password.clone());
        }
        if let (Some(password), Some(smtp)) = (
            &self.smtp_password_override,
            file_config.notifications.smtp.as_mut(),
        ) {
            smtp.password = Some(password.clone());
        }

        Ok(RuntimeConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
            },
            node: convert_node(file_config.bitcoind)?,
            notifications: convert_notifications(file_config.notifications)?,
        })
    }
}

/// Parse a network name. An empty name selects regtest.
pub fn parse_network(name: &str) -> Result<Network, ConfigError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "mainnet" | "bitcoin" => Ok(Network::Bitcoin),
        "testnet" | "testnet3" => Ok(Network::Testnet),
        "signet" => Ok(Network::Signet),
        "regtest" | "" => Ok(Network::Regtest),
        other => Err(ConfigError::ValidationError(format!(
            "unknown network: {other}"
        ))),
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value)
        .map_err(|e| ConfigError::ValidationError(format!("{field} is not a valid URL: {e}")))
}

fn convert_node(b: BitcoindConfig) -> Result<NodeConfig, ConfigError> {
    for (field, endpoint) in [("zmq_raw_block", &b.zmq_raw_block), ("zmq_raw_tx", &b.zmq_raw_tx)] {
        if endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{field} is empty")));
        }
    }
    let rpc_password = b
        .rpc_password
        .filter(|p| !p.is_empty())
        .ok_or(ConfigError::MissingRpcPassword)?;

    Ok(NodeConfig {
        network: parse_network(&b.network)?,
        rpc_url: parse_url("rpc_url", &b.rpc_url)?,
        rpc_user: b.rpc_user,
        rpc_password,
        zmq_raw_block: b.zmq_raw_block,
        zmq_raw_tx: b.zmq_raw_tx,
    })
}

/// Parse an SMTP security mode.
pub fn parse_smtp_security(name: &str) -> Result<SmtpSecurity, ConfigError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "starttls" | "" => Ok(SmtpSecurity::StartTls),
        "tls" | "ssl" => Ok(SmtpSecurity::Tls),
        "none" | "plain" => Ok(SmtpSecurity::Plain),
        other => Err(ConfigError::ValidationError(format!(
            "unknown smtp security mode: {other}"
        ))),
    }
}

fn convert_smtp(s: SmtpFileConfig) -> Result<SmtpConfig, ConfigError> {
    if s.host.trim().is_empty() {
        return Err(ConfigError::ValidationError("smtp host is empty".to_string()));
    }
    let security = parse_smtp_security(&s.security)?;
    Ok(SmtpConfig {
        host: s.host.trim().to_string(),
        port: s.port.unwrap_or_else(|| security.default_port()),
        security,
        username: s.username.filter(|u| !u.is_empty()),
        password: s.password.filter(|p| !p.is_empty()),
    })
}

fn convert_notifications(n: NotificationsConfig) -> Result<NotificationConfig, ConfigError> {
    if n.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "request_timeout_secs must be positive".to_string(),
        ));
    }

    Ok(NotificationConfig {
        request_timeout: Duration::from_secs(n.request_timeout_secs),
        email_from: n.email_from,
        smtp: n.smtp.map(convert_smtp).transpose()?,
        registration_alert_email: n.registration_alert_email.filter(|e| !e.trim().is_empty()),
    })
}
