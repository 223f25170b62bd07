//! Outbound delivery of rendered messages.
//!
//! [`ChannelTransport`] covers every channel:
//! - callback and chat webhooks receive a JSON POST
//! - email goes out over SMTP, when a server is configured

use super::message::{Channel, RenderedMessage};
use super::smtp::{SmtpConfig, SmtpMailer};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Sender address used when none is configured.
pub const DEFAULT_EMAIL_FROM: &str = "alerts@txnotify.com";

/// Errors that can occur while delivering a single message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The receiving endpoint answered with a non-success status
    #[error("delivery failed with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Email was requested but no SMTP server is configured
    #[error("email delivery is not configured")]
    EmailNotConfigured,

    /// SMTP connection or protocol error
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Sender or recipient is not a usable email address
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// Payload serialization error
    #[error("payload serialization error: {0}")]
    Serialization(String),
}

/// Delivers one rendered message to one destination.
///
/// `destination` is an email address for [`Channel::Email`] and a URL otherwise.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(
        &self,
        destination: &str,
        message: &RenderedMessage,
    ) -> Result<(), DeliveryError>;
}

/// Settings for [`ChannelTransport`].
#[derive(Debug, Clone)]
pub struct ChannelTransportConfig {
    pub request_timeout: Duration,
    pub email_from: String,
    pub smtp: Option<SmtpConfig>,
}

impl Default for ChannelTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            smtp: None,
        }
    }
}

/// Transport delivering webhooks over HTTP and email over SMTP.
#[derive(Clone)]
pub struct ChannelTransport {
    http_client: reqwest::Client,
    mailer: Option<SmtpMailer>,
}

impl ChannelTransport {
    /// Fails only when the SMTP settings or the sender address are unusable.
    pub fn new(config: ChannelTransportConfig) -> Result<Self, DeliveryError> {
        let mailer = config
            .smtp
            .as_ref()
            .map(|smtp| SmtpMailer::new(smtp, &config.email_from, config.request_timeout))
            .transpose()?;
        Ok(Self {
            http_client: reqwest::Client::builder()
                .timeout(config.request_timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            mailer,
        })
    }

    /// Whether this transport can deliver on `channel` at all.
    pub fn supports(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.mailer.is_some(),
            Channel::Callback | Channel::Chat => true,
        }
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        payload: &T,
    ) -> Result<(), DeliveryError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| DeliveryError::Serialization(e.to_string()))?;

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl NotificationTransport for ChannelTransport {
    async fn deliver(
        &self,
        destination: &str,
        message: &RenderedMessage,
    ) -> Result<(), DeliveryError> {
        match message {
            RenderedMessage::Email { subject, body } => {
                let Some(mailer) = &self.mailer else {
                    return Err(DeliveryError::EmailNotConfigured);
                };
                mailer.send(destination, subject, body).await
            }
            RenderedMessage::Callback(payload) => self.post_json(destination, payload).await,
            RenderedMessage::Chat(payload) => self.post_json(destination, payload).await,
        }
    }
}

impl std::fmt::Debug for ChannelTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTransport")
            .field("mailer", &self.mailer)
            .finish_non_exhaustive()
    }
}
