//! NotificationDispatcher processor.
//!
//! The NotificationDispatcher is responsible for:
//! - Receiving retired watches as `Notification` from the queue
//! - Rendering one message per configured channel (email, callback, chat)
//! - Delivering the channels concurrently; a failing channel never stops the others
//!
//! Deliveries are attempted once. A failure is logged and the watch stays retired.

use super::message::{Channel, render};
use super::transport::NotificationTransport;
use crate::events::NotificationReceiver;
use crate::models::Notification;
use kanau::processor::Processor;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Result of one channel's delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// The target has no destination for this channel
    Skipped,
    Delivered,
    Failed(String),
}

/// Per-channel results of dispatching one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub email: DeliveryStatus,
    pub callback: DeliveryStatus,
    pub chat: DeliveryStatus,
}

impl DispatchReport {
    fn statuses(&self) -> [&DeliveryStatus; 3] {
        [&self.email, &self.callback, &self.chat]
    }

    pub fn delivered(&self) -> usize {
        self.statuses()
            .into_iter()
            .filter(|s| matches!(s, DeliveryStatus::Delivered))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.statuses()
            .into_iter()
            .filter(|s| matches!(s, DeliveryStatus::Failed(_)))
            .count()
    }
}

/// NotificationDispatcher fans a notification out to every configured channel.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn NotificationTransport>,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self { transport }
    }

    /// Run the NotificationDispatcher until the notification channel closes.
    ///
    /// Each notification is delivered on its own task. In-flight deliveries
    /// are awaited before returning.
    pub async fn run(self, mut notification_rx: NotificationReceiver) {
        info!("NotificationDispatcher started");

        let mut in_flight = JoinSet::new();
        while let Some(notification) = notification_rx.recv().await {
            debug!(
                id = %notification.watch.id,
                txid = %notification.watch.txid,
                outcome = %notification.outcome,
                "Received Notification"
            );
            let dispatcher = self.clone();
            in_flight.spawn(async move {
                let _ = dispatcher.process(notification).await;
            });
            while in_flight.try_join_next().is_some() {}
        }

        info!(
            in_flight = in_flight.len(),
            "Notification channel closed, draining deliveries"
        );
        while in_flight.join_next().await.is_some() {}

        info!("NotificationDispatcher shutdown complete");
    }

    async fn attempt(
        &self,
        channel: Channel,
        destination: Option<&str>,
        notification: &Notification,
    ) -> DeliveryStatus {
        let Some(destination) = destination else {
            return DeliveryStatus::Skipped;
        };
        let message = render(channel, notification);
        match self.transport.deliver(destination, &message).await {
            Ok(()) => {
                debug!(
                    id = %notification.watch.id,
                    %channel,
                    "Notification delivered"
                );
                DeliveryStatus::Delivered
            }
            Err(e) => {
                warn!(
                    id = %notification.watch.id,
                    txid = %notification.watch.txid,
                    %channel,
                    error = %e,
                    "Notification delivery failed"
                );
                DeliveryStatus::Failed(e.to_string())
            }
        }
    }
}

impl Processor<Notification> for NotificationDispatcher {
    type Output = DispatchReport;
    type Error = Infallible;

    async fn process(&self, notification: Notification) -> Result<DispatchReport, Infallible> {
        let target = &notification.watch.target;
        let (email, callback, chat) = tokio::join!(
            self.attempt(Channel::Email, target.email.as_deref(), &notification),
            self.attempt(Channel::Callback, target.callback_url.as_deref(), &notification),
            self.attempt(Channel::Chat, target.chat_webhook_url.as_deref(), &notification),
        );
        let report = DispatchReport {
            email,
            callback,
            chat,
        };

        info!(
            id = %notification.watch.id,
            txid = %notification.watch.txid,
            outcome = %notification.outcome,
            delivered = report.delivered(),
            failed = report.failed(),
            "Notification dispatched"
        );
        Ok(report)
    }
}
