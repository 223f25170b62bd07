//! Application state shared across all request handlers.

use bitcoin::Network;
use std::sync::Arc;
use txnotify_core::WatchRegistry;
use txnotify_core::notification::{NotificationTransport, registration_alert};
use txnotify_sdk::objects::WatchKind;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Watches shared with the event listeners.
    pub registry: WatchRegistry,
    /// Network that registered addresses must belong to.
    pub network: Network,
    /// Operator alerts on new registrations, when configured.
    pub alerts: Option<RegistrationAlerts>,
}

impl AppState {
    pub fn new(registry: WatchRegistry, network: Network, alerts: Option<RegistrationAlerts>) -> Self {
        Self {
            registry,
            network,
            alerts,
        }
    }
}

/// Emails the operator whenever a watch is registered.
#[derive(Clone)]
pub struct RegistrationAlerts {
    transport: Arc<dyn NotificationTransport>,
    email: String,
}

impl RegistrationAlerts {
    pub fn new(transport: Arc<dyn NotificationTransport>, email: String) -> Self {
        Self { transport, email }
    }

    /// Send the alert in the background; failures are only logged.
    pub fn notify(&self, identifier: &str, kind: WatchKind, target: &str) {
        let message = registration_alert(identifier, kind, target);
        let transport = self.transport.clone();
        let email = self.email.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.deliver(&email, &message).await {
                tracing::warn!(error = %e, "Failed to send registration alert");
            }
        });
    }
}
