//! Notification rendering and delivery.

pub mod dispatcher;
pub mod message;
pub mod smtp;
pub mod transport;

pub use dispatcher::{DeliveryStatus, DispatchReport, NotificationDispatcher};
pub use message::{Channel, RenderedMessage, registration_alert, render};
pub use smtp::{SmtpConfig, SmtpMailer, SmtpSecurity};
pub use transport::{
    ChannelTransport, ChannelTransportConfig, DEFAULT_EMAIL_FROM, DeliveryError,
    NotificationTransport,
};
