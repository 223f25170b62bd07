#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod events;
pub mod models;
pub mod node;
pub mod notification;
pub mod processors;
pub mod registry;

pub use registry::{RegistrationError, WatchRegistry};
