//! Wire types for txnotify.
//!
//! Shared between the server, API clients and the receivers of
//! callback and chat webhooks.

pub mod objects;
