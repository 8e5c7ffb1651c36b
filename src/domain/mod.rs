//! Domain layer types for the courier sending core.
//!
//! This module contains the core domain types used throughout the crate:
//! contact lists, normalized addresses, message headers, and composed
//! outbound messages.

mod address;
mod auth;
mod list;
mod message;
mod types;

pub use address::{extract_addresses, NormalizedEmail};
pub use auth::{AuthContext, BearerToken};
pub use list::ContactList;
pub use message::{
    ComposedMessage, FetchedMessage, MessageHeaders, RawMessage, Threading, NO_SUBJECT,
};
pub use types::{EmailId, ListId, MessageId, ThreadId};
