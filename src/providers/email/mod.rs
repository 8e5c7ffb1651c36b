//! Webmail provider implementations.
//!
//! This module contains the [`MailProvider`] trait and its Gmail API
//! implementation. The trait is the seam the detection and dispatch
//! services depend on; the rest of this module is the wire-level Gmail
//! plumbing:
//!
//! - [`GmailProvider`] - search, header fetch, and raw-message send
//! - [`GoogleTokenBroker`] - refresh-token exchange and profile lookup

mod gmail;
mod traits;

pub use gmail::{GmailProvider, GoogleCredentials, GoogleTokenBroker};
pub use traits::{MailProvider, ProviderError, Result};

#[cfg(test)]
pub use traits::MockMailProvider;
