//! Mail provider trait definition.
//!
//! This module defines the [`MailProvider`] trait which abstracts over the
//! webmail backend (Gmail API today). The detection, composition, and
//! dispatch services only ever talk to this seam, so a different provider
//! can be substituted without touching their logic.

use async_trait::async_trait;

use crate::domain::{AuthContext, EmailId, FetchedMessage, RawMessage, ThreadId};

/// Result type alias for mail provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during mail provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider rejected the credential.
    #[error("authentication rejected: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The send endpoint returned a non-success response; carries the
    /// provider's raw error body.
    #[error("send rejected ({status}): {body}")]
    Send {
        /// HTTP status code of the rejection.
        status: u16,
        /// Raw error body text from the provider.
        body: String,
    },

    /// Anything else: unexpected response shapes, API errors.
    #[error("provider error: {0}")]
    Internal(String),
}

/// Trait for webmail provider implementations.
///
/// Every method takes the resolved [`AuthContext`] as a capability; the
/// provider itself holds no credential state. All network operations are
/// suspension points with no timeout set here; timeout and retry policy
/// belong to the transport layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Searches for messages matching a provider query string.
    ///
    /// # Arguments
    ///
    /// * `query` - Query in the provider's search language
    /// * `max_results` - Bound on the number of message ids returned
    ///
    /// # Returns
    ///
    /// Message ids in the provider's result order.
    async fn search(
        &self,
        ctx: &AuthContext,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<EmailId>>;

    /// Fetches a message's threading identifiers and header set.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] if the message does not exist.
    async fn fetch_message(&self, ctx: &AuthContext, id: &EmailId) -> Result<FetchedMessage>;

    /// Submits a rendered raw message for delivery.
    ///
    /// # Arguments
    ///
    /// * `raw` - RFC 5322 message text; the provider applies its own
    ///   transport encoding
    /// * `thread_id` - Thread to deliver into, for replies
    ///
    /// # Returns
    ///
    /// The message id assigned by the provider.
    async fn send<'a>(
        &self,
        ctx: &AuthContext,
        raw: &RawMessage,
        thread_id: Option<&'a ThreadId>,
    ) -> Result<EmailId>;
}
