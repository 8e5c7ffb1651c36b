//! Duplicate-send detection.
//!
//! Decides whether a contact list was already legitimately contacted today.
//! One bounded search over today's window produces candidate messages;
//! each candidate's headers are fetched in provider order and checked
//! against the membership policy, short-circuiting on the first match.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use thiserror::Error;

use crate::domain::{
    extract_addresses, AuthContext, EmailId, MessageHeaders, NormalizedEmail, NO_SUBJECT,
};
use crate::providers::email::{MailProvider, ProviderError};

/// Errors that can occur during detection.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The window search itself failed. Fatal to the whole detection; a
    /// failed search is never reported as "nothing found".
    #[error("message search failed: {0}")]
    SearchFailed(#[source] ProviderError),
}

/// Outcome of a detection scan.
#[derive(Debug, Clone)]
pub enum Detection {
    /// A qualifying message was exchanged with the list today.
    Found(SentMessage),
    /// No candidate in the scanned page qualified.
    NotFound,
}

/// The qualifying message, with its display headers kept raw for the
/// caller to surface in the reply offer.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Subject header, or the placeholder when absent.
    pub subject: String,
    /// Raw From header value.
    pub sender: String,
    /// Raw To header value.
    pub to: String,
    /// Provider id of the qualifying message.
    pub message_id: EmailId,
}

/// Scans today's messages for one that already counts as a send to the
/// list.
pub struct Detector {
    provider: Arc<dyn MailProvider>,
    page_size: u32,
}

impl Detector {
    /// Creates a detector over the given provider.
    ///
    /// `page_size` bounds how many candidates one detection considers. The
    /// bound trades completeness for cost: matches beyond it are missed,
    /// deliberately.
    pub fn new(provider: Arc<dyn MailProvider>, page_size: u32) -> Self {
        Self {
            provider,
            page_size,
        }
    }

    /// Determines whether the list was already contacted today.
    ///
    /// # Errors
    ///
    /// Returns [`DetectionError::SearchFailed`] if the window query fails.
    /// A failed per-candidate header fetch is non-fatal: the candidate is
    /// logged and skipped, and the scan continues.
    pub async fn already_sent_today(
        &self,
        ctx: &AuthContext,
        members: &[NormalizedEmail],
    ) -> Result<Detection, DetectionError> {
        let query = day_window_query(Utc::now().date_naive());
        let candidates = self
            .provider
            .search(ctx, &query, self.page_size)
            .await
            .map_err(DetectionError::SearchFailed)?;

        tracing::debug!(count = candidates.len(), "scanning window candidates");
        let member_set: HashSet<&NormalizedEmail> = members.iter().collect();

        for id in candidates {
            let message = match self.provider.fetch_message(ctx, &id).await {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(message_id = %id, error = %e, "skipping candidate: header fetch failed");
                    continue;
                }
            };

            if counts_as_sent(&message.headers, &member_set, ctx.user_email()) {
                let headers = message.headers;
                return Ok(Detection::Found(SentMessage {
                    subject: headers.subject.unwrap_or_else(|| NO_SUBJECT.to_string()),
                    sender: headers.from.unwrap_or_default(),
                    to: headers.to.unwrap_or_default(),
                    message_id: message.id,
                }));
            }
        }

        Ok(Detection::NotFound)
    }
}

/// Renders today's window in the provider's query language: start of today
/// inclusive, start of tomorrow exclusive, at day resolution.
fn day_window_query(today: NaiveDate) -> String {
    let tomorrow = today + Days::new(1);
    format!(
        "after:{} before:{}",
        today.format("%Y-%m-%d"),
        tomorrow.format("%Y-%m-%d")
    )
}

/// Membership policy: the sender must be a list member, the recipient set
/// must be non-empty, and every recipient must be a list member or the
/// authenticated user.
fn counts_as_sent(
    headers: &MessageHeaders,
    members: &HashSet<&NormalizedEmail>,
    user: &NormalizedEmail,
) -> bool {
    let senders = extract_addresses(headers.from.as_deref().unwrap_or_default());
    let Some(sender) = senders.first() else {
        return false;
    };
    if !members.contains(sender) {
        return false;
    }

    let recipients = extract_addresses(headers.to.as_deref().unwrap_or_default());
    if recipients.is_empty() {
        return false;
    }
    recipients.iter().all(|r| members.contains(r) || r == user)
}
