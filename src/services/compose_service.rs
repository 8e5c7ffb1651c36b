//! Message composition.
//!
//! Builds the outbound [`ComposedMessage`] for both operation modes: a
//! fresh send to a contact list, and a threaded reply to an existing
//! message. Composition is pure; fetching the original message and sending
//! the result belong to the caller.

use thiserror::Error;

use crate::domain::{
    extract_addresses, ComposedMessage, FetchedMessage, MessageId, NormalizedEmail, Threading,
    NO_SUBJECT,
};

/// Errors that can occur during composition.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The original message's From header yields no address, so there is
    /// nothing to reply to.
    #[error("could not extract a sender address from the original message")]
    NoSenderAddress,
}

/// Composes a fresh message to the list members.
///
/// The authenticated user's own address is appended to the recipients if
/// not already present, so the sender always receives a copy. Member order
/// is preserved. No threading headers are set.
pub fn compose_to_list(
    members: &[NormalizedEmail],
    user: &NormalizedEmail,
    subject: &str,
    body: &str,
) -> ComposedMessage {
    let mut recipients: Vec<&str> = members.iter().map(NormalizedEmail::as_str).collect();
    if !members.iter().any(|m| m == user) {
        recipients.push(user.as_str());
    }

    ComposedMessage {
        to: recipients.join(", "),
        subject: subject.to_string(),
        threading: None,
        body: body.to_string(),
    }
}

/// Composes a reply to a fetched original message.
///
/// Recipients are the original To header verbatim (reply to all); the
/// extracted sender address only gates composition. The subject gains a
/// `Re: ` prefix, falling back to the placeholder when the original has no
/// subject. In-Reply-To is the original Message-ID, or an identifier
/// synthesized from the provider message id when the header is absent;
/// References is the original chain with the in-reply-to value appended.
///
/// The caller sends the result inside `original.thread_id`.
///
/// # Errors
///
/// Returns [`ComposeError::NoSenderAddress`] if no address can be
/// extracted from the original From header.
pub fn compose_reply(original: &FetchedMessage, body: &str) -> Result<ComposedMessage, ComposeError> {
    let headers = &original.headers;

    let senders = extract_addresses(headers.from.as_deref().unwrap_or_default());
    if senders.is_empty() {
        return Err(ComposeError::NoSenderAddress);
    }

    let subject = format!(
        "Re: {}",
        headers.subject.as_deref().unwrap_or(NO_SUBJECT)
    );

    let in_reply_to = headers
        .message_id
        .clone()
        .unwrap_or_else(|| MessageId(format!("<{}>", original.id)));
    let references = match &headers.references {
        Some(prior) => format!("{} {}", prior, in_reply_to),
        None => in_reply_to.to_string(),
    };

    Ok(ComposedMessage {
        to: headers.to.clone().unwrap_or_default(),
        subject,
        threading: Some(Threading {
            in_reply_to,
            references,
        }),
        body: body.to_string(),
    })
}
