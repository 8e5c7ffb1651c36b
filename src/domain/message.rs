//! Message domain types.
//!
//! Covers both directions of the wire: the header subset pulled off a
//! fetched message, and the composed outbound message rendered into the
//! provider's raw envelope.

use serde::{Deserialize, Serialize};

use super::{EmailId, MessageId, ThreadId};

/// Placeholder shown (and replied with) when a message carries no Subject
/// header.
pub const NO_SUBJECT: &str = "(no subject)";

/// The subset of headers relevant to detection and threading.
///
/// Produced once per fetched message and not modified afterwards. Header
/// values are kept raw; address extraction happens at the point of use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageHeaders {
    /// Raw From header value.
    pub from: Option<String>,
    /// Raw To header value.
    pub to: Option<String>,
    /// Raw Subject header value.
    pub subject: Option<String>,
    /// RFC 5322 Message-ID header value.
    pub message_id: Option<MessageId>,
    /// Raw References header value (whitespace-separated Message-IDs).
    pub references: Option<String>,
}

impl MessageHeaders {
    /// Collects the relevant headers from `(name, value)` pairs.
    ///
    /// Header names are matched case-insensitively; the first occurrence of
    /// each name wins.
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<String>,
    {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_ref() {
                n if n.eq_ignore_ascii_case("From") => &mut headers.from,
                n if n.eq_ignore_ascii_case("To") => &mut headers.to,
                n if n.eq_ignore_ascii_case("Subject") => &mut headers.subject,
                n if n.eq_ignore_ascii_case("References") => &mut headers.references,
                n if n.eq_ignore_ascii_case("Message-ID") => {
                    if headers.message_id.is_none() {
                        headers.message_id = Some(MessageId(value.into()));
                    }
                    continue;
                }
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        headers
    }
}

/// A message fetched from the provider: identifiers plus its header set.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    /// Provider-assigned message id.
    pub id: EmailId,
    /// Thread the message belongs to.
    pub thread_id: ThreadId,
    /// Headers relevant to detection and threading.
    pub headers: MessageHeaders,
}

/// Threading headers for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Threading {
    /// Message-ID of the message being replied to.
    pub in_reply_to: MessageId,
    /// Chained References value, ending in `in_reply_to`.
    pub references: String,
}

/// A fully formed outbound message, ready to render for transport.
///
/// Transient: built by the composer and consumed by a single send.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    /// Rendered To header value.
    pub to: String,
    /// Rendered Subject header value.
    pub subject: String,
    /// Threading headers; present only for replies.
    pub threading: Option<Threading>,
    /// Plain text body.
    pub body: String,
}

impl ComposedMessage {
    /// Renders the message into the raw RFC 5322 text the provider accepts:
    /// CRLF-separated headers, a blank line, then the body. The sender is
    /// stamped by the provider from the authenticated account, so no From
    /// header is written.
    pub fn render(&self) -> RawMessage {
        let mut out = String::new();
        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        if let Some(threading) = &self.threading {
            out.push_str(&format!("In-Reply-To: {}\r\n", threading.in_reply_to));
            out.push_str(&format!("References: {}\r\n", threading.references));
        }
        out.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
        out.push_str("\r\n");
        out.push_str(&self.body);
        RawMessage(out)
    }
}

/// RFC 5322 message text ready for the transport encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage(pub String);

impl RawMessage {
    /// Returns the raw text as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn from_pairs_collects_relevant_headers() {
        let headers = MessageHeaders::from_pairs([
            ("From", "Alice <alice@example.com>"),
            ("To", "bob@example.com"),
            ("Subject", "Hello"),
            ("Message-ID", "<m1@example.com>"),
            ("References", "<m0@example.com>"),
            ("Date", "Mon, 1 Jan 2024 00:00:00 +0000"),
        ]);

        assert_eq!(headers.from.as_deref(), Some("Alice <alice@example.com>"));
        assert_eq!(headers.to.as_deref(), Some("bob@example.com"));
        assert_eq!(headers.subject.as_deref(), Some("Hello"));
        assert_eq!(headers.message_id, Some(MessageId::from("<m1@example.com>")));
        assert_eq!(headers.references.as_deref(), Some("<m0@example.com>"));
    }

    #[test]
    fn from_pairs_is_case_insensitive() {
        let headers = MessageHeaders::from_pairs([("FROM", "a@b.com"), ("to", "c@d.com")]);
        assert_eq!(headers.from.as_deref(), Some("a@b.com"));
        assert_eq!(headers.to.as_deref(), Some("c@d.com"));
    }

    #[test]
    fn from_pairs_first_occurrence_wins() {
        let headers = MessageHeaders::from_pairs([("Subject", "first"), ("Subject", "second")]);
        assert_eq!(headers.subject.as_deref(), Some("first"));
    }

    #[test]
    fn render_without_threading() {
        let message = ComposedMessage {
            to: "a@x.com, u@x.com".to_string(),
            subject: "Hi".to_string(),
            threading: None,
            body: "Body".to_string(),
        };

        let raw = message.render();
        assert_eq!(
            raw.as_str(),
            "To: a@x.com, u@x.com\r\n\
             Subject: Hi\r\n\
             Content-Type: text/plain; charset=\"UTF-8\"\r\n\
             \r\n\
             Body"
        );
    }

    #[test]
    fn render_with_threading() {
        let message = ComposedMessage {
            to: "a@x.com".to_string(),
            subject: "Re: Hi".to_string(),
            threading: Some(Threading {
                in_reply_to: MessageId::from("<x@example.com>"),
                references: "<a@example.com> <x@example.com>".to_string(),
            }),
            body: "Reply".to_string(),
        };

        let raw = message.render();
        assert!(raw.as_str().contains("In-Reply-To: <x@example.com>\r\n"));
        assert!(raw
            .as_str()
            .contains("References: <a@example.com> <x@example.com>\r\n"));
        // Headers end with a blank line before the body.
        assert!(raw.as_str().contains("\r\n\r\nReply"));
    }
}
