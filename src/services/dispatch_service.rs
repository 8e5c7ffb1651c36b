//! Request dispatch: detection, composition, and send, wired together.
//!
//! The [`Dispatcher`] is the entry point the UI layer talks to. Each
//! request is independent and stateless across invocations; the only
//! shared state is the cached authentication context inside
//! [`Authenticator`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::auth_service::{AuthError, Authenticator};
use super::compose_service::{compose_reply, compose_to_list, ComposeError};
use super::detection_service::{Detection, DetectionError, Detector, SentMessage};
use crate::domain::{EmailId, ListId};
use crate::providers::email::{MailProvider, ProviderError};
use crate::storage::{ListStore, StoreError};

/// Errors that can abort a dispatch request.
///
/// Every variant surfaces to the caller as a single error message; nothing
/// here is retried.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The requested list does not exist or has no members.
    #[error("no recipients found for list {0}")]
    ListNotFound(ListId),

    /// No usable authentication context.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The list store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Detection failed outright.
    #[error(transparent)]
    Detection(#[from] DetectionError),

    /// Reply composition failed.
    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// The original message for a reply could not be fetched.
    #[error("failed to fetch original message: {0}")]
    Fetch(#[source] ProviderError),

    /// The provider rejected the delivery.
    #[error("send failed: {0}")]
    Send(#[source] ProviderError),
}

/// A request from the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Send a message to a saved contact list, unless one was already
    /// exchanged today.
    #[serde(rename_all = "camelCase")]
    SendToList {
        /// The list to send to.
        list_id: ListId,
        /// Subject line for the fresh message.
        subject: String,
        /// Plain text body.
        body: String,
    },
    /// Reply within the thread of an existing message.
    #[serde(rename_all = "camelCase")]
    ReplyToEmail {
        /// Provider id of the message being replied to.
        message_id: EmailId,
        /// Plain text reply body.
        reply_body: String,
    },
}

/// Terminal outcome of a successful dispatch.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The message went out.
    Sent {
        /// Provider-assigned id of the sent message.
        message_id: EmailId,
    },
    /// A qualifying message already exists today; nothing was sent. The
    /// caller decides whether to reply instead.
    AlreadySent(SentMessage),
}

/// The serialized result surface handed back to the UI layer.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// The message went out.
    Sent {
        /// Always `true`.
        sent: bool,
    },
    /// A qualifying message already exists; the found message's display
    /// headers and id let the UI offer a reply.
    AlreadySent {
        /// Always `true`.
        #[serde(rename = "alreadySent")]
        already_sent: bool,
        /// Subject of the found message.
        subject: String,
        /// Raw From header of the found message.
        sender: String,
        /// Raw To header of the found message.
        to: String,
        /// Provider id of the found message.
        #[serde(rename = "messageId")]
        message_id: EmailId,
    },
    /// The request failed.
    Error {
        /// Human-readable failure description.
        error: String,
    },
}

impl Response {
    /// Builds the error response for a failed request.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

impl From<DispatchOutcome> for Response {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Sent { .. } => Self::Sent { sent: true },
            DispatchOutcome::AlreadySent(found) => Self::AlreadySent {
                already_sent: true,
                subject: found.subject,
                sender: found.sender,
                to: found.to,
                message_id: found.message_id,
            },
        }
    }
}

/// Orchestrates detection, composition, and delivery for one request at a
/// time.
pub struct Dispatcher {
    lists: Arc<dyn ListStore>,
    provider: Arc<dyn MailProvider>,
    auth: Arc<Authenticator>,
    detector: Detector,
}

impl Dispatcher {
    /// Creates a dispatcher over the given collaborators.
    ///
    /// `page_size` bounds the detection candidate scan.
    pub fn new(
        lists: Arc<dyn ListStore>,
        provider: Arc<dyn MailProvider>,
        auth: Arc<Authenticator>,
        page_size: u32,
    ) -> Self {
        let detector = Detector::new(Arc::clone(&provider), page_size);
        Self {
            lists,
            provider,
            auth,
            detector,
        }
    }

    /// Handles a deserialized UI request.
    pub async fn handle(&self, request: Request) -> Result<DispatchOutcome, DispatchError> {
        match request {
            Request::SendToList {
                list_id,
                subject,
                body,
            } => self.send_to_list(&list_id, &subject, &body).await,
            Request::ReplyToEmail {
                message_id,
                reply_body,
            } => self.reply_to_email(&message_id, &reply_body).await,
        }
    }

    /// Sends a fresh message to a list, unless a qualifying message was
    /// already exchanged today, in which case the found message is
    /// surfaced and nothing is sent.
    pub async fn send_to_list(
        &self,
        list_id: &ListId,
        subject: &str,
        body: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        let list = self
            .lists
            .get_lists()
            .await?
            .into_iter()
            .find(|l| &l.id == list_id)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| DispatchError::ListNotFound(list_id.clone()))?;

        let ctx = self.auth.context().await?;

        match self.detector.already_sent_today(&ctx, &list.emails).await? {
            Detection::Found(found) => {
                tracing::info!(
                    list = %list.name,
                    message_id = %found.message_id,
                    "qualifying message already exchanged today, offering reply"
                );
                Ok(DispatchOutcome::AlreadySent(found))
            }
            Detection::NotFound => {
                let composed = compose_to_list(&list.emails, ctx.user_email(), subject, body);
                let message_id = self
                    .provider
                    .send(&ctx, &composed.render(), None)
                    .await
                    .map_err(DispatchError::Send)?;
                tracing::info!(list = %list.name, %message_id, "list message sent");
                Ok(DispatchOutcome::Sent { message_id })
            }
        }
    }

    /// Replies within the thread of an existing message.
    pub async fn reply_to_email(
        &self,
        message_id: &EmailId,
        reply_body: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        let ctx = self.auth.context().await?;

        let original = self
            .provider
            .fetch_message(&ctx, message_id)
            .await
            .map_err(DispatchError::Fetch)?;

        let composed = compose_reply(&original, reply_body)?;
        let sent_id = self
            .provider
            .send(&ctx, &composed.render(), Some(&original.thread_id))
            .await
            .map_err(DispatchError::Send)?;

        tracing::info!(original = %message_id, sent = %sent_id, "reply sent");
        Ok(DispatchOutcome::Sent {
            message_id: sent_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::domain::{
        BearerToken, ContactList, FetchedMessage, MessageHeaders, NormalizedEmail, ThreadId,
    };
    use crate::providers::email::MockMailProvider;
    use crate::services::auth_service::{IssuedToken, MockTokenBroker};
    use crate::storage::MockListStore;

    fn broker() -> MockTokenBroker {
        let mut broker = MockTokenBroker::new();
        broker.expect_fetch_token().returning(|| {
            Ok(IssuedToken {
                token: BearerToken::new("token"),
                expires_at: Utc::now() + Duration::hours(1),
            })
        });
        broker
            .expect_fetch_user_email()
            .returning(|_| Ok(NormalizedEmail::new("me@co.com")));
        broker
    }

    fn sales_list() -> ContactList {
        ContactList {
            id: ListId::from("sales"),
            name: "Sales".to_string(),
            emails: vec![NormalizedEmail::new("p@co.com")],
        }
    }

    fn dispatcher(lists: MockListStore, provider: MockMailProvider) -> Dispatcher {
        let auth = Arc::new(Authenticator::new(
            Arc::new(broker()),
            Duration::seconds(60),
        ));
        Dispatcher::new(Arc::new(lists), Arc::new(provider), auth, 10)
    }

    #[tokio::test]
    async fn unknown_list_is_rejected() {
        let mut lists = MockListStore::new();
        lists.expect_get_lists().returning(|| Ok(vec![]));
        let mut provider = MockMailProvider::new();
        provider.expect_search().never();
        provider.expect_send().never();

        let dispatcher = dispatcher(lists, provider);
        let err = dispatcher
            .send_to_list(&ListId::from("sales"), "Hi", "Body")
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::ListNotFound(_)));
    }

    #[tokio::test]
    async fn memberless_list_is_rejected() {
        let mut lists = MockListStore::new();
        lists.expect_get_lists().returning(|| {
            Ok(vec![ContactList {
                id: ListId::from("sales"),
                name: "Sales".to_string(),
                emails: vec![],
            }])
        });
        let provider = MockMailProvider::new();

        let dispatcher = dispatcher(lists, provider);
        let err = dispatcher
            .send_to_list(&ListId::from("sales"), "Hi", "Body")
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::ListNotFound(_)));
    }

    #[tokio::test]
    async fn fresh_send_includes_self_copy() {
        let mut lists = MockListStore::new();
        lists.expect_get_lists().returning(|| Ok(vec![sales_list()]));

        let mut provider = MockMailProvider::new();
        provider.expect_search().returning(|_, _, _| Ok(vec![]));
        provider
            .expect_send()
            .times(1)
            .withf(|_, raw, thread_id| {
                raw.as_str().starts_with("To: p@co.com, me@co.com\r\n") && thread_id.is_none()
            })
            .returning(|_, _, _| Ok(EmailId::from("sent-1")));

        let dispatcher = dispatcher(lists, provider);
        let outcome = dispatcher
            .send_to_list(&ListId::from("sales"), "Hi", "Body")
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn detection_hit_suppresses_send() {
        let mut lists = MockListStore::new();
        lists.expect_get_lists().returning(|| Ok(vec![sales_list()]));

        let mut provider = MockMailProvider::new();
        provider
            .expect_search()
            .returning(|_, _, _| Ok(vec![EmailId::from("m1")]));
        provider.expect_fetch_message().returning(|_, _| {
            Ok(FetchedMessage {
                id: EmailId::from("m1"),
                thread_id: ThreadId::from("t1"),
                headers: MessageHeaders::from_pairs([
                    ("From", "Paula <p@co.com>"),
                    ("To", "me@co.com"),
                    ("Subject", "Status"),
                ]),
            })
        });
        provider.expect_send().never();

        let dispatcher = dispatcher(lists, provider);
        let outcome = dispatcher
            .send_to_list(&ListId::from("sales"), "Hi", "Body")
            .await
            .unwrap();

        match outcome {
            DispatchOutcome::AlreadySent(found) => {
                assert_eq!(found.message_id, EmailId::from("m1"));
                assert_eq!(found.subject, "Status");
            }
            DispatchOutcome::Sent { .. } => panic!("expected the send to be suppressed"),
        }
    }

    #[tokio::test]
    async fn reply_is_sent_within_original_thread() {
        let lists = MockListStore::new();

        let mut provider = MockMailProvider::new();
        provider.expect_fetch_message().returning(|_, _| {
            Ok(FetchedMessage {
                id: EmailId::from("orig-1"),
                thread_id: ThreadId::from("thread-7"),
                headers: MessageHeaders::from_pairs([
                    ("From", "Paula <p@co.com>"),
                    ("To", "p@co.com, me@co.com"),
                    ("Subject", "Status"),
                    ("Message-ID", "<X>"),
                ]),
            })
        });
        provider
            .expect_send()
            .times(1)
            .withf(|_, raw, thread_id| {
                raw.as_str().contains("In-Reply-To: <X>\r\n")
                    && raw.as_str().contains("Subject: Re: Status\r\n")
                    && *thread_id == Some(&ThreadId::from("thread-7"))
            })
            .returning(|_, _, _| Ok(EmailId::from("sent-2")));

        let dispatcher = dispatcher(lists, provider);
        let outcome = dispatcher
            .reply_to_email(&EmailId::from("orig-1"), "Thanks!")
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn send_rejection_carries_provider_error() {
        let mut lists = MockListStore::new();
        lists.expect_get_lists().returning(|| Ok(vec![sales_list()]));

        let mut provider = MockMailProvider::new();
        provider.expect_search().returning(|_, _, _| Ok(vec![]));
        provider.expect_send().returning(|_, _, _| {
            Err(ProviderError::Send {
                status: 403,
                body: "quota exceeded".to_string(),
            })
        });

        let dispatcher = dispatcher(lists, provider);
        let err = dispatcher
            .send_to_list(&ListId::from("sales"), "Hi", "Body")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn request_wire_shapes() {
        let json = r#"{"action":"sendToList","listId":"sales","subject":"Hi","body":"Body"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(request, Request::SendToList { .. }));

        let json = r#"{"action":"replyToEmail","messageId":"m1","replyBody":"Thanks"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(request, Request::ReplyToEmail { .. }));
    }

    #[test]
    fn response_wire_shapes() {
        let sent = Response::from(DispatchOutcome::Sent {
            message_id: EmailId::from("sent-1"),
        });
        assert_eq!(serde_json::to_string(&sent).unwrap(), r#"{"sent":true}"#);

        let already = Response::from(DispatchOutcome::AlreadySent(SentMessage {
            subject: "Status".to_string(),
            sender: "Paula <p@co.com>".to_string(),
            to: "me@co.com".to_string(),
            message_id: EmailId::from("m1"),
        }));
        let json = serde_json::to_string(&already).unwrap();
        assert!(json.contains(r#""alreadySent":true"#));
        assert!(json.contains(r#""messageId":"m1""#));

        let error = Response::error("Auth failed");
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"error":"Auth failed"}"#
        );
    }
}
