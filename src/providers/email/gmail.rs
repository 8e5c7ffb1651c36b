//! Gmail API provider implementation.
//!
//! This module provides the [`MailProvider`] implementation over the Gmail
//! REST API, plus the [`TokenBroker`] implementation that turns a stored
//! OAuth refresh token into usable bearer credentials.
//!
//! # API Usage
//!
//! Gmail API v1:
//! - `users.messages.list` with a `q` query for the dated search window
//! - `users.messages.get` with `format=full` for header sets and thread ids
//! - `users.messages.send` with a base64url raw envelope for delivery
//! - `users.getProfile` for the authenticated user's own address
//!
//! # Authentication
//!
//! OAuth client credentials (client id/secret + refresh token) are stored in
//! the system keychain. [`GoogleTokenBroker`] exchanges the refresh token at
//! the Google token endpoint and reports the token's expiry so the caller
//! can cache it.

use async_trait::async_trait;
use base64::prelude::*;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{MailProvider, ProviderError, Result};
use crate::domain::{
    AuthContext, BearerToken, EmailId, FetchedMessage, MessageHeaders, NormalizedEmail,
    RawMessage, ThreadId,
};
use crate::services::{AuthError, AuthResult, IssuedToken, TokenBroker};
use crate::storage::KeychainAccess;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Gmail API message list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    messages: Option<Vec<MessageRef>>,
    #[allow(dead_code)]
    next_page_token: Option<String>,
    #[allow(dead_code)]
    result_size_estimate: Option<u32>,
}

/// Gmail API message reference (id + thread id only).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRef {
    id: String,
    #[allow(dead_code)]
    thread_id: Option<String>,
}

/// Gmail API message as returned by `messages.get`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    thread_id: String,
    payload: Option<GmailPayload>,
}

/// Gmail message payload; only the headers matter here.
#[derive(Debug, Deserialize)]
struct GmailPayload {
    headers: Option<Vec<GmailHeader>>,
}

/// Gmail message header.
#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

/// Gmail send request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<&'a str>,
}

/// Gmail send response.
#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// OAuth token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[allow(dead_code)]
    token_type: String,
}

/// Gmail profile response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    email_address: String,
}

/// OAuth client credentials stored in the keychain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleCredentials {
    /// OAuth refresh token.
    pub refresh_token: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

/// Gmail API provider.
///
/// Stateless apart from the shared HTTP client; every call takes the
/// resolved [`AuthContext`] as a capability.
pub struct GmailProvider {
    /// HTTP client for API requests.
    client: reqwest::Client,
}

impl GmailProvider {
    /// Creates a new Gmail provider.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Makes an authenticated GET request to the Gmail API.
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        ctx: &AuthContext,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(ctx.token().as_str())
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        Self::handle_response(response).await
    }

    /// Handles API response, checking for errors.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }

    /// Handles API error responses.
    async fn handle_error(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => ProviderError::Authentication(format!("unauthorized: {}", body)),
            404 => ProviderError::NotFound(body),
            _ => ProviderError::Internal(format!("API error ({}): {}", status, body)),
        }
    }

    /// Converts a fetched Gmail message into the domain shape.
    fn to_fetched(message: GmailMessage) -> FetchedMessage {
        let headers = message
            .payload
            .and_then(|p| p.headers)
            .map(|headers| MessageHeaders::from_pairs(headers.into_iter().map(|h| (h.name, h.value))))
            .unwrap_or_default();

        FetchedMessage {
            id: EmailId(message.id),
            thread_id: ThreadId(message.thread_id),
            headers,
        }
    }
}

impl Default for GmailProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailProvider for GmailProvider {
    async fn search(
        &self,
        ctx: &AuthContext,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<EmailId>> {
        let url = format!("{}/messages", GMAIL_API_BASE);
        let max = max_results.to_string();
        let response: MessageListResponse =
            self.get(ctx, &url, &[("q", query), ("maxResults", &max)]).await?;

        let ids: Vec<EmailId> = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| EmailId(m.id))
            .collect();

        tracing::debug!(query, count = ids.len(), "Gmail search completed");
        Ok(ids)
    }

    async fn fetch_message(&self, ctx: &AuthContext, id: &EmailId) -> Result<FetchedMessage> {
        let url = format!("{}/messages/{}", GMAIL_API_BASE, id);
        let message: GmailMessage = self.get(ctx, &url, &[("format", "full")]).await?;
        Ok(Self::to_fetched(message))
    }

    async fn send<'a>(
        &self,
        ctx: &AuthContext,
        raw: &RawMessage,
        thread_id: Option<&'a ThreadId>,
    ) -> Result<EmailId> {
        let url = format!("{}/messages/send", GMAIL_API_BASE);
        let body = SendRequest {
            raw: BASE64_URL_SAFE_NO_PAD.encode(raw.as_str()),
            thread_id: thread_id.map(|t| t.0.as_str()),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(ctx.token().as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Send { status, body });
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse send response: {}", e)))?;

        tracing::info!(message_id = %sent.id, "Email sent via Gmail API");
        Ok(EmailId(sent.id))
    }
}

/// Token broker backed by Google's OAuth token endpoint.
///
/// Loads the stored client credentials from the keychain, exchanges the
/// refresh token for an access token, and resolves the user's own address
/// from the Gmail profile endpoint.
pub struct GoogleTokenBroker {
    client: reqwest::Client,
    keychain: KeychainAccess,
    account: String,
}

impl GoogleTokenBroker {
    /// Creates a broker for the given account label.
    pub fn new(keychain: KeychainAccess, account: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            keychain,
            account: account.into(),
        }
    }

    /// Saves client credentials to the keychain for later refreshes.
    pub async fn save_credentials(&self, credentials: &GoogleCredentials) -> AuthResult<()> {
        let key = KeychainAccess::oauth_credentials_key(&self.account);
        let json = serde_json::to_string(credentials)
            .map_err(|e| AuthError::TokenUnavailable(format!("serialize credentials: {}", e)))?;
        self.keychain
            .store(&key, &json)
            .await
            .map_err(|e| AuthError::TokenUnavailable(format!("keychain error: {}", e)))
    }

    /// Loads the stored client credentials from the keychain.
    async fn load_credentials(&self) -> AuthResult<GoogleCredentials> {
        let key = KeychainAccess::oauth_credentials_key(&self.account);
        let json = self
            .keychain
            .retrieve(&key)
            .await
            .map_err(|e| AuthError::TokenUnavailable(format!("keychain error: {}", e)))?
            .ok_or_else(|| {
                AuthError::TokenUnavailable(format!(
                    "no stored credentials for account {}",
                    self.account
                ))
            })?;

        serde_json::from_str(&json)
            .map_err(|e| AuthError::TokenUnavailable(format!("invalid stored credentials: {}", e)))
    }
}

#[async_trait]
impl TokenBroker for GoogleTokenBroker {
    async fn fetch_token(&self) -> AuthResult<IssuedToken> {
        let credentials = self.load_credentials().await?;

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenUnavailable(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenUnavailable(format!("parse token response: {}", e)))?;

        Ok(IssuedToken {
            token: BearerToken::new(token.access_token),
            expires_at: Utc::now() + Duration::seconds(token.expires_in as i64),
        })
    }

    async fn fetch_user_email(&self, token: &BearerToken) -> AuthResult<NormalizedEmail> {
        let url = format!("{}/profile", GMAIL_API_BASE);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| AuthError::ProfileLookup(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ProfileLookup(format!(
                "profile request failed ({}): {}",
                status, body
            )));
        }

        let profile: ProfileResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ProfileLookup(format!("parse profile response: {}", e)))?;

        Ok(NormalizedEmail::new(profile.email_address))
    }
}
