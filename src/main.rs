//! courier - host binary for the extension UI.
//!
//! Speaks a one-shot request/response protocol: one JSON request on
//! stdin, one JSON result on stdout. Logs go to stderr so stdout stays a
//! clean response channel.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use courier::config::Settings;
use courier::providers::email::{GmailProvider, GoogleTokenBroker};
use courier::services::{Authenticator, Dispatcher, Request, Response};
use courier::storage::{JsonListStore, KeychainAccess};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load();

    let lists_path = settings
        .storage
        .lists_file
        .clone()
        .or_else(JsonListStore::default_path)
        .context("no data directory available for the list store")?;
    let lists = Arc::new(JsonListStore::new(lists_path));

    let broker = Arc::new(GoogleTokenBroker::new(
        KeychainAccess::new(),
        settings.auth.account.clone(),
    ));
    let auth = Arc::new(Authenticator::new(
        broker,
        chrono::Duration::seconds(settings.auth.clock_skew_secs as i64),
    ));
    let provider = Arc::new(GmailProvider::new());

    let dispatcher = Dispatcher::new(lists, provider, auth, settings.detection.page_size);

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("failed to read request from stdin")?;

    let response = match serde_json::from_str::<Request>(&input) {
        Ok(request) => match dispatcher.handle(request).await {
            Ok(outcome) => Response::from(outcome),
            Err(e) => {
                tracing::error!(error = %e, "request failed");
                Response::error(e.to_string())
            }
        },
        Err(e) => Response::error(format!("malformed request: {}", e)),
    };

    let json = serde_json::to_string(&response).context("serialize response")?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(json.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    Ok(())
}
