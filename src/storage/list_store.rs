//! Contact list persistence.
//!
//! The sending core only ever reads lists; editing them belongs to the
//! extension UI. [`ListStore`] is the read seam, and [`JsonListStore`] is
//! the shipped implementation: a JSON file of `{id, name, emails}` records
//! in the user's data directory.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ContactList;

/// Errors that can occur reading or writing the list store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access list store: {0}")]
    Io(#[from] io::Error),

    #[error("malformed list store: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result type for list store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read access to the saved contact lists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Returns all saved contact lists.
    async fn get_lists(&self) -> StoreResult<Vec<ContactList>>;
}

/// JSON file-backed list store.
#[derive(Debug, Clone)]
pub struct JsonListStore {
    path: PathBuf,
}

impl JsonListStore {
    /// Creates a store over the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the default list file location in the user's data directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "courier")
            .map(|dirs| dirs.data_dir().join("lists.json"))
    }

    /// Writes the full set of lists, creating parent directories as needed.
    ///
    /// Exposed for the editing surface; the sending core never calls this.
    pub async fn save_lists(&self, lists: &[ContactList]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(lists)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl ListStore for JsonListStore {
    async fn get_lists(&self) -> StoreResult<Vec<ContactList>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            // A store that was never written is just empty.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
