//! Credential and contact-list storage.
//!
//! This module provides the persistence collaborators the sending core
//! reads from:
//!
//! - OS keychain integration for the stored OAuth client credentials
//! - The contact-list store seam and its JSON file implementation

mod keychain;
mod list_store;

pub use keychain::{KeychainAccess, KeychainError};
pub use list_store::{JsonListStore, ListStore, StoreError, StoreResult};

#[cfg(test)]
pub use list_store::MockListStore;
