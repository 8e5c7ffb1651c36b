//! Contact list domain type.
//!
//! A contact list is a named set of recipient addresses saved by the user.
//! Lists are owned by the persistence layer; the sending core only reads
//! them.

use serde::{Deserialize, Serialize};

use super::{ListId, NormalizedEmail};

/// A saved contact list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactList {
    /// Unique identifier for this list.
    pub id: ListId,
    /// User-visible list name.
    pub name: String,
    /// Member addresses, in the order the user entered them.
    pub emails: Vec<NormalizedEmail>,
}

impl ContactList {
    /// Creates a new list with a generated id.
    pub fn new(name: impl Into<String>, emails: Vec<NormalizedEmail>) -> Self {
        Self {
            id: ListId(uuid::Uuid::new_v4().to_string()),
            name: name.into(),
            emails,
        }
    }

    /// Returns whether the list has no members.
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
