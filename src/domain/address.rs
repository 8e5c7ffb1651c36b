//! Email address normalization and header extraction.
//!
//! Address headers arrive as raw comma-separated strings, each entry
//! optionally wrapped in a display name (`Jane Doe <jane@example.com>`).
//! Everything downstream (membership checks, self-CC, reply targets)
//! compares addresses through [`NormalizedEmail`], so extraction and
//! normalization live together here.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Bare `local@domain.tld`-shaped token.
static BARE_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("bare-address pattern compiles"));

/// A lower-cased, trimmed email address.
///
/// This is the canonical comparison key for all membership checks. The
/// inner string is never exposed mutably, so a constructed value stays
/// normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NormalizedEmail(String);

impl NormalizedEmail {
    /// Normalizes a raw address: trims surrounding whitespace and lower-cases.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// Returns the normalized address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NormalizedEmail {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for NormalizedEmail {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<NormalizedEmail> for String {
    fn from(email: NormalizedEmail) -> Self {
        email.0
    }
}

/// Extracts the ordered sequence of normalized addresses from a raw
/// address-header value.
///
/// Each comma-separated entry is resolved in priority order: the substring
/// inside angle brackets if present, else the first bare address token,
/// else the trimmed entry text as-is. Empty entries are dropped. An empty
/// header yields an empty sequence, never an error.
///
/// The final fallback is best-effort: an entry that matches neither pattern
/// surfaces as trimmed lower-cased text, which can miss membership checks
/// for badly mangled headers. That mirrors how such entries behave upstream
/// and is intentionally left as-is.
pub fn extract_addresses(header: &str) -> Vec<NormalizedEmail> {
    header
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            let addr = angle_bracketed(entry)
                .or_else(|| BARE_ADDRESS.find(entry).map(|m| m.as_str()))
                .unwrap_or(entry)
                .trim();
            if addr.is_empty() {
                None
            } else {
                Some(NormalizedEmail::new(addr))
            }
        })
        .collect()
}

/// Returns the non-empty substring inside the first `<...>` pair, if any.
fn angle_bracketed(entry: &str) -> Option<&str> {
    let start = entry.find('<')?;
    let rest = &entry[start + 1..];
    let end = rest.find('>')?;
    let inner = &rest[..end];
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn emails(header: &str) -> Vec<String> {
        extract_addresses(header)
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn normalization_lowercases_and_trims() {
        let email = NormalizedEmail::new("  Alice@Example.COM ");
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn display_name_and_bare_entries() {
        assert_eq!(
            emails("Name <a@b.com>, c@d.com"),
            vec!["a@b.com".to_string(), "c@d.com".to_string()]
        );
    }

    #[test]
    fn uppercase_addresses_are_lowered() {
        assert_eq!(
            emails("Jane <JANE@CO.COM>, BOB@CO.COM"),
            vec!["jane@co.com".to_string(), "bob@co.com".to_string()]
        );
    }

    #[test]
    fn empty_header_yields_empty_sequence() {
        assert!(extract_addresses("").is_empty());
    }

    #[test]
    fn blank_entries_are_dropped() {
        assert_eq!(
            emails("a@b.com, , c@d.com,"),
            vec!["a@b.com".to_string(), "c@d.com".to_string()]
        );
    }

    #[test]
    fn bare_token_inside_display_text() {
        // No angle brackets, but an address embedded in surrounding text.
        assert_eq!(emails("reply to bob@co.com please"), vec!["bob@co.com".to_string()]);
    }

    #[test]
    fn unparsable_entry_falls_back_to_trimmed_text() {
        assert_eq!(emails(" not-an-address "), vec!["not-an-address".to_string()]);
    }

    #[test]
    fn empty_angle_brackets_fall_through() {
        assert_eq!(emails("Nobody <>"), vec!["nobody <>".to_string()]);
    }

    #[test]
    fn order_is_preserved() {
        assert_eq!(
            emails("z@z.com, A <a@a.com>, m@m.com"),
            vec!["z@z.com".to_string(), "a@a.com".to_string(), "m@m.com".to_string()]
        );
    }

    #[test]
    fn serde_round_trip_normalizes() {
        let email: NormalizedEmail = serde_json::from_str("\"Mixed@Case.Com\"").unwrap();
        assert_eq!(email.as_str(), "mixed@case.com");
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"mixed@case.com\"");
    }
}
