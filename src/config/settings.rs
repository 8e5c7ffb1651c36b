//! Application settings and configuration types.
//!
//! Settings are persisted to the user config directory as JSON and loaded
//! at startup. A missing or unreadable file falls back to defaults; every
//! field is optional in the file.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Duplicate-send detection tuning.
    pub detection: DetectionSettings,
    /// Authentication tuning.
    pub auth: AuthSettings,
    /// Storage locations.
    pub storage: StorageSettings,
}

/// Duplicate-send detection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Bound on the number of candidates one detection scan considers.
    /// Matches beyond the bound are missed; raising it trades latency for
    /// completeness.
    pub page_size: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

/// Authentication tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Account label used to key the stored OAuth credentials.
    pub account: String,
    /// Safety margin before token expiry; a token inside the margin is
    /// refreshed rather than used.
    pub clock_skew_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            account: "default".to_string(),
            clock_skew_secs: 60,
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Override for the contact-list file location. Defaults to
    /// `lists.json` in the user data directory.
    pub lists_file: Option<PathBuf>,
}

impl Settings {
    /// Returns the settings file location in the user config directory.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "courier")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from disk, falling back to defaults when the file is
    /// missing or malformed.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "malformed settings file, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Writes settings to disk, creating the config directory as needed.
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| io::Error::other("no config directory available"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}
