// SPDX-License-Identifier: MIT OR Apache-2.0
//! Driver settings, stored as RON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file read when no path is given
pub const DEFAULT_SETTINGS_FILE: &str = "nldp.ron";

/// Driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Filter directives used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Node layout files to validate on startup
    pub layouts: Vec<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            layouts: Vec::new(),
        }
    }
}

impl AppSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }

    /// Load settings from a file, falling back to defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Error loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid settings RON
    #[error("Invalid settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}
