// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings persisted as RON.

use pipeline_editor_graph::InteractionSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the settings file location
pub const SETTINGS_ENV: &str = "PIPELINE_EDITOR_SETTINGS";
/// Settings file looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "pipeline_editor.ron";

/// Error reading or writing settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("Settings IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid settings RON
    #[error("Invalid settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

/// User-tunable editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Initial window size in logical pixels
    pub window_size: [u32; 2],
    /// Catalog RON file; the built-in demo catalog is used when unset or missing
    pub catalog_path: Option<PathBuf>,
    /// Where "Save" writes the pipeline JSON
    pub export_path: PathBuf,
    /// Canvas interaction tunables
    pub interaction: InteractionSettings,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            window_size: [1600, 900],
            catalog_path: None,
            export_path: PathBuf::from("pipeline.json"),
            interaction: InteractionSettings::default(),
        }
    }
}

impl EditorSettings {
    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }

    /// Save settings to a RON file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Settings file location: `$PIPELINE_EDITOR_SETTINGS` or `./pipeline_editor.ron`
    pub fn path() -> PathBuf {
        std::env::var_os(SETTINGS_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE), PathBuf::from)
    }

    /// Load from [`EditorSettings::path`], falling back to defaults
    pub fn load_or_default() -> Self {
        let path = Self::path();
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(&path) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                tracing::warn!("Ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }
}
