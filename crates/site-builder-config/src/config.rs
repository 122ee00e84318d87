/// Builder configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name of the JSON config file.
const CONFIG_FILE_NAME: &str = "site-builder.json";

/// Top-level builder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Max undo snapshots kept per editing session (minimum 2).
    pub history_limit: usize,
    /// Window in milliseconds within which live edits to the same block
    /// collapse into one undo step. 0 disables coalescing.
    pub coalesce_window_ms: u64,
    /// Whether to autosave the block list periodically.
    pub autosave_enabled: bool,
    /// Interval in seconds between autosaves (minimum 5).
    pub autosave_interval_secs: u64,
    /// Max autosaved revisions kept per site (minimum 1).
    pub max_autosave_revisions: usize,
    /// Directory for the autosave database. Empty = platform default.
    pub data_dir: String,
    /// Site used when a command doesn't name one.
    pub default_site_id: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            coalesce_window_ms: 500,
            autosave_enabled: true,
            autosave_interval_secs: 30,
            max_autosave_revisions: 20,
            data_dir: String::new(),
            default_site_id: "default".to_string(),
        }
    }
}

impl BuilderConfig {
    /// Returns the config file path under the platform config directory,
    /// falling back to the working directory.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("site-builder").join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (missing file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<BuilderConfig>(&contents) {
                    Ok(mut config) => {
                        config.sanitize();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {}: {e}", path.display());
                }
            }
            // Don't overwrite a broken file
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e:#}", path.display());
            }
            config
        }
    }

    /// Saves config to `path` as pretty-printed JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    /// The configured autosave directory, or `None` for the platform default.
    pub fn data_dir_override(&self) -> Option<PathBuf> {
        let trimmed = self.data_dir.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// Clamps values to valid ranges and resets invalid fields.
    pub fn sanitize(&mut self) {
        self.history_limit = self.history_limit.clamp(2, 10_000);
        self.coalesce_window_ms = self.coalesce_window_ms.min(10_000);
        self.autosave_interval_secs = self.autosave_interval_secs.max(5);
        self.max_autosave_revisions = self.max_autosave_revisions.max(1);

        let site = self.default_site_id.trim();
        if site.is_empty() || site.contains(['#', '$']) {
            self.default_site_id = "default".to_string();
        } else if site.len() != self.default_site_id.len() {
            self.default_site_id = site.to_string();
        }
    }
}
