use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// Project-level configuration, loaded from `keyvault.toml`.
///
/// Every field has a default, so no config file is needed at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding persistent records.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// `tracing` filter used when `KEYVAULT_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".keyvault".to_string()
}

fn default_log_filter() -> String {
    "warn".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = "keyvault.toml";

    /// Load settings from `<project_dir>/keyvault.toml`.
    ///
    /// A missing file yields defaults; an unparsable one is an error.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path of the record directory.
    ///
    /// Example: `project_dir/.keyvault`
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
