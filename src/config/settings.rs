//! TOML-based configuration for relmap.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! dialect = "postgres"
//! not_equals = "negated"   # or "legacy" to emit `=` as older releases did
//! pretty = true
//!
//! [aliases]
//! root_prefix = "t"
//! join_prefix = "j"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::restriction::NotEqualsMode;
use crate::sql::dialect::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// SQL generation settings.
    pub compiler: CompilerSettings,

    /// Table alias settings.
    pub aliases: AliasSettings,
}

/// SQL generation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Target SQL dialect.
    pub dialect: Dialect,

    /// How NOT_EQUALS restrictions are emitted.
    pub not_equals: NotEqualsMode,

    /// Multi-line output; single-line when false.
    pub pretty: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::Generic,
            not_equals: NotEqualsMode::Negated,
            pretty: true,
        }
    }
}

/// Table alias settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AliasSettings {
    /// Prefix for a graph's root table.
    pub root_prefix: String,

    /// Prefix for joined tables.
    pub join_prefix: String,
}

impl Default for AliasSettings {
    fn default() -> Self {
        Self {
            root_prefix: "t".to_string(),
            join_prefix: "j".to_string(),
        }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `RELMAP_CONFIG`
    /// 2. `./relmap.toml`
    /// 3. `~/.config/relmap/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("RELMAP_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("relmap.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("relmap").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Alias prefixes must start an identifier and contain no separators.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (key, prefix) in [
            ("aliases.root_prefix", &self.aliases.root_prefix),
            ("aliases.join_prefix", &self.aliases.join_prefix),
        ] {
            let mut chars = prefix.chars();
            let valid = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(SettingsError::InvalidConfig(format!(
                    "{key} must be a plain identifier, got {prefix:?}"
                )));
            }
        }
        Ok(())
    }
}
