//! Configuration module for relmap.
//!
//! Handles the `relmap.toml` settings file.

mod settings;

pub use settings::{AliasSettings, CompilerSettings, Settings, SettingsError};
