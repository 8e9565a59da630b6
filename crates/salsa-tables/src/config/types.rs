//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::sync::SyncMode;

/// Root configuration structure.
///
/// Every section is optional; an empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Store connection settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Dynamic interface defaults.
    #[serde(default)]
    pub interface: InterfaceConfig,
}

/// SQLite store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Default database location, used when none is given on the command line.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// How long a connection waits on a locked database, in milliseconds (default: 5000).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Whether commands may create a missing database file (default: true).
    ///
    /// Introspection and batch writes never create one.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            create_if_missing: true,
        }
    }
}

/// Defaults for dynamic port interfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Mode new interfaces start in, stored as an integer (default: 0, AutoGenerate).
    #[serde(default)]
    pub default_mode: SyncMode,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}
