//! Ports, synchronization modes and the changes a resync can make.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{ColumnSpec, ScalarType};

/// One named, typed slot in a component's variable-length interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    name: String,
    nickname: String,
    scalar_type: ScalarType,
    ordinal: usize,
    renameable: bool,
}

impl Port {
    pub(crate) fn new(name: impl Into<String>, scalar_type: ScalarType, ordinal: usize) -> Self {
        let name = name.into();
        Self {
            nickname: name.clone(),
            name,
            scalar_type,
            ordinal,
            renameable: false,
        }
    }

    /// Formal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display identity, matched against external column names.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.scalar_type
    }

    /// Position among the column ports, from zero.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Whether a user may currently rename this port.
    pub fn is_renameable(&self) -> bool {
        self.renameable
    }

    /// Tooltip-style description.
    pub fn description(&self) -> String {
        format!("Column named \"{}\" of type {}", self.nickname, self.scalar_type)
    }

    /// The column this port stands for.
    pub fn column_spec(&self) -> ColumnSpec {
        ColumnSpec::new(self.nickname.clone(), self.scalar_type)
    }

    /// Set both the formal name and the nickname.
    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.nickname = name.to_string();
    }

    pub(crate) fn set_nickname(&mut self, nickname: &str) {
        self.nickname = nickname.to_string();
    }

    pub(crate) fn set_scalar_type(&mut self, scalar_type: ScalarType) {
        self.scalar_type = scalar_type;
    }

    pub(crate) fn set_ordinal(&mut self, ordinal: usize) {
        self.ordinal = ordinal;
    }

    pub(crate) fn set_renameable(&mut self, renameable: bool) {
        self.renameable = renameable;
    }
}

/// How a dynamic interface keeps its ports in step with a desired schema.
///
/// Persisted as an integer; unknown values fall back to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum SyncMode {
    /// Ports follow the desired schema and cannot be edited.
    #[default]
    AutoGenerate,
    /// Ports are edited by hand; the desired schema is ignored.
    ManualEdit,
    /// Ports are frozen.
    Locked,
}

impl SyncMode {
    pub const ALL: [SyncMode; 3] = [SyncMode::AutoGenerate, SyncMode::ManualEdit, SyncMode::Locked];
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncMode::AutoGenerate => "AutoGenerate",
            SyncMode::ManualEdit => "ManualEdit",
            SyncMode::Locked => "Locked",
        })
    }
}

impl std::str::FromStr for SyncMode {
    type Err = crate::error::SalsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncMode::ALL
            .into_iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                crate::error::SalsaError::InvalidInput(format!("unknown sync mode '{}'", s))
            })
    }
}

impl From<u8> for SyncMode {
    fn from(value: u8) -> Self {
        match value {
            0 => SyncMode::AutoGenerate,
            1 => SyncMode::ManualEdit,
            2 => SyncMode::Locked,
            other => {
                warn!("Unknown sync mode {}, using {}", other, SyncMode::default());
                SyncMode::default()
            }
        }
    }
}

impl From<SyncMode> for u8 {
    fn from(mode: SyncMode) -> Self {
        match mode {
            SyncMode::AutoGenerate => 0,
            SyncMode::ManualEdit => 1,
            SyncMode::Locked => 2,
        }
    }
}

/// A single change made to the port list by a resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortChange {
    Added { ordinal: usize, name: String },
    Removed { ordinal: usize, name: String },
    Renamed { ordinal: usize, from: String, to: String },
    Retyped { ordinal: usize, from: ScalarType, to: ScalarType },
}
