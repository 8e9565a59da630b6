//! Persisted interface state: the mode and the port list.
//!
//! Fields that are absent take their defaults, so older or partial documents
//! still load. Modes and types are stored as integers.

use serde::{Deserialize, Serialize};

use crate::core::ScalarType;
use crate::error::Result;

use super::port::SyncMode;

/// Saved form of a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortState {
    pub name: String,

    /// Defaults to `name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(rename = "type", default)]
    pub scalar_type: ScalarType,
}

/// Saved form of a whole interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceState {
    #[serde(default)]
    pub mode: SyncMode,

    #[serde(default)]
    pub ports: Vec<PortState>,
}

impl InterfaceState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_take_defaults() {
        let state = InterfaceState::from_json("{}").unwrap();
        assert_eq!(state, InterfaceState::default());
        assert_eq!(state.mode, SyncMode::AutoGenerate);

        let state = InterfaceState::from_json(r#"{"ports": [{"name": "a"}]}"#).unwrap();
        assert_eq!(state.ports[0].scalar_type, ScalarType::Text);
        assert_eq!(state.ports[0].nickname, None);
    }

    #[test]
    fn test_unknown_integers_fall_back() {
        let state =
            InterfaceState::from_json(r#"{"mode": 7, "ports": [{"name": "a", "type": 99}]}"#)
                .unwrap();
        assert_eq!(state.mode, SyncMode::AutoGenerate);
        assert_eq!(state.ports[0].scalar_type, ScalarType::Text);
    }

    #[test]
    fn test_saved_as_integers() {
        let state = InterfaceState {
            mode: SyncMode::Locked,
            ports: vec![PortState {
                name: "id".into(),
                nickname: None,
                scalar_type: ScalarType::Integer,
            }],
        };
        assert_eq!(
            state.to_json().unwrap(),
            r#"{"mode":2,"ports":[{"name":"id","type":2}]}"#
        );
    }
}
