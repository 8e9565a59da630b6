//! The four-way scalar type system.
//!
//! # Coercion is total
//!
//! [`ScalarType::convert`] never fails. A value that cannot be read as the
//! target type silently becomes that type's default (`false`, `0`, `0.0`),
//! except for [`ScalarType::Text`], which falls back to the value's string
//! form. This is what lets a half-filled host panel still produce a table,
//! and it is also a way to corrupt data without noticing: callers that must
//! reject bad input have to validate it *before* converting.
//!
//! The strict counterpart lives in the batch writer, which compares declared
//! types against the live schema and refuses any mismatch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::value::{Scalar, Value};
use crate::error::{Result, SalsaError};

/// Storage type of a column.
///
/// Persists as a small integer (`0..=3`); unknown integers load as `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ScalarType {
    #[default]
    Text,
    Boolean,
    Integer,
    Double,
}

impl ScalarType {
    /// All types, in persisted order.
    pub const ALL: [ScalarType; 4] = [
        ScalarType::Text,
        ScalarType::Boolean,
        ScalarType::Integer,
        ScalarType::Double,
    ];

    /// Convert an untyped value into this type. Never fails; see the module docs.
    pub fn convert(self, value: &Value) -> Scalar {
        match self {
            ScalarType::Text => match value {
                Value::Text(s) => Scalar::Text(s.clone()),
                other => Scalar::Text(other.text_form()),
            },
            ScalarType::Boolean => match value {
                Value::Bool(b) => Scalar::Boolean(*b),
                other => Scalar::Boolean(parse_bool(&other.text_form()).unwrap_or(false)),
            },
            ScalarType::Integer => match value {
                Value::Int(i) => Scalar::Integer(*i),
                other => Scalar::Integer(other.text_form().trim().parse().unwrap_or(0)),
            },
            ScalarType::Double => match value {
                Value::Float(f) => Scalar::Double(*f),
                other => Scalar::Double(other.text_form().trim().parse().unwrap_or(0.0)),
            },
        }
    }

    /// Match a loose type name such as `"string"`, `"int"` or `"float"`.
    ///
    /// Unlike [`convert`](Self::convert), this reports failure with `None`.
    pub fn parse_natural_language(token: &str) -> Option<ScalarType> {
        match token.trim().to_lowercase().as_str() {
            "text" | "string" => Some(ScalarType::Text),
            "bool" | "boolean" => Some(ScalarType::Boolean),
            "int" | "integer" => Some(ScalarType::Integer),
            "number" | "double" | "float" | "real" | "decimal" => Some(ScalarType::Double),
            _ => None,
        }
    }

    /// The SQLite type keyword used in DDL.
    pub fn storage_keyword(self) -> &'static str {
        match self {
            ScalarType::Text => "TEXT",
            ScalarType::Boolean => "BOOLEAN",
            ScalarType::Integer => "INTEGER",
            ScalarType::Double => "REAL",
        }
    }

    /// Infer a type from a declared column type.
    ///
    /// Substring matching, in SQLite affinity order, so vendor spellings such
    /// as `VARCHAR(40)`, `BIGINT` or `DOUBLE PRECISION` still land correctly.
    /// BLOB maps to `Text`; there is no binary scalar.
    pub fn infer_from_storage_keyword(keyword: &str) -> ScalarType {
        let keyword = keyword.to_uppercase();

        if keyword.contains("INT") {
            ScalarType::Integer
        } else if keyword.contains("CHAR") || keyword.contains("CLOB") || keyword.contains("TEXT") {
            ScalarType::Text
        } else if keyword.contains("BLOB") {
            ScalarType::Text
        } else if keyword.contains("REAL") || keyword.contains("FLOA") || keyword.contains("DOUB") {
            ScalarType::Double
        } else if keyword.contains("BOOL") {
            ScalarType::Boolean
        } else {
            ScalarType::Text
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Text => "Text",
            ScalarType::Boolean => "Boolean",
            ScalarType::Integer => "Integer",
            ScalarType::Double => "Double",
        };
        f.write_str(name)
    }
}

impl FromStr for ScalarType {
    type Err = SalsaError;

    fn from_str(s: &str) -> Result<Self> {
        ScalarType::parse_natural_language(s)
            .ok_or_else(|| SalsaError::InvalidInput(format!("unknown data type '{}'", s)))
    }
}

impl From<u8> for ScalarType {
    fn from(v: u8) -> Self {
        match v {
            0 => ScalarType::Text,
            1 => ScalarType::Boolean,
            2 => ScalarType::Integer,
            3 => ScalarType::Double,
            other => {
                tracing::warn!("Unknown column data type {}, falling back to Text", other);
                ScalarType::Text
            }
        }
    }
}

impl From<ScalarType> for u8 {
    fn from(t: ScalarType) -> Self {
        match t {
            ScalarType::Text => 0,
            ScalarType::Boolean => 1,
            ScalarType::Integer => 2,
            ScalarType::Double => 3,
        }
    }
}
