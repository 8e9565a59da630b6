//! Untyped input values and coerced scalars.
//!
//! [`Value`] is whatever a host hands us: a boolean toggle, a number slider,
//! a text panel, nothing at all. [`Scalar`] is what a [`Column`](crate::table::Column)
//! stores after [`ScalarType::convert`](super::ScalarType::convert) has run.

use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue, ValueRef};
use serde::{Deserialize, Serialize, Serializer};

use super::types::ScalarType;

/// An untyped value supplied by the host.
///
/// Deserializes from plain JSON (`null`, `true`, `3`, `2.5`, `"x"`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Check if this value is empty.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value's textual form, used as the parse source during coercion.
    #[must_use]
    pub fn text_form(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Text(s),
            // Arrays and objects have no scalar form; keep their JSON text.
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        match v {
            Scalar::Null => Value::Null,
            Scalar::Text(s) => Value::Text(s),
            Scalar::Boolean(b) => Value::Bool(b),
            Scalar::Integer(i) => Value::Int(i),
            Scalar::Double(d) => Value::Float(d),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    /// BLOBs are read as (lossy) text: the type system has no binary domain.
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Int(i),
            ValueRef::Real(f) => Value::Float(f),
            ValueRef::Text(b) | ValueRef::Blob(b) => {
                Value::Text(String::from_utf8_lossy(b).into_owned())
            }
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// A value coerced into one of the four scalar domains.
///
/// `Null` only appears in tables materialized from store queries; coercion
/// never produces it. Non-finite doubles serialize as `"NaN"`, `"inf"` or
/// `"-inf"`, which a Double column converts back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// SQL NULL read back from the store.
    Null,
    /// Boolean scalar.
    Boolean(bool),
    /// 64-bit integer scalar.
    Integer(i64),
    /// Double precision scalar.
    Double(f64),
    /// Text scalar.
    Text(String),
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Boolean(b) => serializer.serialize_bool(*b),
            Scalar::Integer(i) => serializer.serialize_i64(*i),
            Scalar::Double(d) if d.is_finite() => serializer.serialize_f64(*d),
            // JSON has no NaN or infinity
            Scalar::Double(d) => serializer.collect_str(d),
            Scalar::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl Scalar {
    /// The scalar's type, or `None` for `Null`.
    #[must_use]
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Scalar::Null => None,
            Scalar::Text(_) => Some(ScalarType::Text),
            Scalar::Boolean(_) => Some(ScalarType::Boolean),
            Scalar::Integer(_) => Some(ScalarType::Integer),
            Scalar::Double(_) => Some(ScalarType::Double),
        }
    }

    /// Check if this scalar is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Borrow the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if any.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("NULL"),
            Scalar::Text(v) => f.write_str(v),
            Scalar::Boolean(v) => write!(f, "{}", v),
            Scalar::Integer(v) => write!(f, "{}", v),
            Scalar::Double(v) => write!(f, "{}", v),
        }
    }
}

impl ToSql for Scalar {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Scalar::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Scalar::Boolean(b) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*b))),
            Scalar::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            Scalar::Double(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            Scalar::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}
