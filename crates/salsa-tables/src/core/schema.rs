//! Schema metadata: named, typed column slots without data.

use serde::{Deserialize, Serialize};

use super::types::ScalarType;

/// A column name with its storage type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,

    /// Storage type.
    #[serde(rename = "type", default)]
    pub scalar_type: ScalarType,
}

impl ColumnSpec {
    /// Create a column spec.
    pub fn new(name: impl Into<String>, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar_type,
        }
    }
}

/// Snapshot of a live table's columns, as reported by the store.
///
/// Recomputed on demand; never cached across a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Table name.
    pub table: String,

    /// Columns in declaration order, with inferred types.
    pub columns: Vec<ColumnSpec>,
}

impl SchemaDescriptor {
    /// Look up a column by exact (case-sensitive) name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the descriptor has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
