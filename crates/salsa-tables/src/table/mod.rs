//! In-memory typed tables.
//!
//! A [`Table`] owns its [`Column`]s outright. Every column holds the same
//! number of values (the table's row count) and column names are unique
//! within a table; both are checked on every way in (building, query
//! materialization, deserialization) and the fields are private so nothing
//! can break them afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{ColumnSpec, Scalar, ScalarType, Value};
use crate::error::{Result, SalsaError};

/// A named, typed column of coerced values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    scalar_type: ScalarType,
    values: Vec<Scalar>,
}

impl Column {
    /// Create a column from values already coerced to `scalar_type` (or NULL).
    pub(crate) fn from_scalars(
        name: impl Into<String>,
        scalar_type: ScalarType,
        values: Vec<Scalar>,
    ) -> Self {
        Self {
            name: name.into(),
            scalar_type,
            values,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage type.
    pub fn scalar_type(&self) -> ScalarType {
        self.scalar_type
    }

    /// Values in row order.
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    /// Name and type without data.
    pub fn spec(&self) -> ColumnSpec {
        ColumnSpec::new(self.name.clone(), self.scalar_type)
    }
}

/// A distinct value in a column and how often it occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Result of reading columns back out of a table by name.
///
/// Partial success is allowed: `values` is aligned with the requested names,
/// `None` where the name matched nothing, and `missing` lists those names.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnExtraction {
    /// One entry per requested name.
    pub values: Vec<Option<Vec<Scalar>>>,
    /// Requested names with no matching column.
    pub missing: Vec<String>,
    table: String,
}

impl ColumnExtraction {
    /// Check whether every requested column was found.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// All requested columns, or `UnknownColumn` naming the ones that were not found.
    pub fn into_complete(self) -> Result<Vec<Vec<Scalar>>> {
        if !self.missing.is_empty() {
            return Err(SalsaError::UnknownColumn {
                table: self.table,
                columns: self.missing,
            });
        }
        Ok(self.values.into_iter().flatten().collect())
    }
}

/// An in-memory table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRepr", into = "TableRepr")]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    /// Build a table from column specs and parallel value lists.
    ///
    /// Every value is coerced with [`ScalarType::convert`]. Fails without
    /// producing a table if there are no columns, if two columns share a
    /// name, or if any value list's length differs from the first one's.
    pub fn build<I>(name: impl Into<String>, columns: I) -> Result<Table>
    where
        I: IntoIterator<Item = (ColumnSpec, Vec<Value>)>,
    {
        let name = name.into();
        let columns: Vec<(ColumnSpec, Vec<Value>)> = columns.into_iter().collect();

        validate_shape(
            &name,
            columns.iter().map(|(spec, values)| (spec.name.as_str(), values.len())),
        )?;

        let columns = columns
            .into_iter()
            .map(|(spec, values)| {
                let coerced = values.iter().map(|v| spec.scalar_type.convert(v)).collect();
                Column::from_scalars(spec.name, spec.scalar_type, coerced)
            })
            .collect();

        Ok(Table { name, columns })
    }

    /// Assemble a table from finished columns, checking the shape invariants.
    pub(crate) fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Table> {
        let name = name.into();
        validate_shape(&name, columns.iter().map(|c| (c.name(), c.values.len())))?;
        Ok(Table { name, columns })
    }

    /// Deep copy. The copy shares no storage with `self`, so a table handed
    /// to an inspection surface can neither see nor cause later mutation.
    #[must_use]
    pub fn duplicate(&self) -> Table {
        self.clone()
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names and types, in order.
    pub fn column_specs(&self) -> Vec<ColumnSpec> {
        self.columns.iter().map(Column::spec).collect()
    }

    /// Number of rows (shared by every column).
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// One row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Scalar>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Iterate rows in order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Scalar>> + '_ {
        (0..self.row_count()).map(move |i| self.columns.iter().map(|c| &c.values[i]).collect())
    }

    /// Read columns back out by name.
    ///
    /// Names that match nothing are logged and listed in
    /// [`ColumnExtraction::missing`]; matched names still produce values.
    pub fn extract_columns<S: AsRef<str>>(&self, names: &[S]) -> ColumnExtraction {
        let mut values = Vec::with_capacity(names.len());
        let mut missing = Vec::new();

        for name in names {
            let name = name.as_ref();
            match self.column(name) {
                Some(column) => values.push(Some(column.values.clone())),
                None => {
                    warn!("Column '{}' does not exist in table '{}'", name, self.name);
                    values.push(None);
                    missing.push(name.to_string());
                }
            }
        }

        ColumnExtraction {
            values,
            missing,
            table: self.name.clone(),
        }
    }

    /// Distinct values of a column with their counts, most frequent first.
    ///
    /// Values are grouped by string form (NULL as `"NULL"`); ties keep the
    /// order in which values first appear.
    pub fn value_counts(&self, column: &str) -> Result<Vec<ValueCount>> {
        let column = self.column(column).ok_or_else(|| SalsaError::UnknownColumn {
            table: self.name.clone(),
            columns: vec![column.to_string()],
        })?;

        let mut counts: Vec<ValueCount> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for value in &column.values {
            let key = value.to_string();
            match index.get(&key) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(key.clone(), counts.len());
                    counts.push(ValueCount { value: key, count: 1 });
                }
            }
        }

        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(counts)
    }

    /// One-line description: name, rows and columns.
    pub fn summary(&self) -> String {
        let name = if self.name.is_empty() {
            "Unnamed"
        } else {
            &self.name
        };
        format!(
            "DataTable: {}, Rows: {}, Columns: {}",
            name,
            self.row_count(),
            self.column_count()
        )
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON, re-checking every invariant.
    pub fn from_json(json: &str) -> Result<Table> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Check the non-empty, unique-name and equal-length invariants.
fn validate_shape<'a, I>(table: &str, columns: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    let mut seen = HashSet::new();
    let mut row_count: Option<usize> = None;

    for (name, len) in columns {
        if !seen.insert(name) {
            return Err(SalsaError::DuplicateColumn(name.to_string()));
        }
        match row_count {
            None => row_count = Some(len),
            Some(expected) if expected != len => {
                return Err(SalsaError::RowCountMismatch {
                    column: name.to_string(),
                    expected,
                    actual: len,
                });
            }
            Some(_) => {}
        }
    }

    if row_count.is_none() {
        return Err(SalsaError::NoColumns(table.to_string()));
    }
    Ok(())
}

/// Serialized form of a [`Table`].
#[derive(Serialize, Deserialize)]
struct TableRepr {
    #[serde(default)]
    name: String,
    columns: Vec<ColumnRepr>,
}

#[derive(Serialize, Deserialize)]
struct ColumnRepr {
    name: String,
    #[serde(rename = "type", default)]
    scalar_type: ScalarType,
    #[serde(default)]
    values: Vec<Scalar>,
}

impl TryFrom<TableRepr> for Table {
    type Error = SalsaError;

    fn try_from(repr: TableRepr) -> Result<Self> {
        let columns = repr
            .columns
            .into_iter()
            .map(|c| {
                let ty = c.scalar_type;
                let values = c
                    .values
                    .into_iter()
                    .map(|v| match v {
                        Scalar::Null => Scalar::Null,
                        other => ty.convert(&Value::from(other)),
                    })
                    .collect();
                Column::from_scalars(c.name, ty, values)
            })
            .collect();
        Table::from_columns(repr.name, columns)
    }
}

impl From<Table> for TableRepr {
    fn from(table: Table) -> Self {
        TableRepr {
            name: table.name,
            columns: table
                .columns
                .into_iter()
                .map(|c| ColumnRepr {
                    name: c.name,
                    scalar_type: c.scalar_type,
                    values: c.values,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, ty: ScalarType) -> ColumnSpec {
        ColumnSpec::new(name, ty)
    }

    fn col(name: &str, ty: ScalarType, values: Vec<Value>) -> (ColumnSpec, Vec<Value>) {
        (spec(name, ty), values)
    }

    fn make_test_table() -> Table {
        Table::build(
            "people",
            vec![
                col("id", ScalarType::Integer, vec![1.into(), "2".into(), "x".into()]),
                col("name", ScalarType::Text, vec!["ann".into(), "bob".into(), "ann".into()]),
                col("active", ScalarType::Boolean, vec![true.into(), "false".into(), Value::Null]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_coerces_values() {
        let table = make_test_table();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 3);
        assert_eq!(
            table.column("id").unwrap().values(),
            &[Scalar::Integer(1), Scalar::Integer(2), Scalar::Integer(0)]
        );
        assert_eq!(
            table.column("active").unwrap().values(),
            &[
                Scalar::Boolean(true),
                Scalar::Boolean(false),
                Scalar::Boolean(false)
            ]
        );
        for column in table.columns() {
            assert_eq!(column.values().len(), table.row_count());
        }
    }

    #[test]
    fn test_build_rejects_row_count_mismatch() {
        let result = Table::build(
            "t",
            vec![
                col("a", ScalarType::Integer, vec![1.into(), 2.into()]),
                col("b", ScalarType::Integer, vec![1.into()]),
            ],
        );
        match result {
            Err(SalsaError::RowCountMismatch {
                column,
                expected,
                actual,
            }) => {
                assert_eq!(column, "b");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected RowCountMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_empty_and_duplicates() {
        let empty: Vec<(ColumnSpec, Vec<Value>)> = Vec::new();
        assert!(matches!(
            Table::build("t", empty),
            Err(SalsaError::NoColumns(_))
        ));

        let result = Table::build(
            "t",
            vec![
                col("a", ScalarType::Text, vec![]),
                col("a", ScalarType::Integer, vec![]),
            ],
        );
        assert!(matches!(result, Err(SalsaError::DuplicateColumn(name)) if name == "a"));
    }

    #[test]
    fn test_zero_row_table_is_valid() {
        let table = Table::build("t", vec![col("a", ScalarType::Text, vec![])]).unwrap();
        assert_eq!(table.row_count(), 0);
        assert!(table.row(0).is_none());
    }

    #[test]
    fn test_duplicate_is_independent() {
        let table = make_test_table();
        let copy = table.duplicate();
        assert_eq!(copy, table);
        assert_ne!(
            copy.columns()[0].values().as_ptr(),
            table.columns()[0].values().as_ptr()
        );
    }

    #[test]
    fn test_rows() {
        let table = make_test_table();
        let row = table.row(1).unwrap();
        assert_eq!(
            row,
            vec![
                &Scalar::Integer(2),
                &Scalar::Text("bob".into()),
                &Scalar::Boolean(false)
            ]
        );
        assert_eq!(table.rows().count(), 3);
    }

    #[test]
    fn test_extract_columns_partial() {
        let table = make_test_table();
        let extraction = table.extract_columns(&["name", "missing", "id"]);
        assert!(!extraction.is_complete());
        assert_eq!(extraction.missing, vec!["missing".to_string()]);
        assert_eq!(extraction.values.len(), 3);
        assert!(extraction.values[1].is_none());
        assert_eq!(
            extraction.values[2].as_deref(),
            Some(&[Scalar::Integer(1), Scalar::Integer(2), Scalar::Integer(0)][..])
        );

        let err = extraction.into_complete().unwrap_err();
        assert!(matches!(err, SalsaError::UnknownColumn { columns, .. } if columns == vec!["missing"]));
    }

    #[test]
    fn test_extract_columns_complete() {
        let table = make_test_table();
        let values = table.extract_columns(&["id"]).into_complete().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].len(), 3);
    }

    #[test]
    fn test_value_counts() {
        let table = make_test_table();
        let counts = table.value_counts("name").unwrap();
        assert_eq!(
            counts,
            vec![
                ValueCount { value: "ann".into(), count: 2 },
                ValueCount { value: "bob".into(), count: 1 },
            ]
        );
        assert!(table.value_counts("nope").is_err());
    }

    #[test]
    fn test_summary() {
        let table = make_test_table();
        assert_eq!(table.summary(), "DataTable: people, Rows: 3, Columns: 3");
        let unnamed = Table::build("", vec![col("a", ScalarType::Text, vec![])]).unwrap();
        assert_eq!(unnamed.to_string(), "DataTable: Unnamed, Rows: 0, Columns: 1");
    }

    #[test]
    fn test_json_round_trip() {
        let table = make_test_table();
        let json = table.to_json().unwrap();
        let restored = Table::from_json(&json).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_json_round_trip_keeps_non_finite_doubles() {
        let table = Table::build(
            "readings",
            vec![col(
                "value",
                ScalarType::Double,
                vec![f64::NAN.into(), f64::INFINITY.into(), f64::NEG_INFINITY.into(), 1.5.into()],
            )],
        )
        .unwrap();

        let json = table.to_json().unwrap();
        assert!(json.contains("\"NaN\""));
        assert!(json.contains("\"-inf\""));

        let restored = Table::from_json(&json).unwrap();
        let values = restored.column("value").unwrap().values();
        assert!(matches!(values[0], Scalar::Double(d) if d.is_nan()));
        assert_eq!(values[1], Scalar::Double(f64::INFINITY));
        assert_eq!(values[2], Scalar::Double(f64::NEG_INFINITY));
        assert_eq!(values[3], Scalar::Double(1.5));
        assert!(values.iter().all(|v| !v.is_null()));
    }

    #[test]
    fn test_from_json_revalidates() {
        let mismatched = r#"{"name":"t","columns":[
            {"name":"a","type":2,"values":[1,2]},
            {"name":"b","type":2,"values":[1]}
        ]}"#;
        assert!(Table::from_json(mismatched).is_err());

        let recoerced = r#"{"name":"t","columns":[{"name":"a","type":2,"values":["5", null]}]}"#;
        let table = Table::from_json(recoerced).unwrap();
        assert_eq!(
            table.column("a").unwrap().values(),
            &[Scalar::Integer(5), Scalar::Null]
        );
    }
}
