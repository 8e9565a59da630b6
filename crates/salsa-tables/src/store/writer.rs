//! Atomic, schema-checked batch inserts.
//!
//! A write goes through these steps in order, stopping at the first failure:
//!
//! 1. Nothing happens unless the batch is armed with `execute`.
//! 2. The location is resolved and the table name checked.
//! 3. The live schema is read, inside the write transaction.
//! 4. Every supplied column must exist in it with exactly the declared type.
//! 5. Every supplied column must have the same number of values.
//! 6. One parameterized INSERT per row, all in a single transaction.
//! 7. Commit only after every row succeeded; any failure rolls back.

use std::collections::HashSet;

use rusqlite::{params_from_iter, TransactionBehavior};
use tracing::{debug, info};

use super::connection::{AccessMode, LocationResolver, StoreTarget};
use super::introspect::describe_on;
use crate::core::identifier::{quote, quote_list};
use crate::core::{ScalarType, Value};
use crate::error::{Result, SalsaError};

/// One column of a batch: the live column it targets, its declared type and its values.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteColumn {
    pub name: String,
    pub scalar_type: ScalarType,
    pub values: Vec<Value>,
}

impl WriteColumn {
    pub fn new(name: impl Into<String>, scalar_type: ScalarType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            scalar_type,
            values,
        }
    }
}

/// What a batch insert did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The batch was not armed; nothing was touched.
    NotExecuted,
    /// Every row was inserted and committed.
    Written { table: String, rows: usize },
}

impl WriteOutcome {
    /// Human-readable status line.
    pub fn message(&self) -> String {
        match self {
            WriteOutcome::NotExecuted => "Set execute to true to run.".to_string(),
            WriteOutcome::Written { table, rows } => {
                format!("Successfully inserted {} rows into '{}'.", rows, table)
            }
        }
    }
}

/// A batch of rows to append to one table.
#[derive(Debug, Clone, Default)]
pub struct BatchInsert {
    /// Nothing is done unless this is set.
    pub execute: bool,
    /// Target table name.
    pub table: String,
    /// Columns to write, all of equal length.
    pub columns: Vec<WriteColumn>,
}

impl BatchInsert {
    /// Create an unarmed batch for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            execute: false,
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Arm or disarm the batch.
    pub fn armed(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    /// Add a column.
    pub fn column(mut self, column: WriteColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Resolve `location` and run the batch against it.
    pub fn run<R: LocationResolver + ?Sized>(
        &self,
        resolver: &R,
        location: &str,
    ) -> Result<WriteOutcome> {
        if !self.execute {
            debug!("Batch insert into '{}' not armed; skipping", self.table);
            return Ok(WriteOutcome::NotExecuted);
        }
        let target = StoreTarget::resolve(resolver, location)?.with_create_if_missing(false);
        self.run_on(&target)
    }

    /// Run the batch against an already-resolved target.
    pub fn run_on(&self, target: &StoreTarget) -> Result<WriteOutcome> {
        if !self.execute {
            debug!("Batch insert into '{}' not armed; skipping", self.table);
            return Ok(WriteOutcome::NotExecuted);
        }
        if self.table.trim().is_empty() {
            return Err(SalsaError::InvalidInput("Table name is required".to_string()));
        }
        if self.columns.is_empty() {
            return Err(SalsaError::NoColumns(self.table.clone()));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SalsaError::DuplicateColumn(column.name.clone()));
            }
        }

        let table_sql = quote(&self.table)?;
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table_sql,
            quote_list(&names)?,
            placeholders.join(", ")
        );

        let rows = target.with_connection(AccessMode::Existing, |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| SalsaError::query(format!("begin insert into '{}'", self.table), e))?;

            self.validate_against(&tx)?;
            let rows = self.row_count()?;

            {
                let mut stmt = tx
                    .prepare(&insert_sql)
                    .map_err(|e| SalsaError::query(format!("prepare insert into '{}'", self.table), e))?;
                for row in 0..rows {
                    let params = self.columns.iter().map(|c| &c.values[row]);
                    stmt.execute(params_from_iter(params)).map_err(|e| {
                        SalsaError::query(
                            format!("insert row {} of {} into '{}'", row + 1, rows, self.table),
                            e,
                        )
                    })?;
                }
            }

            tx.commit()
                .map_err(|e| SalsaError::query(format!("commit insert into '{}'", self.table), e))?;
            Ok(rows)
        })?;

        info!("Inserted {} rows into '{}'", rows, self.table);
        Ok(WriteOutcome::Written {
            table: self.table.clone(),
            rows,
        })
    }

    /// Check every column against the live schema: present, and the same type.
    fn validate_against(&self, conn: &rusqlite::Connection) -> Result<()> {
        let schema = describe_on(conn, &self.table)?;

        for column in &self.columns {
            let live = schema
                .column(&column.name)
                .ok_or_else(|| SalsaError::UnknownColumn {
                    table: self.table.clone(),
                    columns: vec![column.name.clone()],
                })?;
            if live.scalar_type != column.scalar_type {
                return Err(SalsaError::TypeMismatch {
                    column: column.name.clone(),
                    expected: live.scalar_type,
                    actual: column.scalar_type,
                });
            }
        }
        Ok(())
    }

    /// Shared row count, or the first column whose length disagrees with the first column's.
    fn row_count(&self) -> Result<usize> {
        let expected = self.columns.first().map_or(0, |c| c.values.len());
        if let Some(bad) = self.columns.iter().find(|c| c.values.len() != expected) {
            return Err(SalsaError::RowCountMismatch {
                column: bad.name.clone(),
                expected,
                actual: bad.values.len(),
            });
        }
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::connection::DefaultResolver;
    use crate::store::introspect::row_count;
    use tempfile::TempDir;

    fn make_store(dir: &TempDir) -> StoreTarget {
        let target = StoreTarget::new(dir.path().join("test.db"));
        target
            .with_connection(AccessMode::CreateIfAllowed, |conn| {
                conn.execute_batch(
                    "CREATE TABLE people (
                        id INTEGER NOT NULL,
                        name TEXT,
                        score REAL
                    )",
                )
                .map_err(|e| SalsaError::query("setup", e))
            })
            .unwrap();
        target
    }

    fn people_batch(ids: Vec<Value>, names: Vec<Value>) -> BatchInsert {
        BatchInsert::new("people")
            .armed(true)
            .column(WriteColumn::new("id", ScalarType::Integer, ids))
            .column(WriteColumn::new("name", ScalarType::Text, names))
    }

    #[test]
    fn test_writes_all_rows() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);

        let batch = people_batch(
            vec![1.into(), 2.into(), 3.into()],
            vec!["ann".into(), "bob".into(), "cy".into()],
        );
        let outcome = batch.run_on(&target).unwrap();
        assert_eq!(
            outcome,
            WriteOutcome::Written {
                table: "people".into(),
                rows: 3
            }
        );
        assert_eq!(outcome.message(), "Successfully inserted 3 rows into 'people'.");
        assert_eq!(row_count(&target, "people").unwrap(), 3);
    }

    #[test]
    fn test_not_armed_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join("never").display().to_string();

        let batch = people_batch(vec![1.into()], vec!["ann".into()]).armed(false);
        let outcome = batch.run(&DefaultResolver, &location).unwrap();
        assert_eq!(outcome, WriteOutcome::NotExecuted);
        assert!(!dir.path().join("never.db").exists());
    }

    #[test]
    fn test_type_mismatch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);

        let batch = BatchInsert::new("people")
            .armed(true)
            .column(WriteColumn::new("id", ScalarType::Integer, vec![1.into()]))
            .column(WriteColumn::new("name", ScalarType::Integer, vec![5.into()]));
        let err = batch.run_on(&target).unwrap_err();
        match err {
            SalsaError::TypeMismatch {
                column,
                expected,
                actual,
            } => {
                assert_eq!(column, "name");
                assert_eq!(expected, ScalarType::Text);
                assert_eq!(actual, ScalarType::Integer);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(row_count(&target, "people").unwrap(), 0);
    }

    #[test]
    fn test_unknown_column_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);

        let batch = BatchInsert::new("people")
            .armed(true)
            .column(WriteColumn::new("ID", ScalarType::Integer, vec![1.into()]));
        let err = batch.run_on(&target).unwrap_err();
        assert!(matches!(err, SalsaError::UnknownColumn { ref columns, .. } if columns == &["ID"]));
    }

    #[test]
    fn test_row_count_mismatch_names_column() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);

        let batch = people_batch(vec![1.into(), 2.into()], vec!["ann".into()]);
        let err = batch.run_on(&target).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Row count mismatch in column 'name': expected 2, got 1"
        );
        assert_eq!(row_count(&target, "people").unwrap(), 0);
    }

    #[test]
    fn test_failing_row_rolls_back_everything() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);

        // Row 2 violates NOT NULL on id.
        let batch = people_batch(
            vec![1.into(), Value::Null, 3.into()],
            vec!["ann".into(), "bob".into(), "cy".into()],
        );
        let err = batch.run_on(&target).unwrap_err();
        assert!(matches!(err, SalsaError::QueryFailed { ref context, .. } if context.contains("row 2 of 3")));
        assert_eq!(row_count(&target, "people").unwrap(), 0);
    }

    #[test]
    fn test_missing_store_is_not_created() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join("absent").display().to_string();

        let batch = people_batch(vec![1.into()], vec!["ann".into()]);
        let err = batch.run(&DefaultResolver, &location).unwrap_err();
        assert!(matches!(err, SalsaError::ConnectionFailed { .. }));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[test]
    fn test_rejects_empty_table_and_duplicate_columns() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);

        let batch = BatchInsert::new(" ").armed(true);
        assert!(matches!(batch.run_on(&target), Err(SalsaError::InvalidInput(_))));

        let batch = BatchInsert::new("people")
            .armed(true)
            .column(WriteColumn::new("id", ScalarType::Integer, vec![1.into()]))
            .column(WriteColumn::new("id", ScalarType::Integer, vec![2.into()]));
        assert!(matches!(batch.run_on(&target), Err(SalsaError::DuplicateColumn(_))));
    }
}
