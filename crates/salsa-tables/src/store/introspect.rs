//! Live schema introspection.

use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use super::connection::{AccessMode, DefaultResolver, LocationResolver, StoreTarget, DEFAULT_BUSY_TIMEOUT};
use crate::core::identifier::quote;
use crate::core::{ColumnSpec, ScalarType, SchemaDescriptor};
use crate::error::{Result, SalsaError};

/// Anything that can report the columns of a table at a location.
///
/// Port synchronization depends on this rather than on SQLite directly.
pub trait SchemaSource {
    /// Describe `table` at `location`.
    fn describe(&self, location: &str, table: &str) -> Result<SchemaDescriptor>;
}

/// Describe a table's columns in declaration order.
///
/// Opens its own connection, which is closed before returning. A table
/// that does not exist is a `QueryFailed` error.
pub fn describe(target: &StoreTarget, table: &str) -> Result<SchemaDescriptor> {
    target.with_connection(AccessMode::Existing, |conn| describe_on(conn, table))
}

/// Count the rows currently in a table.
pub fn row_count(target: &StoreTarget, table: &str) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote(table)?);
    target.with_connection(AccessMode::Existing, |conn| {
        conn.query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(|e| SalsaError::query(format!("count rows in '{}'", table), e))
    })
}

/// Describe a table using an open connection.
pub(crate) fn describe_on(conn: &Connection, table: &str) -> Result<SchemaDescriptor> {
    let sql = format!("PRAGMA table_info({})", quote(table)?);
    let context = || format!("describe '{}'", table);

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| SalsaError::query(context(), e))?;
    let columns = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let declared: Option<String> = row.get(2)?;
            Ok((name, declared.unwrap_or_default()))
        })
        .map_err(|e| SalsaError::query(context(), e))?
        .map(|r| {
            r.map(|(name, declared)| {
                ColumnSpec::new(name, ScalarType::infer_from_storage_keyword(&declared))
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| SalsaError::query(context(), e))?;

    if columns.is_empty() {
        return Err(SalsaError::query(context(), "no such table"));
    }

    debug!("Described '{}': {} columns", table, columns.len());
    Ok(SchemaDescriptor {
        table: table.to_string(),
        columns,
    })
}

/// [`SchemaSource`] backed by SQLite files.
#[derive(Debug, Clone)]
pub struct SqliteSchemaSource<R = DefaultResolver> {
    resolver: R,
    busy_timeout: Duration,
}

impl Default for SqliteSchemaSource<DefaultResolver> {
    fn default() -> Self {
        Self::new(DefaultResolver)
    }
}

impl<R: LocationResolver> SqliteSchemaSource<R> {
    /// Create a source that resolves locations with `resolver`.
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Set the busy timeout used for introspection connections.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

impl<R: LocationResolver> SchemaSource for SqliteSchemaSource<R> {
    fn describe(&self, location: &str, table: &str) -> Result<SchemaDescriptor> {
        let target = StoreTarget::resolve(&self.resolver, location)?
            .with_busy_timeout(self.busy_timeout)
            .with_create_if_missing(false);
        describe(&target, table)
    }
}
