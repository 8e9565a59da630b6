//! Pass-through commands and queries: raw statements, selects and table creation.

use std::collections::HashSet;

use rusqlite::{Batch, Connection};
use tracing::{debug, info};

use super::connection::{AccessMode, StoreTarget};
use crate::core::identifier::{quote, quote_list};
use crate::core::{ColumnSpec, Scalar, ScalarType, Value};
use crate::error::{Result, SalsaError};
use crate::table::{Column, Table};

/// Run every statement in `sql`; returns the total rows affected.
///
/// The statements run in one transaction. If any of them fails, none of
/// their changes are kept.
pub fn execute_command(target: &StoreTarget, sql: &str) -> Result<usize> {
    if sql.trim().is_empty() {
        return Err(SalsaError::InvalidInput("Command text is empty".to_string()));
    }
    let affected = target.with_connection(AccessMode::CreateIfAllowed, |conn| {
        let tx = conn
            .transaction()
            .map_err(|e| SalsaError::query("begin command transaction", e))?;

        let before = total_changes(&tx)?;
        let mut batch = Batch::new(&tx, sql);
        let mut index = 0;
        while let Some(mut stmt) = batch
            .next()
            .map_err(|e| SalsaError::query(format!("prepare statement {}", index + 1), e))?
        {
            index += 1;
            stmt.execute([])
                .map_err(|e| SalsaError::query(format!("execute statement {}", index), e))?;
        }
        drop(batch);

        // changes() keeps the last DML count across DDL statements
        let affected = total_changes(&tx)? - before;
        tx.commit()
            .map_err(|e| SalsaError::query("commit command", e))?;
        debug!("Ran {} statements", index);
        Ok(affected as usize)
    })?;
    info!("Command affected {} rows", affected);
    Ok(affected)
}

/// Run a query and materialize its result as an unnamed table.
pub fn execute_query(target: &StoreTarget, sql: &str) -> Result<Table> {
    if sql.trim().is_empty() {
        return Err(SalsaError::InvalidInput("Query text is empty".to_string()));
    }
    target.with_connection(AccessMode::Existing, |conn| query_table(conn, "", sql))
}

/// Build the SELECT statement used by [`select`].
///
/// An empty column list selects every column.
pub fn select_sql<S: AsRef<str>>(table: &str, columns: &[S], filter: Option<&str>) -> Result<String> {
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        quote_list(columns)?
    };
    let mut sql = format!("SELECT {} FROM {}", projection, quote(table)?);
    if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    Ok(sql)
}

/// Select columns from a table, optionally filtered by a WHERE clause.
///
/// The filter is caller-authored SQL and is passed through unchanged.
pub fn select<S: AsRef<str>>(
    target: &StoreTarget,
    table: &str,
    columns: &[S],
    filter: Option<&str>,
) -> Result<Table> {
    let sql = select_sql(table, columns, filter)?;
    debug!("Select: {}", sql);
    target.with_connection(AccessMode::Existing, |conn| query_table(conn, table, &sql))
}

/// Turn `(name, type token)` pairs into column specs.
///
/// Type tokens are loose names such as `"string"` or `"int"`; an unknown
/// token is an error naming the column.
pub fn parse_column_definitions<N, T>(definitions: &[(N, T)]) -> Result<Vec<ColumnSpec>>
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    if definitions.is_empty() {
        return Err(SalsaError::InvalidInput(
            "Column names and data types must be provided".to_string(),
        ));
    }
    definitions
        .iter()
        .map(|(name, token)| {
            let (name, token) = (name.as_ref(), token.as_ref());
            ScalarType::parse_natural_language(token)
                .map(|ty| ColumnSpec::new(name, ty))
                .ok_or_else(|| {
                    SalsaError::InvalidInput(format!(
                        "Unsupported data type '{}' for column '{}'",
                        token, name
                    ))
                })
        })
        .collect()
}

/// Build a `CREATE TABLE IF NOT EXISTS` statement.
pub fn create_table_sql(table: &str, columns: &[ColumnSpec]) -> Result<String> {
    if columns.is_empty() {
        return Err(SalsaError::NoColumns(table.to_string()));
    }
    let mut seen = HashSet::new();
    let mut definitions = Vec::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(SalsaError::DuplicateColumn(column.name.clone()));
        }
        definitions.push(format!(
            "{} {}",
            quote(&column.name)?,
            column.scalar_type.storage_keyword()
        ));
    }
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(table)?,
        definitions.join(", ")
    ))
}

/// Create a table if it does not exist; returns the statement that was run.
pub fn create_table(target: &StoreTarget, table: &str, columns: &[ColumnSpec]) -> Result<String> {
    let sql = create_table_sql(table, columns)?;
    target.with_connection(AccessMode::CreateIfAllowed, |conn| {
        conn.execute(&sql, [])
            .map_err(|e| SalsaError::query(format!("create table '{}'", table), e))
    })?;
    info!("Created table '{}' ({} columns)", table, columns.len());
    Ok(sql)
}

/// Materialize a query's rows as a table.
///
/// Column types come from the declared type when the result column maps to
/// a table column, otherwise from the first non-NULL value. NULLs stay NULL.
fn query_table(conn: &Connection, name: &str, sql: &str) -> Result<Table> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SalsaError::query("prepare query", e))?;

    let headers: Vec<(String, Option<String>)> = stmt
        .columns()
        .iter()
        .map(|c| (c.name().to_string(), c.decl_type().map(str::to_string)))
        .collect();
    let width = headers.len();

    let mut raw: Vec<Vec<Value>> = vec![Vec::new(); width];
    let mut rows = stmt
        .query([])
        .map_err(|e| SalsaError::query("run query", e))?;
    while let Some(row) = rows.next().map_err(|e| SalsaError::query("read row", e))? {
        for (i, values) in raw.iter_mut().enumerate() {
            let value = row
                .get_ref(i)
                .map_err(|e| SalsaError::query("read value", e))?;
            values.push(Value::from(value));
        }
    }

    let mut taken = HashSet::new();
    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|((header, declared), values)| {
            let scalar_type = match declared {
                Some(keyword) => ScalarType::infer_from_storage_keyword(&keyword),
                None => infer_from_values(&values),
            };
            let scalars = values
                .iter()
                .map(|v| if v.is_null() { Scalar::Null } else { scalar_type.convert(v) })
                .collect();
            Column::from_scalars(unique_name(&mut taken, header), scalar_type, scalars)
        })
        .collect();

    let table = Table::from_columns(name, columns)?;
    debug!("Query returned {} rows", table.row_count());
    Ok(table)
}

fn total_changes(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT total_changes()", [], |row| row.get(0))
        .map_err(|e| SalsaError::query("read change count", e))
}

fn infer_from_values(values: &[Value]) -> ScalarType {
    match values.iter().find(|v| !v.is_null()) {
        Some(Value::Bool(_)) => ScalarType::Boolean,
        Some(Value::Int(_)) => ScalarType::Integer,
        Some(Value::Float(_)) => ScalarType::Double,
        _ => ScalarType::Text,
    }
}

/// Result headers may repeat (`SELECT a, a`); later repeats get a numeric suffix.
fn unique_name(taken: &mut HashSet<String>, header: String) -> String {
    if taken.insert(header.clone()) {
        return header;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}{}", header, n);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_store(dir: &TempDir) -> StoreTarget {
        let target = StoreTarget::new(dir.path().join("test.db"));
        execute_command(
            &target,
            "CREATE TABLE people (id INTEGER, name TEXT, score REAL)",
        )
        .unwrap();
        execute_command(
            &target,
            "INSERT INTO people VALUES (1, 'ann', 1.5), (2, 'bob', NULL), (3, 'ann', 4.0)",
        )
        .unwrap();
        target
    }

    #[test]
    fn test_execute_command_reports_affected_rows() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);
        let affected = execute_command(&target, "DELETE FROM people WHERE name = 'ann'").unwrap();
        assert_eq!(affected, 2);
    }

    #[test]
    fn test_execute_command_rejects_empty_and_bad_sql() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);
        assert!(matches!(
            execute_command(&target, "  "),
            Err(SalsaError::InvalidInput(_))
        ));
        assert!(matches!(
            execute_command(&target, "DROP TABLE nothing_here"),
            Err(SalsaError::QueryFailed { .. })
        ));
    }

    #[test]
    fn test_execute_query_types_and_nulls() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);

        let table = execute_query(&target, "SELECT id, name, score, id * 2 AS doubled FROM people").unwrap();
        assert_eq!(table.name(), "");
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("id").unwrap().scalar_type(), ScalarType::Integer);
        assert_eq!(table.column("score").unwrap().scalar_type(), ScalarType::Double);
        assert_eq!(table.column("score").unwrap().values()[1], Scalar::Null);
        assert_eq!(table.column("doubled").unwrap().scalar_type(), ScalarType::Integer);
        assert_eq!(table.column("doubled").unwrap().values()[2], Scalar::Integer(6));
    }

    #[test]
    fn test_execute_command_runs_every_statement() {
        let dir = TempDir::new().unwrap();
        let target = StoreTarget::new(dir.path().join("script.db"));

        let affected = execute_command(
            &target,
            "CREATE TABLE a (x INTEGER);
             INSERT INTO a VALUES (1), (2);
             CREATE TABLE b (y TEXT);
             INSERT INTO b VALUES ('one');",
        )
        .unwrap();
        assert_eq!(affected, 3);

        let schema = crate::store::introspect::describe(&target, "b").unwrap();
        assert_eq!(schema.columns, vec![ColumnSpec::new("y", ScalarType::Text)]);
    }

    #[test]
    fn test_execute_command_failure_keeps_no_changes() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);

        let err = execute_command(
            &target,
            "DELETE FROM people; CREATE TABLE later (z INTEGER); INSERT INTO missing VALUES (1);",
        )
        .unwrap_err();
        assert!(matches!(err, SalsaError::QueryFailed { .. }));
        assert!(err.to_string().contains("statement 3"));

        assert_eq!(crate::store::introspect::row_count(&target, "people").unwrap(), 3);
        assert!(crate::store::introspect::describe(&target, "later").is_err());
    }

    #[test]
    fn test_execute_query_uses_declared_type_when_first_value_is_null() {
        let dir = TempDir::new().unwrap();
        let target = StoreTarget::new(dir.path().join("nulls.db"));
        execute_command(
            &target,
            "CREATE TABLE readings (value REAL); INSERT INTO readings VALUES (NULL), (2);",
        )
        .unwrap();

        let table = execute_query(&target, "SELECT value FROM readings").unwrap();
        let column = table.column("value").unwrap();
        assert_eq!(column.scalar_type(), ScalarType::Double);
        assert_eq!(column.values(), &[Scalar::Null, Scalar::Double(2.0)]);
    }

    #[test]
    fn test_execute_query_renames_repeated_headers() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);
        let table = execute_query(&target, "SELECT name, name FROM people").unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["name", "name1"]);
    }

    #[test]
    fn test_select_sql() {
        assert_eq!(
            select_sql::<&str>("people", &[], None).unwrap(),
            "SELECT * FROM \"people\""
        );
        assert_eq!(
            select_sql("people", &["id", "name"], Some(" id > 1 ")).unwrap(),
            "SELECT \"id\", \"name\" FROM \"people\" WHERE id > 1"
        );
        assert_eq!(
            select_sql("people", &["id"], Some("   ")).unwrap(),
            "SELECT \"id\" FROM \"people\""
        );
    }

    #[test]
    fn test_select_filters_rows() {
        let dir = TempDir::new().unwrap();
        let target = make_store(&dir);

        let table = select(&target, "people", &["name"], Some("id >= 2")).unwrap();
        assert_eq!(table.name(), "people");
        assert_eq!(table.column_count(), 1);
        assert_eq!(
            table.column("name").unwrap().values(),
            &[Scalar::Text("bob".into()), Scalar::Text("ann".into())]
        );
    }

    #[test]
    fn test_parse_column_definitions() {
        let specs = parse_column_definitions(&[("id", "int"), ("name", "string")]).unwrap();
        assert_eq!(
            specs,
            vec![
                ColumnSpec::new("id", ScalarType::Integer),
                ColumnSpec::new("name", ScalarType::Text),
            ]
        );

        let err = parse_column_definitions(&[("when", "timestamp")]).unwrap_err();
        assert!(err.to_string().contains("'when'"));

        let empty: [(&str, &str); 0] = [];
        assert!(parse_column_definitions(&empty).is_err());
    }

    #[test]
    fn test_create_table_sql_quotes_names() {
        let sql = create_table_sql(
            "my table",
            &[
                ColumnSpec::new("id", ScalarType::Integer),
                ColumnSpec::new("ok?", ScalarType::Boolean),
            ],
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"my table\" (\"id\" INTEGER, \"ok?\" BOOLEAN)"
        );
        assert!(create_table_sql("t", &[]).is_err());
    }

    #[test]
    fn test_create_table_is_idempotent_and_introspectable() {
        let dir = TempDir::new().unwrap();
        let target = StoreTarget::new(dir.path().join("new.db"));
        let columns = vec![
            ColumnSpec::new("id", ScalarType::Integer),
            ColumnSpec::new("score", ScalarType::Double),
            ColumnSpec::new("active", ScalarType::Boolean),
        ];

        create_table(&target, "t", &columns).unwrap();
        create_table(&target, "t", &columns).unwrap();

        let schema = crate::store::introspect::describe(&target, "t").unwrap();
        assert_eq!(schema.columns, columns);
    }
}
