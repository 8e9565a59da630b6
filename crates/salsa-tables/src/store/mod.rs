//! SQLite store access.
//!
//! Every operation opens its own connection through [`StoreTarget::with_connection`]
//! and closes it before returning; no connection outlives a call.

pub mod command;
pub mod connection;
pub mod introspect;
pub mod writer;

pub use command::{
    create_table, create_table_sql, execute_command, execute_query, parse_column_definitions,
    select, select_sql,
};
pub use connection::{AccessMode, DefaultResolver, LocationResolver, StoreTarget};
pub use introspect::{describe, row_count, SchemaSource, SqliteSchemaSource};
pub use writer::{BatchInsert, WriteColumn, WriteOutcome};
