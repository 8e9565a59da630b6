//! # salsa-tables
//!
//! Typed in-memory tables and schema-checked SQLite access for dataflow hosts.
//!
//! This library provides:
//!
//! - **Scalar types** with total coercion from untyped host values
//! - **Tables** whose columns are validated for shape on every way in
//! - **Dynamic port interfaces** that follow a table or live schema, with
//!   manual and locked modes
//! - **Batch inserts** that check the live schema before writing and commit
//!   atomically
//! - **Pass-through commands** (raw statements, selects, table creation)
//!
//! ## Example
//!
//! ```rust,no_run
//! use salsa_tables::{BatchInsert, DefaultResolver, PortSynchronizer, SqliteSchemaSource, Value};
//!
//! fn main() -> salsa_tables::Result<()> {
//!     let mut ports = PortSynchronizer::for_batch_insert();
//!     ports.sync_with_source(&SqliteSchemaSource::new(DefaultResolver), "data.db", "people")?;
//!
//!     let columns = ports.write_columns(vec![
//!         vec![Value::from(1), Value::from(2)],
//!         vec![Value::from("ann"), Value::from("bob")],
//!     ])?;
//!     let outcome = BatchInsert { execute: true, table: "people".into(), columns }
//!         .run(&DefaultResolver, "data.db")?;
//!     println!("{}", outcome.message());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod store;
pub mod sync;
pub mod table;

// Re-exports for convenient access
pub use config::{Config, InterfaceConfig, StoreConfig};
pub use crate::core::{ColumnSpec, Scalar, ScalarType, SchemaDescriptor, Value};
pub use error::{Result, SalsaError};
pub use store::{
    BatchInsert, DefaultResolver, LocationResolver, SchemaSource, SqliteSchemaSource, StoreTarget,
    WriteColumn, WriteOutcome,
};
pub use sync::{InterfaceState, Port, PortChange, PortSynchronizer, SyncMode, SyncOutcome};
pub use table::{Column, ColumnExtraction, Table, ValueCount};
