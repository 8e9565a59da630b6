//! Core value and type abstractions shared by tables, ports and the store.
//!
//! - [`types`]: the four-way [`ScalarType`] and its coercion/keyword rules
//! - [`value`]: untyped host [`Value`]s and coerced [`Scalar`]s
//! - [`schema`]: [`ColumnSpec`] and the live-table [`SchemaDescriptor`]
//! - [`identifier`]: identifier validation and quoting for dynamic SQL

pub mod identifier;
pub mod schema;
pub mod types;
pub mod value;

pub use schema::{ColumnSpec, SchemaDescriptor};
pub use types::ScalarType;
pub use value::{Scalar, Value};
