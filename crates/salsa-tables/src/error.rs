//! Error types for table building, port synchronization and store access.

use thiserror::Error;

use crate::core::ScalarType;

/// Process exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code for store connection errors.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Process exit code for failed statements.
pub const EXIT_QUERY_ERROR: u8 = 3;
/// Process exit code for rejected input (schema, row counts, edits).
pub const EXIT_VALIDATION_ERROR: u8 = 4;
/// Process exit code for IO errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for salsa-tables operations.
#[derive(Error, Debug)]
pub enum SalsaError {
    /// A column's value list length differs from the table's row count.
    #[error("Row count mismatch in column '{column}': expected {expected}, got {actual}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// One or more requested columns do not exist.
    #[error("Unknown column(s) in '{}': {}", .table, .columns.join(", "))]
    UnknownColumn { table: String, columns: Vec<String> },

    /// A supplied column type disagrees with the live schema.
    #[error("Type mismatch for column '{column}': expected '{expected}', got '{actual}'")]
    TypeMismatch {
        column: String,
        expected: ScalarType,
        actual: ScalarType,
    },

    /// The store could not be opened.
    #[error("Failed to connect to '{target}': {message}")]
    ConnectionFailed { target: String, message: String },

    /// A statement against the store failed.
    #[error("Query failed ({context}): {message}")]
    QueryFailed { context: String, message: String },

    /// The desired schema of a dynamic interface could not be resolved.
    #[error("Schema resolution failed: {0}")]
    ResolutionFailed(String),

    /// A table was requested with no columns.
    #[error("Table '{0}' has no columns")]
    NoColumns(String),

    /// Two columns in one table share a name.
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// Caller input rejected before touching any state.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A structural edit is not permitted in the interface's current mode.
    #[error("Edit refused: {0}")]
    EditRefused(String),

    /// Configuration error (invalid YAML, bad values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SalsaError {
    /// Create a ConnectionFailed error for a target.
    pub fn connection(target: impl Into<String>, message: impl ToString) -> Self {
        SalsaError::ConnectionFailed {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a QueryFailed error with context about the failing statement.
    pub fn query(context: impl Into<String>, message: impl ToString) -> Self {
        SalsaError::QueryFailed {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Map the error to a process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            SalsaError::Config(_) | SalsaError::Yaml(_) => EXIT_CONFIG_ERROR,
            SalsaError::ConnectionFailed { .. } => EXIT_CONNECTION_ERROR,
            SalsaError::QueryFailed { .. } | SalsaError::ResolutionFailed(_) => EXIT_QUERY_ERROR,
            SalsaError::Io(_) => EXIT_IO_ERROR,
            SalsaError::RowCountMismatch { .. }
            | SalsaError::UnknownColumn { .. }
            | SalsaError::TypeMismatch { .. }
            | SalsaError::NoColumns(_)
            | SalsaError::DuplicateColumn(_)
            | SalsaError::InvalidInput(_)
            | SalsaError::EditRefused(_)
            | SalsaError::Json(_) => EXIT_VALIDATION_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for salsa-tables operations.
pub type Result<T> = std::result::Result<T, SalsaError>;
