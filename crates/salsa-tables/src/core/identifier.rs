//! Identifier validation and quoting for dynamically built SQL.
//!
//! Table and column names cannot be bound as statement parameters, so every
//! statement that names a caller-supplied table or column goes through
//! [`quote`]. Values are never interpolated; they are always bound.

use crate::error::{Result, SalsaError};

/// Validate an identifier.
///
/// Rejects empty or whitespace-only names and names containing null bytes.
/// SQLite puts no limit on identifier length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SalsaError::InvalidInput(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(SalsaError::InvalidInput(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    Ok(())
}

/// Quote a SQLite identifier.
///
/// Escapes double quotes by doubling them and wraps in double quotes.
///
/// ```ignore
/// assert_eq!(quote("users")?, "\"users\"");
/// assert_eq!(quote("a\"b")?, "\"a\"\"b\"");
/// ```
pub fn quote(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a list of identifiers and join them with `", "`.
pub fn quote_list<S: AsRef<str>>(names: &[S]) -> Result<String> {
    let quoted = names
        .iter()
        .map(|n| quote(n.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(", "))
}
