//! Connection targets and scoped connection lifecycle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::error::{Result, SalsaError};

/// Default busy timeout for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// File extension appended to database locations that lack one.
const DB_EXTENSION: &str = ".db";

/// Turns a caller-supplied location string into a database file path.
pub trait LocationResolver {
    /// Resolve `raw` to a path, or explain why it cannot be used.
    fn resolve(&self, raw: &str) -> Result<PathBuf>;
}

/// Resolves locations as plain file paths.
///
/// Appends `.db` when the location does not already end in it and requires
/// the parent directory to exist. Bare file names resolve relative to the
/// working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl LocationResolver for DefaultResolver {
    fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SalsaError::InvalidInput(
                "File path is empty".to_string(),
            ));
        }

        let mut location = raw.to_string();
        if !location.to_lowercase().ends_with(DB_EXTENSION) {
            location.push_str(DB_EXTENSION);
        }

        let path = PathBuf::from(location);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(SalsaError::InvalidInput(format!(
                    "Directory '{}' does not exist",
                    parent.display()
                )));
            }
        }

        Ok(path)
    }
}

/// How a connection may treat a missing database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// The file must already exist (introspection, queries, batch writes).
    Existing,
    /// Create the file if the target allows it (commands, table creation).
    CreateIfAllowed,
}

/// A file-backed SQLite database to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTarget {
    path: PathBuf,
    busy_timeout: Duration,
    create_if_missing: bool,
}

impl StoreTarget {
    /// Target an already-resolved path with default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            create_if_missing: true,
        }
    }

    /// Resolve a raw location and target it.
    pub fn resolve<R: LocationResolver + ?Sized>(resolver: &R, raw: &str) -> Result<Self> {
        Ok(Self::new(resolver.resolve(raw)?))
    }

    /// Set the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Allow or forbid creating the database file.
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path as display text, used in messages.
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    /// Open a connection. Prefer [`with_connection`](Self::with_connection),
    /// which also guarantees the close.
    pub fn open(&self, mode: AccessMode) -> Result<Connection> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if mode == AccessMode::CreateIfAllowed && self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|e| SalsaError::connection(self.display_name(), e))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| SalsaError::connection(self.display_name(), e))?;

        debug!("Opened connection to {}", self.display_name());
        Ok(conn)
    }

    /// Run `f` on a fresh connection and close it afterwards, whatever `f` returned.
    pub fn with_connection<T, F>(&self, mode: AccessMode, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.open(mode)?;
        let result = f(&mut conn);

        if let Err((_, e)) = conn.close() {
            warn!("Failed to close connection to {}: {}", self.display_name(), e);
        } else {
            debug!("Closed connection to {}", self.display_name());
        }

        result
    }
}
