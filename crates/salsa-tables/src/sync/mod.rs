//! Dynamic port synchronization.
//!
//! A [`PortSynchronizer`] owns the variable-length part of a component's
//! interface: an ordered list of typed [`Port`]s that sits after a fixed
//! number of reserved leading positions. Its [`SyncMode`] decides who owns
//! that list:
//!
//! - `AutoGenerate`: the list mirrors the last-known desired schema (from a
//!   table or a live store). Ports cannot be edited by hand.
//! - `ManualEdit`: the user inserts, removes, renames and retypes ports; the
//!   desired schema is ignored.
//! - `Locked`: nothing changes.
//!
//! Resolving a desired schema from the store is cached on the
//! `(location, table)` pair so an unchanged pair never hits the store twice.

mod port;
mod state;

pub use port::{Port, PortChange, SyncMode};
pub use state::{InterfaceState, PortState};

use tracing::{debug, info, warn};

use crate::core::{ColumnSpec, ScalarType, Value};
use crate::error::{Result, SalsaError};
use crate::store::{SchemaSource, WriteColumn};
use crate::table::{ColumnExtraction, Table};

/// Prefix for ports created without a name.
pub const DEFAULT_PORT_PREFIX: &str = "Column";

/// What a sync request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The mode does not follow a desired schema; nothing was looked at.
    Inactive,
    /// The `(location, table)` pair was already resolved; nothing changed.
    Cached,
    /// Ports were reconciled, with the listed changes (possibly none).
    Synced(Vec<PortChange>),
}

/// Keeps a list of ports in step with a desired schema, per [`SyncMode`].
#[derive(Debug, Clone)]
pub struct PortSynchronizer {
    reserved: usize,
    ports: Vec<Port>,
    mode: SyncMode,
    desired: Option<Vec<ColumnSpec>>,
    last_resolved: Option<(String, String)>,
}

impl PortSynchronizer {
    /// Create an empty interface with `reserved` fixed leading positions.
    pub fn new(reserved: usize, mode: SyncMode) -> Self {
        Self {
            reserved,
            ports: Vec::new(),
            mode,
            desired: None,
            last_resolved: None,
        }
    }

    /// Table builder: one reserved input (the table name), ports edited by hand.
    pub fn for_table_builder() -> Self {
        Self::new(1, SyncMode::ManualEdit)
    }

    /// Table reader: no reserved outputs, ports follow the table's columns.
    pub fn for_table_reader() -> Self {
        Self::new(0, SyncMode::AutoGenerate)
    }

    /// Batch insert: three reserved inputs (execute, location, table).
    pub fn for_batch_insert() -> Self {
        Self::new(3, SyncMode::AutoGenerate)
    }

    /// Rebuild an interface from saved state.
    pub fn restore(reserved: usize, state: InterfaceState) -> Self {
        let ports = state
            .ports
            .into_iter()
            .enumerate()
            .map(|(i, saved)| {
                let mut port = Port::new(saved.name, saved.scalar_type, i);
                if let Some(nickname) = saved.nickname {
                    port.set_nickname(&nickname);
                }
                port
            })
            .collect();

        let mut sync = Self {
            reserved,
            ports,
            mode: state.mode,
            desired: None,
            last_resolved: None,
        };
        sync.maintain();
        sync
    }

    /// Current state, for saving.
    pub fn state(&self) -> InterfaceState {
        InterfaceState {
            mode: self.mode,
            ports: self
                .ports
                .iter()
                .map(|p| PortState {
                    name: p.name().to_string(),
                    nickname: (p.nickname() != p.name()).then(|| p.nickname().to_string()),
                    scalar_type: p.scalar_type(),
                })
                .collect(),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn reserved(&self) -> usize {
        self.reserved
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Port at an interface position (reserved positions included).
    pub fn port(&self, position: usize) -> Option<&Port> {
        self.index_of(position).map(|i| &self.ports[i])
    }

    /// The column each port stands for, in order.
    pub fn column_specs(&self) -> Vec<ColumnSpec> {
        self.ports.iter().map(Port::column_spec).collect()
    }

    /// Switch modes. Clears the resolution cache; entering `AutoGenerate`
    /// reapplies the last-known desired schema immediately.
    pub fn set_mode(&mut self, mode: SyncMode) -> Vec<PortChange> {
        if mode != self.mode {
            info!("Interface mode changed: {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        self.last_resolved = None;
        self.maintain()
    }

    /// Record the desired schema without reconciling.
    ///
    /// It is applied by the next [`maintain`](Self::maintain) in `AutoGenerate` mode.
    pub fn set_desired_schema(&mut self, desired: Vec<ColumnSpec>) {
        self.desired = Some(desired);
    }

    /// Bring the ports into the shape the current mode requires.
    pub fn maintain(&mut self) -> Vec<PortChange> {
        let changes = match self.mode {
            SyncMode::AutoGenerate => {
                let changes = match self.desired.take() {
                    Some(desired) => {
                        let changes = self.reconcile(&desired);
                        self.desired = Some(desired);
                        changes
                    }
                    None => Vec::new(),
                };
                for port in &mut self.ports {
                    port.set_renameable(false);
                }
                changes
            }
            SyncMode::ManualEdit => {
                for i in 0..self.ports.len() {
                    self.ports[i].set_renameable(true);
                    if self.ports[i].nickname().trim().is_empty() {
                        let name = free_port_name(&self.ports, i);
                        self.ports[i].set_name(&name);
                    }
                }
                Vec::new()
            }
            SyncMode::Locked => {
                for port in &mut self.ports {
                    port.set_renameable(false);
                }
                Vec::new()
            }
        };

        for (i, port) in self.ports.iter_mut().enumerate() {
            port.set_ordinal(i);
        }
        changes
    }

    /// Reconcile against a desired schema, if the mode follows one.
    pub fn sync_with_schema(&mut self, desired: Vec<ColumnSpec>) -> SyncOutcome {
        if self.mode != SyncMode::AutoGenerate {
            return SyncOutcome::Inactive;
        }
        self.set_desired_schema(desired);
        let changes = self.maintain();
        if !changes.is_empty() {
            debug!("Ports resynced: {} changes", changes.len());
        }
        SyncOutcome::Synced(changes)
    }

    /// Reconcile against a table's columns.
    ///
    /// A missing table is a resolution failure and leaves the ports as they are.
    pub fn sync_with_table(&mut self, table: Option<&Table>) -> Result<SyncOutcome> {
        if self.mode != SyncMode::AutoGenerate {
            return Ok(SyncOutcome::Inactive);
        }
        match table {
            Some(table) => Ok(self.sync_with_schema(table.column_specs())),
            None => {
                warn!("No table provided; ports left unchanged");
                Err(SalsaError::ResolutionFailed("No table provided".to_string()))
            }
        }
    }

    /// Reconcile against a live table's schema.
    ///
    /// Skipped when `(location, table)` equals the last successfully resolved
    /// pair. On failure the cache is cleared, the ports are left as they are,
    /// and the error is returned as `ResolutionFailed`.
    pub fn sync_with_source<S: SchemaSource + ?Sized>(
        &mut self,
        source: &S,
        location: &str,
        table: &str,
    ) -> Result<SyncOutcome> {
        if self.mode != SyncMode::AutoGenerate {
            return Ok(SyncOutcome::Inactive);
        }

        let key = (location.to_string(), table.to_string());
        if self.last_resolved.as_ref() == Some(&key) {
            return Ok(SyncOutcome::Cached);
        }

        if location.trim().is_empty() || table.trim().is_empty() {
            return Err(self.resolution_failed(
                "File path and table name must be provided".to_string(),
            ));
        }

        let schema = match source.describe(location, table) {
            Ok(schema) if schema.is_empty() => {
                return Err(self.resolution_failed(format!("Table '{}' has no columns", table)))
            }
            Ok(schema) => schema,
            Err(e) => {
                return Err(self.resolution_failed(format!(
                    "Failed to retrieve columns from table '{}': {}",
                    table, e
                )))
            }
        };

        self.last_resolved = Some(key);
        Ok(self.sync_with_schema(schema.columns))
    }

    /// Whether a port may be inserted at `position`.
    pub fn can_insert(&self, position: usize) -> bool {
        self.mode == SyncMode::ManualEdit
            && position >= self.reserved
            && position <= self.reserved + self.ports.len()
    }

    /// Whether the port at `position` may be removed.
    pub fn can_remove(&self, position: usize) -> bool {
        self.mode == SyncMode::ManualEdit && self.index_of(position).is_some()
    }

    /// A fresh port for `position`: typed `Text` and named `Column{n}`, where
    /// `n` starts at the port index and skips names already taken.
    pub fn create_port(&self, position: usize) -> Port {
        let mut port = Port::new(
            free_port_name(&self.ports, position.saturating_sub(self.reserved)),
            ScalarType::Text,
            position.saturating_sub(self.reserved),
        );
        port.set_renameable(self.mode == SyncMode::ManualEdit);
        port
    }

    /// Insert a fresh port at `position`.
    pub fn insert_port(&mut self, position: usize) -> Result<&Port> {
        if !self.can_insert(position) {
            return Err(self.refused("insert a port", position));
        }
        let index = position - self.reserved;
        let port = self.create_port(position);
        self.ports.insert(index, port);
        self.maintain();
        Ok(&self.ports[index])
    }

    /// Remove the port at `position`. Returns whether anything was removed.
    pub fn destroy(&mut self, position: usize) -> bool {
        if !self.can_remove(position) {
            return false;
        }
        if let Some(index) = self.index_of(position) {
            let removed = self.ports.remove(index);
            debug!("Removed port '{}'", removed.nickname());
            self.maintain();
            return true;
        }
        false
    }

    /// Rename the port at `position`.
    pub fn rename_port(&mut self, position: usize, nickname: &str) -> Result<()> {
        let index = self.editable_index(position, "rename a port")?;
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(SalsaError::InvalidInput("Port name cannot be empty".to_string()));
        }
        if self
            .ports
            .iter()
            .enumerate()
            .any(|(i, p)| i != index && p.nickname() == nickname)
        {
            return Err(SalsaError::DuplicateColumn(nickname.to_string()));
        }
        self.ports[index].set_nickname(nickname);
        Ok(())
    }

    /// Change the type of the port at `position`.
    pub fn set_port_type(&mut self, position: usize, scalar_type: ScalarType) -> Result<()> {
        let index = self.editable_index(position, "retype a port")?;
        self.ports[index].set_scalar_type(scalar_type);
        Ok(())
    }

    /// Build a table from one value list per port, in port order.
    pub fn build_table(&self, name: &str, values: Vec<Vec<Value>>) -> Result<Table> {
        self.check_arity(values.len())?;
        Table::build(name, self.ports.iter().map(Port::column_spec).zip(values))
    }

    /// Batch columns from one value list per port, in port order.
    pub fn write_columns(&self, values: Vec<Vec<Value>>) -> Result<Vec<WriteColumn>> {
        self.check_arity(values.len())?;
        Ok(self
            .ports
            .iter()
            .zip(values)
            .map(|(port, values)| WriteColumn::new(port.nickname(), port.scalar_type(), values))
            .collect())
    }

    /// Read one column per port out of a table, matched by nickname.
    ///
    /// Ports whose column is missing are reported in `missing`.
    pub fn extract(&self, table: &Table) -> ColumnExtraction {
        let names: Vec<&str> = self.ports.iter().map(Port::nickname).collect();
        let extraction = table.extract_columns(&names);
        if !extraction.is_complete() {
            warn!("Unused output ports: {}", extraction.missing.join(", "));
        }
        extraction
    }

    fn reconcile(&mut self, desired: &[ColumnSpec]) -> Vec<PortChange> {
        let mut changes = Vec::new();
        let existing = self.ports.len().min(desired.len());

        while self.ports.len() > desired.len() {
            if let Some(port) = self.ports.pop() {
                changes.push(PortChange::Removed {
                    ordinal: self.ports.len(),
                    name: port.nickname().to_string(),
                });
            }
        }

        for (i, spec) in desired.iter().enumerate().take(existing) {
            let port = &mut self.ports[i];
            if port.nickname() != spec.name || port.name() != spec.name {
                changes.push(PortChange::Renamed {
                    ordinal: i,
                    from: port.nickname().to_string(),
                    to: spec.name.clone(),
                });
                port.set_name(&spec.name);
            }
            if port.scalar_type() != spec.scalar_type {
                changes.push(PortChange::Retyped {
                    ordinal: i,
                    from: port.scalar_type(),
                    to: spec.scalar_type,
                });
                port.set_scalar_type(spec.scalar_type);
            }
        }

        for (i, spec) in desired.iter().enumerate().skip(existing) {
            self.ports.push(Port::new(spec.name.clone(), spec.scalar_type, i));
            changes.push(PortChange::Added {
                ordinal: i,
                name: spec.name.clone(),
            });
        }

        changes
    }

    fn resolution_failed(&mut self, message: String) -> SalsaError {
        self.last_resolved = None;
        warn!("{}", message);
        SalsaError::ResolutionFailed(message)
    }

    fn index_of(&self, position: usize) -> Option<usize> {
        position
            .checked_sub(self.reserved)
            .filter(|&i| i < self.ports.len())
    }

    fn editable_index(&self, position: usize, action: &str) -> Result<usize> {
        if self.mode != SyncMode::ManualEdit {
            return Err(self.refused(action, position));
        }
        self.index_of(position)
            .ok_or_else(|| SalsaError::EditRefused(format!("no port at position {}", position)))
    }

    fn refused(&self, action: &str, position: usize) -> SalsaError {
        SalsaError::EditRefused(format!(
            "cannot {} at position {} in {} mode",
            action, position, self.mode
        ))
    }

    fn check_arity(&self, supplied: usize) -> Result<()> {
        if supplied != self.ports.len() {
            return Err(SalsaError::InvalidInput(format!(
                "Expected {} value lists (one per port), got {}",
                self.ports.len(),
                supplied
            )));
        }
        Ok(())
    }
}

/// First `Column{n}` with `n >= start` that no port uses as name or nickname.
fn free_port_name(ports: &[Port], start: usize) -> String {
    (start..)
        .map(|n| format!("{}{}", DEFAULT_PORT_PREFIX, n))
        .find(|candidate| {
            !ports.iter().any(|p| {
                p.name() == candidate.as_str() || p.nickname() == candidate.as_str()
            })
        })
        .unwrap_or_else(|| DEFAULT_PORT_PREFIX.to_string())
}
