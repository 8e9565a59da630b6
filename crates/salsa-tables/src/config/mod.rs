//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SalsaError};
use crate::store::{LocationResolver, StoreTarget};

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl StoreConfig {
    /// Busy timeout as a duration.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Resolve `location` (or `store.path` when `None`) into a connection target.
    pub fn target<R: LocationResolver + ?Sized>(
        &self,
        resolver: &R,
        location: Option<&str>,
    ) -> Result<StoreTarget> {
        let configured = self.path.as_ref().map(|p| p.display().to_string());
        let raw = location.or(configured.as_deref()).ok_or_else(|| {
            SalsaError::Config(
                "no database location: pass --database or set store.path".into(),
            )
        })?;

        Ok(StoreTarget::resolve(resolver, raw)?
            .with_busy_timeout(self.busy_timeout())
            .with_create_if_missing(self.create_if_missing))
    }
}
