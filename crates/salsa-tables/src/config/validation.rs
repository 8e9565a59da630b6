//! Configuration validation.

use super::Config;
use crate::error::{Result, SalsaError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if let Some(path) = &config.store.path {
        if path.as_os_str().is_empty() {
            return Err(SalsaError::Config(
                "store.path cannot be empty".into(),
            ));
        }
    }

    if config.store.busy_timeout_ms == 0 {
        return Err(SalsaError::Config(
            "store.busy_timeout_ms must be at least 1".into(),
        ));
    }

    Ok(())
}
