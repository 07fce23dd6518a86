//! Engine config validation.

use std::path::Path;

use rts_command::config::EngineConfig;
use rts_command::executor::CommandExecutor;

use crate::error::Result;

/// What a valid config provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigReport {
    /// Number of element types.
    pub element_types: usize,
    /// Number of standard factories the config yields.
    pub factories: usize,
}

/// Load an engine config from a RON file, validate it and build the
/// standard executor from it.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, fails
/// validation or yields duplicate factories.
pub fn validate_config_file(path: &Path) -> Result<ConfigReport> {
    let config = EngineConfig::load(path)?;
    validate_config(&config)
}

/// Validate an in-memory config and build the standard executor from it.
///
/// # Errors
///
/// Returns an error if validation fails or factories collide.
pub fn validate_config(config: &EngineConfig) -> Result<ConfigReport> {
    config.validate()?;
    let executor = CommandExecutor::standard(config)?;
    tracing::debug!(?executor, "Config builds a standard executor");
    Ok(ConfigReport {
        element_types: config.element_types.len(),
        factories: executor.factory_count(),
    })
}
