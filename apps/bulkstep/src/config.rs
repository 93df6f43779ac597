//! # Computer Configuration
//!
//! A computer is configured from an optional TOML file; command-line flags
//! override individual fields. Every field is optional:
//!
//! ```toml
//! workers = 4
//! isolations = ["bsp", "dirty_bsp"]
//! max_supersteps = 500
//! ```

use bulkstep_core::{ComputeError, ComputerConfig, Isolation};
use std::path::Path;

/// Maximum size of a configuration file (1 MB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Parse a configuration from TOML text. Missing fields take their defaults.
pub fn parse_config(text: &str) -> Result<ComputerConfig, ComputeError> {
    toml::from_str(text)
        .map_err(|e| ComputeError::SerializationError(format!("Invalid configuration: {}", e)))
}

/// Load the configuration at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ComputerConfig, ComputeError> {
    let Some(path) = path else {
        return Ok(ComputerConfig::default());
    };

    let metadata = std::fs::metadata(path).map_err(|e| {
        ComputeError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ComputeError::SerializationError(format!(
            "Config size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_CONFIG_FILE_SIZE
        )));
    }

    let text = std::fs::read_to_string(path).map_err(|e| {
        ComputeError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
    })?;
    let config = parse_config(&text)?;
    tracing::debug!(
        path = %path.display(),
        workers = config.workers,
        max_supersteps = config.max_supersteps,
        "Loaded computer configuration"
    );
    Ok(config)
}

/// Parse an isolation level as written on the command line.
pub fn parse_isolation(level: &str) -> Result<Isolation, ComputeError> {
    match level.to_ascii_lowercase().replace('-', "_").as_str() {
        "bsp" => Ok(Isolation::Bsp),
        "dirty_bsp" => Ok(Isolation::DirtyBsp),
        _ => Err(ComputeError::InvalidConfiguration(format!(
            "Unknown isolation: {}. Use: bsp, dirty_bsp",
            level
        ))),
    }
}

// =============================================================================
// OVERRIDES
// =============================================================================

/// Command-line values that replace configured ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub workers: Option<usize>,
    pub max_supersteps: Option<u64>,
}

impl ConfigOverrides {
    /// Apply every override that is set.
    #[must_use]
    pub fn apply(self, mut config: ComputerConfig) -> ComputerConfig {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(max_supersteps) = self.max_supersteps {
            config.max_supersteps = max_supersteps;
        }
        config
    }
}

// =============================================================================
// TESTS
// =============================================================================
