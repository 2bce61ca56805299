//! Scan settings.
//!
//! Every field has a documented default, so an empty JSON object is a valid
//! settings file. The allow-list is deliberately absent: it cannot be widened
//! from a file.

use crate::output::OutputFormat;
use crate::scanner::ScanJob;
use crate::types::ResolverKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid config file '{path}': {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("invalid setting: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables for a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Per-probe connect timeout in milliseconds.
    pub timeout_ms: u64,
    /// Pause after each port in milliseconds. A concurrent scan uses it as
    /// the minimum spacing of probe starts instead.
    pub pacing_ms: u64,
    /// Maximum probes in flight.
    pub concurrency: usize,
    /// Resolver used for hostnames.
    pub resolver: ResolverKind,
    /// Report format.
    pub format: OutputFormat,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            pacing_ms: 10,
            concurrency: 1,
            resolver: ResolverKind::System,
            format: OutputFormat::Plain,
        }
    }
}

impl ScanSettings {
    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults, or the contents of `path` when given.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// The scan loop configuration these settings describe.
    pub fn job(&self) -> ScanJob {
        ScanJob::new()
            .with_pacing(self.pacing())
            .with_concurrency(self.concurrency)
    }
}
