use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IntunewinError, IntunewinResult};

/// Top-level tool configuration (loaded from intunewin.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntunewinConfig {
    pub log: LogConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory used when no --output flag is given (default: ".")
    pub dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl IntunewinConfig {
    /// Load the config file at `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> IntunewinResult<Self> {
        if !path.exists() {
            tracing::debug!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| IntunewinError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn to_toml_pretty(&self) -> IntunewinResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| IntunewinError::Config(format!("serializing config: {e}")))
    }
}
