//! Operator configuration, set in code or loaded from TOML.

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Default capacity of each per-key inbox
pub const DEFAULT_BUFFER_CAPACITY: usize = 16;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("max_concurrent_keys must be greater than zero")]
    ZeroMaxConcurrentKeys,

    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("buffer_capacity must be greater than zero")]
    ZeroBufferCapacity,
}

/// Operator settings as written by the caller
///
/// ```toml
/// max_concurrent_keys = 2
/// batch_size = 10
/// buffer_capacity = 16
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupByConfig {
    /// Maximum number of simultaneously open substreams
    pub max_concurrent_keys: usize,
    /// Window size; absent means one window per substream
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

/// Checked settings the operator runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub max_concurrent_keys: NonZeroUsize,
    pub batch_size: Option<NonZeroUsize>,
    pub buffer_capacity: NonZeroUsize,
}

impl GroupByConfig {
    pub fn new(max_concurrent_keys: usize) -> Self {
        Self {
            max_concurrent_keys,
            batch_size: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let max_concurrent_keys =
            NonZeroUsize::new(self.max_concurrent_keys).ok_or(ConfigError::ZeroMaxConcurrentKeys)?;
        let batch_size = match self.batch_size {
            Some(size) => Some(NonZeroUsize::new(size).ok_or(ConfigError::ZeroBatchSize)?),
            None => None,
        };
        let buffer_capacity =
            NonZeroUsize::new(self.buffer_capacity).ok_or(ConfigError::ZeroBufferCapacity)?;

        Ok(ValidatedConfig {
            max_concurrent_keys,
            batch_size,
            buffer_capacity,
        })
    }
}
