use crate::allocation::engine::{AllocationEngine, RemainderPolicy};
use crate::core::currency::CurrencyCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a config file when none is given explicitly.
pub const CONFIG_ENV_VAR: &str = "CUSTOMS_LIQUIDATION_CONFIG";

/// Allocated figures keep at most this many decimal places.
pub const MAX_ALLOCATION_SCALE: u32 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Pipeline settings, read from JSON. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Settlement currency; amounts in it convert at rate 1.
    pub local_currency: CurrencyCode,
    /// Decimal places kept on allocated freight, insurance and weight.
    pub allocation_scale: u32,
    pub remainder_policy: RemainderPolicy,
    /// Default `env_logger` filter, overridden by `RUST_LOG`.
    pub log_filter: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            local_currency: CurrencyCode::new("XOF"),
            allocation_scale: 2,
            remainder_policy: RemainderPolicy::None,
            log_filter: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load from the file named by `CUSTOMS_LIQUIDATION_CONFIG`, or use the
    /// defaults when it is unset.
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_file(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local_currency.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("local_currency is empty".into()));
        }
        if self.allocation_scale > MAX_ALLOCATION_SCALE {
            return Err(ConfigError::Invalid(format!(
                "allocation_scale {} exceeds {}",
                self.allocation_scale, MAX_ALLOCATION_SCALE
            )));
        }
        Ok(())
    }

    pub fn allocation_engine(&self) -> AllocationEngine {
        AllocationEngine::new(self.allocation_scale, self.remainder_policy)
    }
}
