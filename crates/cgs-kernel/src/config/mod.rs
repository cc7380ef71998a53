//! Ledger configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default snapshot window length in minutes
pub const DEFAULT_WINDOW_MINUTES: f64 = 15.0;
/// Default spacing between execution samples
pub const DEFAULT_SAMPLE_RATE_MS: u64 = 60_000;

/// Settings for assembling ledger records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Tenant stamped on every record
    pub tenant: String,
    /// Operator stamped on every record
    pub operator: String,
    /// Length of the snapshot window; non-positive or non-finite falls back to 15
    pub wave_window_minutes: f64,
    /// Expected spacing of execution samples; sets the window's sample limit
    pub sample_rate_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tenant: "default".to_string(),
            operator: "system".to_string(),
            wave_window_minutes: DEFAULT_WINDOW_MINUTES,
            sample_rate_ms: DEFAULT_SAMPLE_RATE_MS,
        }
    }
}

impl LedgerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With tenant
    #[inline]
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    /// With operator
    #[inline]
    #[must_use]
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    /// With window length in minutes
    #[inline]
    #[must_use]
    pub fn with_window_minutes(mut self, minutes: f64) -> Self {
        self.wave_window_minutes = minutes;
        self
    }

    /// With sample rate in milliseconds
    #[inline]
    #[must_use]
    pub fn with_sample_rate_ms(mut self, sample_rate_ms: u64) -> Self {
        self.sample_rate_ms = sample_rate_ms;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Reject blank identity fields.
    ///
    /// Window settings are not checked here; a bad window surfaces as a
    /// `WindowError` when the ledger is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tenant.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "tenant",
                reason: "must not be blank".to_string(),
            });
        }
        if self.operator.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "operator",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }
}
