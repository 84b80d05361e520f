//! Service configuration.
//!
//! Loaded from `$PAYWALL_CONFIG` or `./paywall.toml`; a missing file means
//! defaults.

use std::path::{Path, PathBuf};

use paywall_ledger::access::DEFAULT_REFUND_WINDOW_TICKS;
use paywall_types::{
    AccountId, ContractRef, DEFAULT_FEE_BASIS_POINTS, LEGACY_SCHEMA_VERSION, MAX_FEE_BASIS_POINTS,
};
use serde::{Deserialize, Serialize};

use crate::{PaywallError, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PAYWALL_CONFIG";

/// Config file used when the environment variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "paywall.toml";

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaywallConfig {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Platform identity and fee settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Account allowed to run administrative operations.
    #[serde(default)]
    pub owner: AccountId,
    /// Account receiving platform fees.
    #[serde(default)]
    pub fee_account: AccountId,
    /// Platform fee, max 1000 (10%).
    #[serde(default = "default_fee_basis_points")]
    pub fee_basis_points: u16,
}

/// Pay-per-view settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Ticks after purchase during which the creator may refund.
    #[serde(default = "default_refund_window")]
    pub refund_window_ticks: u64,
}

/// Legacy rule migration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Legacy store consulted when a rule is set for an unmigrated id.
    /// Unset disables opportunistic migration.
    #[serde(default)]
    pub legacy_source: Option<ContractRef>,
    /// Path of the SQLite legacy rule file used by tooling.
    #[serde(default)]
    pub legacy_db: Option<PathBuf>,
    /// Schema version the service starts at.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_fee_basis_points() -> u16 {
    DEFAULT_FEE_BASIS_POINTS
}

fn default_refund_window() -> u64 {
    DEFAULT_REFUND_WINDOW_TICKS
}

fn default_schema_version() -> String {
    LEGACY_SCHEMA_VERSION.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            owner: AccountId::default(),
            fee_account: AccountId::default(),
            fee_basis_points: default_fee_basis_points(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            refund_window_ticks: default_refund_window(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            legacy_source: None,
            legacy_db: None,
            schema_version: default_schema_version(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl PaywallConfig {
    /// Load configuration from the default location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PaywallError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PaywallConfig =
            toml::from_str(content).map_err(|e| PaywallError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PaywallError::Config(e.to_string()))
    }

    /// Reject values the service can not run with.
    pub fn validate(&self) -> Result<()> {
        if self.platform.fee_basis_points > MAX_FEE_BASIS_POINTS {
            return Err(PaywallError::Config(format!(
                "fee_basis_points {} exceeds {MAX_FEE_BASIS_POINTS}",
                self.platform.fee_basis_points
            )));
        }
        if self.migration.schema_version.is_empty() {
            return Err(PaywallError::Config("schema_version is empty".to_string()));
        }
        if self.platform.owner.is_zero() {
            tracing::warn!("platform owner is the zero account");
        }
        Ok(())
    }

    /// The config file path.
    pub fn config_path() -> PathBuf {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }
}
