//! Runtime configuration for the ledger, read from an optional YAML file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_MONTHLY_FEE: i64 = 500000;
pub const DEFAULT_MEMBERSHIP_DAYS: u32 = 30;
pub const DEFAULT_EXPIRING_THRESHOLD_DAYS: i64 = 7;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

const APP_DIR_NAME: &str = "Gym";
const DATABASE_FILE_NAME: &str = "gym.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// sqlx connection URL of the SQLite store
    pub database_url: String,
    pub max_connections: u32,
    /// Fee seeded into `settings` on first run
    pub default_monthly_fee: i64,
    /// Length of the first paid-up window when registration doesn't say
    pub default_membership_days: u32,
    /// Window used by the expiring-members report
    pub expiring_threshold_days: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            default_monthly_fee: DEFAULT_MONTHLY_FEE,
            default_membership_days: DEFAULT_MEMBERSHIP_DAYS,
            expiring_threshold_days: DEFAULT_EXPIRING_THRESHOLD_DAYS,
        }
    }
}

impl LedgerConfig {
    /// Read and parse a YAML config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: LedgerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Like [`LedgerConfig::load`], but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

/// `sqlite:<data_dir>/Gym/gym.db`, or `./gym.db` when the platform has no
/// data directory
fn default_database_url() -> String {
    let path = dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(DATABASE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME));
    format!("sqlite:{}", path.display())
}
