//! Daemon configuration with TOML file support.

use agora_governance::oracle::EscrowReceipt;
use agora_governance::GovernanceParams;
use agora_types::WalletAddress;
use agora_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// One account's voting power in the balance snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub address: WalletAddress,
    pub weight: u64,
}

/// Configuration for the governance daemon.
///
/// Scalar keys come first so the struct always renders as valid TOML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HTTP API port.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Filter directive, e.g. "info" or "info,agora_governance=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between expiry sweeps. Zero disables the sweep; proposals
    /// then close lazily when read.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    #[serde(default)]
    pub governance: GovernanceParams,

    /// Voting power snapshot served to the engine.
    #[serde(default)]
    pub balances: Vec<BalanceEntry>,

    /// Escrow receipts accepted as proposal deposits.
    #[serde(default)]
    pub escrow_receipts: Vec<EscrowReceipt>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./agora_data")
}

fn default_port() -> u16 {
    7080
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_map_size() -> usize {
    1024 * 1024 * 1024
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            port: default_port(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            sweep_interval_secs: default_sweep_interval_secs(),
            map_size: default_map_size(),
            governance: GovernanceParams::default(),
            balances: Vec::new(),
            escrow_receipts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = DaemonConfig::from_toml_str("").unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn full_file_parses() {
        let config = DaemonConfig::from_toml_str(
            r#"
            port = 9000
            log_format = "json"
            sweep_interval_secs = 0

            [governance]
            quorum_threshold = 1000
            min_deposit = 50

            [[balances]]
            address = "0x00000000000000000000000000000000000000A1"
            weight = 850000

            [[escrow_receipts]]
            reference = "tx-1"
            depositor = "0x00000000000000000000000000000000000000a1"
            amount = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.sweep_interval_secs, 0);
        assert_eq!(config.governance.quorum_threshold, 1000);
        assert_eq!(config.governance.max_title_len, 200);
        assert_eq!(config.balances[0].weight, 850_000);
        // Addresses normalise, so the receipt's depositor matches the balance entry.
        assert_eq!(config.balances[0].address, config.escrow_receipts[0].depositor);
    }

    #[test]
    fn bad_address_is_rejected() {
        let err = DaemonConfig::from_toml_str(
            r#"
            [[balances]]
            address = "alice"
            weight = 1
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn renders_and_reparses() {
        let mut config = DaemonConfig::default();
        config.balances.push(BalanceEntry {
            address: WalletAddress::parse("0x00000000000000000000000000000000000000a1").unwrap(),
            weight: 5,
        });
        let text = config.to_toml_string().unwrap();
        assert_eq!(DaemonConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = DaemonConfig::from_toml_file(&path).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}
