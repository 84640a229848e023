//! Wallet configuration, loaded from `~/.veil-wallet/config.toml`.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use veil_account_keys::Network;
use veil_transaction_core::constants::{DEFAULT_RING_SIZE, MAX_RING_SIZE, MIN_RING_SIZE};

use crate::ledger::DEFAULT_FEE_PER_BYTE;

/// Top-level wallet configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Network addresses are encoded for
    #[serde(default)]
    pub network: Network,

    /// JSON-RPC node URLs, tried in order
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Ring size for new transactions
    #[serde(default = "default_ring_size")]
    pub ring_size: usize,

    /// Fee per serialized byte when a send names no explicit fee
    #[serde(default = "default_fee_per_byte")]
    pub fee_per_byte: u64,

    /// Timeout for a single RPC request
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Encrypted store parameters
    #[serde(default)]
    pub store: StoreConfig,
}

/// Argon2id parameters for the encrypted wallet store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_argon2_memory_kb")]
    pub argon2_memory_kb: u32,
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            argon2_memory_kb: default_argon2_memory_kb(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            nodes: default_nodes(),
            ring_size: default_ring_size(),
            fee_per_byte: default_fee_per_byte(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            store: StoreConfig::default(),
        }
    }
}

fn default_nodes() -> Vec<String> {
    vec!["http://127.0.0.1:48655".to_string()]
}

fn default_ring_size() -> usize {
    DEFAULT_RING_SIZE
}

fn default_fee_per_byte() -> u64 {
    DEFAULT_FEE_PER_BYTE
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

fn default_argon2_memory_kb() -> u32 {
    65536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

impl WalletConfig {
    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file, or the defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms)
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }

    /// Reject values the wallet cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(MIN_RING_SIZE..=MAX_RING_SIZE).contains(&self.ring_size) {
            return Err(anyhow!(
                "ring_size must be between {} and {}, got {}",
                MIN_RING_SIZE,
                MAX_RING_SIZE,
                self.ring_size
            ));
        }
        if self.nodes.is_empty() {
            return Err(anyhow!("at least one node must be configured"));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(anyhow!("rpc_timeout_secs must be positive"));
        }
        Ok(())
    }
}

/// Get the default data directory
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".veil-wallet"))
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Get the default config file path
pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_data_dir()?.join("config.toml"))
}

/// Directory holding the encrypted wallet files
pub fn wallets_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("wallets")
}
