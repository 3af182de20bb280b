//! Node configuration
//!
//! Settings come from an optional TOML file, then command-line flags win.
//! The network name is checked here; past this point the network is an enum
//! and every lookup on it is exhaustive.

use crate::params::{Network, UnknownNetwork};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    UnknownNetwork(#[from] UnknownNetwork),
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Command-line flags
#[derive(Debug, Default, Parser)]
#[command(name = "ftc-node", version, about = "Checkpointing node for the FTC chain")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Network to join: main, test or regtest
    #[arg(long)]
    pub network: Option<String>,

    /// Data directory
    #[arg(long)]
    pub datadir: Option<PathBuf>,

    /// JSON-RPC port (defaults to the network's RPC port)
    #[arg(long)]
    pub rpcport: Option<u16>,

    /// Disable checkpoint enforcement
    #[arg(long)]
    pub nocheckpoints: bool,

    /// Log filter, e.g. "info" or "ftc_core=debug"
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Contents of the config file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub network: String,
    pub data_dir: PathBuf,
    pub rpc_port: Option<u16>,
    pub checkpoints: bool,
    pub log_level: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            network: Network::Main.name().to_string(),
            data_dir: PathBuf::from("ftc-data"),
            rpc_port: None,
            checkpoints: true,
            log_level: "info".to_string(),
        }
    }
}

impl FileConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }
}

/// Resolved node settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub network: Network,
    /// Root data directory, before the per-network subdirectory
    pub data_dir: PathBuf,
    pub rpc_port: u16,
    /// Whether checkpoints are enforced
    pub checkpoints: bool,
    pub log_level: String,
}

impl NodeConfig {
    /// Resolve settings from the config file named on the command line (if
    /// any) and the flags themselves
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, cli)
    }

    pub fn resolve(file: FileConfig, cli: &Cli) -> Result<Self, ConfigError> {
        let network: Network = cli.network.as_deref().unwrap_or(&file.network).parse()?;

        Ok(Self {
            network,
            data_dir: cli.datadir.clone().unwrap_or(file.data_dir),
            rpc_port: cli
                .rpcport
                .or(file.rpc_port)
                .unwrap_or(network.params().rpc_port),
            checkpoints: file.checkpoints && !cli.nocheckpoints,
            log_level: cli.log_level.clone().unwrap_or(file.log_level),
        })
    }

    /// Per-network directory: mainnet uses the root, others a subdirectory
    pub fn network_dir(&self) -> PathBuf {
        match self.network {
            Network::Main => self.data_dir.clone(),
            Network::Test => self.data_dir.join("testnet"),
            Network::Regtest => self.data_dir.join("regtest"),
        }
    }

    /// Location of the checkpoint database
    pub fn checkpoint_db_path(&self) -> PathBuf {
        self.network_dir().join("checkpoints")
    }
}
