//! Network selection
//!
//! A node runs on exactly one of three networks for its whole lifetime.
//! Everything network-specific is looked up through an exhaustive match on
//! [`Network`], so there is no "unknown network" state past startup parsing.

use crate::crypto::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The networks this node can join
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Main,
    Test,
    Regtest,
}

/// A network name that does not match any known network
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown network: {0} (expected main, test or regtest)")]
pub struct UnknownNetwork(pub String);

impl Network {
    pub const ALL: [Network; 3] = [Network::Main, Network::Test, Network::Regtest];

    /// Short name used in logs, config files and RPC output
    pub fn name(&self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        }
    }

    /// Static parameters for this network
    pub fn params(&self) -> &'static NetworkParams {
        NetworkParams::for_network(*self)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}

/// Static per-network parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParams {
    pub network: Network,
    /// Hash of the genesis block
    pub genesis_hash: Hash,
    /// Genesis block timestamp (seconds since Unix epoch)
    pub genesis_time: u32,
    /// P2P message start bytes
    pub message_start: [u8; 4],
    /// Default P2P port
    pub default_port: u16,
    /// Default JSON-RPC port
    pub rpc_port: u16,
}

pub const MAIN_PARAMS: NetworkParams = NetworkParams {
    network: Network::Main,
    genesis_hash: Hash::from_hex_const(
        "d58ffdd8534a6aa9b2fbf5a5bff495f6dc559cecc6a06f7066819e9ca2ed215d",
    ),
    genesis_time: 1_525_718_667,
    message_start: [0xaa, 0x44, 0x1b, 0xcd],
    default_port: 7795,
    rpc_port: 17935,
};

pub const TEST_PARAMS: NetworkParams = NetworkParams {
    network: Network::Test,
    genesis_hash: Hash::from_hex_const(
        "8db73dd7bf5ee3fd9a2c2d584e3dfde4bccf206a1e4d483d3473e98baeb55ceb",
    ),
    genesis_time: 1_525_709_542,
    message_start: [0xbb, 0xdc, 0x54, 0xb2],
    default_port: 17799,
    rpc_port: 17980,
};

// Regtest has no RPC port of its own and shares testnet's.
pub const REGTEST_PARAMS: NetworkParams = NetworkParams {
    network: Network::Regtest,
    genesis_hash: Hash::from_hex_const(
        "e682df48d25894dde8202b9d7f93cc05369ad53e537371e7d45b8a73f7c39faf",
    ),
    genesis_time: 1_525_708_221,
    message_start: [0xcc, 0x5b, 0x6b, 0xa6],
    default_port: 17791,
    rpc_port: 17980,
};

impl NetworkParams {
    /// Look up the parameter table for `network`
    pub fn for_network(network: Network) -> &'static NetworkParams {
        match network {
            Network::Main => &MAIN_PARAMS,
            Network::Test => &TEST_PARAMS,
            Network::Regtest => &REGTEST_PARAMS,
        }
    }
}
