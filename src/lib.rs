//! FTC Chain Core Library
//!
//! Checkpoint subsystem of a Bitcoin-derived proof-of-work node: the trusted
//! (height, hash) table that blocks deep reorganizations, its persistence,
//! and the verification progress estimate reported while syncing.

pub mod checkpoints;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod params;
pub mod rpc;
pub mod storage;

/// Chain identity
pub mod constants {
    /// Coin name
    pub const COIN_NAME: &str = "freetradechain";

    /// Short chain name used in logs and the binary name
    pub const CHAIN_NAME: &str = "FTC";
}
