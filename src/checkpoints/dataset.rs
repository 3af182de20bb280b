//! Compiled-in checkpoint datasets
//!
//! Each network ships one dataset: the trusted (height, hash) pairs known at
//! build time plus the baseline statistics used for progress estimation.
//! A good checkpoint block is surrounded by blocks with sane timestamps and
//! contains no unusual transactions.

use crate::crypto::Hash;
use crate::params::{Network, MAIN_PARAMS, REGTEST_PARAMS, TEST_PARAMS};

/// Reference point for verification progress estimates.
///
/// Independent of the highest registered checkpoint: it only describes how
/// much work the chain held at some known moment and how fast it grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    /// Unix timestamp of the baseline checkpoint block
    pub timestamp: i64,
    /// Total transactions between genesis and the baseline checkpoint
    pub tx_count: u64,
    /// Estimated transactions per day after the baseline
    pub tx_per_day: f64,
}

impl Baseline {
    pub const fn empty() -> Self {
        Self {
            timestamp: 0,
            tx_count: 0,
            tx_per_day: 0.0,
        }
    }
}

/// Checkpoints and baseline for one network
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointDataset {
    /// (height, hash) pairs, ascending by height
    pub checkpoints: &'static [(u32, Hash)],
    pub baseline: Baseline,
}

pub const MAIN_DATASET: CheckpointDataset = CheckpointDataset {
    checkpoints: &[(0, MAIN_PARAMS.genesis_hash)],
    baseline: Baseline::empty(),
};

pub const TEST_DATASET: CheckpointDataset = CheckpointDataset {
    checkpoints: &[(0, TEST_PARAMS.genesis_hash)],
    baseline: Baseline::empty(),
};

pub const REGTEST_DATASET: CheckpointDataset = CheckpointDataset {
    checkpoints: &[(0, REGTEST_PARAMS.genesis_hash)],
    baseline: Baseline::empty(),
};

/// The compiled-in dataset for `network`
pub fn dataset_for(network: Network) -> &'static CheckpointDataset {
    match network {
        Network::Main => &MAIN_DATASET,
        Network::Test => &TEST_DATASET,
        Network::Regtest => &REGTEST_DATASET,
    }
}
