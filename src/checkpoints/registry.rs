//! Checkpoint registry
//!
//! The table of trusted (height, hash) pairs for the active network. It is
//! shared between block acceptance, the RPC status surface and the startup
//! loader, so every operation goes through a single mutex and holds it only
//! for the in-memory work.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::dataset::{dataset_for, Baseline, CheckpointDataset};
use crate::crypto::Hash;
use crate::params::Network;
use crate::storage::{BlockIndexLookup, ChainNode};

/// Checkpoint errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("Conflicting checkpoint at height {height}: have {existing}, refusing {proposed}")]
    Conflict {
        height: u32,
        existing: Hash,
        proposed: Hash,
    },
}

/// Result of a successful insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The entry was new
    Added,
    /// The same (height, hash) pair was already registered
    AlreadyPresent,
}

#[derive(Debug)]
struct Inner {
    checkpoints: BTreeMap<u32, Hash>,
    enabled: bool,
}

impl Inner {
    fn insert(&mut self, height: u32, hash: Hash) -> Result<AddOutcome, CheckpointError> {
        match self.checkpoints.get(&height) {
            Some(existing) if *existing == hash => Ok(AddOutcome::AlreadyPresent),
            Some(existing) => Err(CheckpointError::Conflict {
                height,
                existing: *existing,
                proposed: hash,
            }),
            None => {
                self.checkpoints.insert(height, hash);
                Ok(AddOutcome::Added)
            }
        }
    }
}

/// Trusted checkpoints for the active network
#[derive(Debug)]
pub struct CheckpointRegistry {
    network: Network,
    baseline: Baseline,
    inner: Mutex<Inner>,
}

impl CheckpointRegistry {
    /// Enforcing registry seeded from the compiled-in dataset for `network`
    pub fn new(network: Network) -> Self {
        Self::with_enabled(network, true)
    }

    /// Registry seeded from the compiled-in dataset for `network`
    pub fn with_enabled(network: Network, enabled: bool) -> Self {
        Self::from_dataset(network, dataset_for(network), enabled)
    }

    /// Registry seeded from an explicit dataset
    pub fn from_dataset(network: Network, dataset: &CheckpointDataset, enabled: bool) -> Self {
        let checkpoints: BTreeMap<u32, Hash> = dataset.checkpoints.iter().copied().collect();
        debug!(
            network = %network,
            count = checkpoints.len(),
            enabled,
            "checkpoint registry initialised"
        );

        Self {
            network,
            baseline: dataset.baseline,
            inner: Mutex::new(Inner {
                checkpoints,
                enabled,
            }),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Baseline statistics of the bound dataset
    pub fn baseline(&self) -> Baseline {
        self.baseline
    }

    /// Whether checkpoints are being enforced
    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    /// Turn enforcement on or off. Entries are kept either way.
    pub fn set_enabled(&self, enabled: bool) {
        let mut inner = self.inner.lock();
        if inner.enabled != enabled {
            if enabled {
                info!("checkpoint enforcement enabled");
            } else {
                warn!("checkpoint enforcement disabled");
            }
        }
        inner.enabled = enabled;
    }

    /// Block acceptance gate.
    ///
    /// Returns `false` only when `height` is registered with a different
    /// hash; callers must then reject the block. Heights without an entry are
    /// unconstrained.
    pub fn check_block(&self, height: u32, hash: &Hash) -> bool {
        let inner = self.inner.lock();
        if !inner.enabled {
            return true;
        }

        match inner.checkpoints.get(&height) {
            Some(expected) => expected == hash,
            None => true,
        }
    }

    /// Height of the highest checkpoint, or 0 when disabled.
    ///
    /// Only meant for progress display, never for consensus decisions.
    pub fn total_blocks_estimate(&self) -> u32 {
        let inner = self.inner.lock();
        if !inner.enabled {
            return 0;
        }

        inner
            .checkpoints
            .last_key_value()
            .map(|(height, _)| *height)
            .unwrap_or(0)
    }

    /// Highest checkpoint whose block the local index actually holds.
    ///
    /// The lookup runs after the lock is released, so `index` may itself
    /// consult this registry.
    pub fn last_local_checkpoint<'a, L>(&self, index: &'a L) -> Option<&'a ChainNode>
    where
        L: BlockIndexLookup + ?Sized,
    {
        let descending: Vec<Hash> = {
            let inner = self.inner.lock();
            if !inner.enabled {
                return None;
            }
            inner.checkpoints.values().rev().copied().collect()
        };

        descending.iter().find_map(|hash| index.lookup(hash))
    }

    /// Registered heights strictly above `height`, ascending
    pub fn checkpoint_heights_after(&self, height: u32) -> Vec<u32> {
        let inner = self.inner.lock();
        if !inner.enabled {
            return Vec::new();
        }

        inner
            .checkpoints
            .range((Bound::Excluded(height), Bound::Unbounded))
            .map(|(h, _)| *h)
            .collect()
    }

    /// Hash registered at `height`, if any
    pub fn get(&self, height: u32) -> Option<Hash> {
        let inner = self.inner.lock();
        if !inner.enabled {
            return None;
        }
        inner.checkpoints.get(&height).copied()
    }

    /// Register a trusted checkpoint.
    ///
    /// Inserting an existing pair again is a no-op. A different hash at a
    /// registered height is refused and the original entry is kept.
    pub fn add_checkpoint(&self, height: u32, hash: Hash) -> Result<AddOutcome, CheckpointError> {
        let result = self.inner.lock().insert(height, hash);

        match &result {
            Ok(AddOutcome::Added) => info!(height, %hash, "checkpoint added"),
            Ok(AddOutcome::AlreadyPresent) => debug!(height, %hash, "checkpoint already known"),
            Err(e) => error!("{}", e),
        }

        result
    }

    /// Merge a batch of entries under one lock acquisition, with the same
    /// rules as [`add_checkpoint`](Self::add_checkpoint).
    ///
    /// Stops at the first conflict; entries merged before it are kept.
    /// Returns the number of new entries.
    pub fn merge<I>(&self, entries: I) -> Result<usize, CheckpointError>
    where
        I: IntoIterator<Item = (u32, Hash)>,
    {
        let mut inner = self.inner.lock();
        let mut added = 0;

        for (height, hash) in entries {
            if inner.insert(height, hash)? == AddOutcome::Added {
                added += 1;
            }
        }

        Ok(added)
    }

    /// Point-in-time copy of the registered checkpoints, empty when disabled
    pub fn snapshot(&self) -> BTreeMap<u32, Hash> {
        let inner = self.inner.lock();
        if !inner.enabled {
            return BTreeMap::new();
        }
        inner.checkpoints.clone()
    }

    /// Number of stored entries, regardless of the enable flag
    pub fn len(&self) -> usize {
        self.inner.lock().checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
