//! Checkpoint persistence gateway
//!
//! The registry never talks to storage itself. A store reads its entries
//! first and only then hands them to the registry, so the registry lock is
//! held for the in-memory merge and nothing else.

use tracing::info;

use super::registry::{AddOutcome, CheckpointRegistry};
use crate::crypto::Hash;
use crate::storage::StorageError;

/// What a startup load did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Entries read from storage
    pub read: usize,
    /// Entries that were new to the registry
    pub added: usize,
}

/// Durable storage for learned checkpoints
pub trait CheckpointStore {
    /// Merge stored checkpoints into `registry` with `add_checkpoint` rules.
    ///
    /// On failure, whatever was merged before the failure stays merged.
    fn load_into(&self, registry: &CheckpointRegistry) -> Result<LoadSummary, StorageError>;

    /// Persist a checkpoint. Rebinding a stored height to another hash fails.
    fn save_checkpoint(&self, height: u32, hash: &Hash) -> Result<(), StorageError>;
}

/// Register a checkpoint learned at runtime and persist it.
///
/// A conflict with a registered entry is refused (the registry logs it) and
/// nothing is written in that case.
pub fn learn_checkpoint<S>(
    registry: &CheckpointRegistry,
    store: &S,
    height: u32,
    hash: Hash,
) -> Result<AddOutcome, StorageError>
where
    S: CheckpointStore + ?Sized,
{
    let outcome = registry.add_checkpoint(height, hash)?;

    if outcome == AddOutcome::Added {
        store.save_checkpoint(height, &hash)?;
        info!(height, %hash, "checkpoint persisted");
    }

    Ok(outcome)
}
