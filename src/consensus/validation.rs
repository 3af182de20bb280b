//! Block acceptance checks
//!
//! Proof of work, scripts and transactions are verified elsewhere. What lives
//! here is the part that keeps history below the checkpoints fixed.

use crate::checkpoints::CheckpointRegistry;
use crate::crypto::Hash;
use crate::storage::BlockIndexLookup;
use thiserror::Error;
use tracing::warn;

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown parent block {0}")]
    UnknownParent(Hash),
    #[error("Block {0} already indexed")]
    DuplicateBlock(Hash),
    #[error("Block {hash} at height {height} does not match the checkpoint")]
    CheckpointMismatch { height: u32, hash: Hash },
    #[error("Block at height {height} forks below the last checkpoint at height {checkpoint_height}")]
    ForkBelowCheckpoint { height: u32, checkpoint_height: u32 },
    #[error("Transaction count overflows at height {height}")]
    TxCountOverflow { height: u32 },
}

/// Check a candidate block against the checkpoints.
///
/// The block must match any checkpoint at its own height. When the local
/// index already holds a checkpoint, the block must also sit above it and
/// descend from it: history under that point is fixed, so anything else is
/// a fork.
pub fn validate_checkpoints<L>(
    checkpoints: &CheckpointRegistry,
    index: &L,
    height: u32,
    hash: &Hash,
    prev_hash: &Hash,
) -> Result<(), ValidationError>
where
    L: BlockIndexLookup + ?Sized,
{
    if !checkpoints.check_block(height, hash) {
        warn!(height, %hash, "rejected block: checkpoint mismatch");
        return Err(ValidationError::CheckpointMismatch {
            height,
            hash: *hash,
        });
    }

    if let Some(checkpoint) = checkpoints.last_local_checkpoint(index) {
        let forks = if height > checkpoint.height {
            index
                .ancestor(prev_hash, checkpoint.height)
                .map_or(true, |node| node.hash != checkpoint.hash)
        } else {
            height < checkpoint.height
        };

        if forks {
            warn!(
                height,
                %hash,
                checkpoint_height = checkpoint.height,
                "rejected block: forked chain older than last checkpoint"
            );
            return Err(ValidationError::ForkBelowCheckpoint {
                height,
                checkpoint_height: checkpoint.height,
            });
        }
    }

    Ok(())
}
