//! Database persistence layer using Sled
//!
//! Stores checkpoints learned at runtime so they survive restarts. Keys are
//! big-endian heights, so the tree iterates in height order; values are the
//! raw 32-byte block hashes.

use sled::{Db, Tree};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::checkpoints::{CheckpointError, CheckpointRegistry, CheckpointStore, LoadSummary};
use crate::crypto::Hash;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Corrupt checkpoint record: {0}")]
    CorruptEntry(String),
    #[error("Stored checkpoint at height {height} is {stored}, refusing to overwrite with {proposed}")]
    StoredConflict {
        height: u32,
        stored: Hash,
        proposed: Hash,
    },
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Database wrapper
#[derive(Debug, Clone)]
pub struct CheckpointDB {
    db: Db,
    checkpoints_tree: Tree,
}

impl CheckpointDB {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::from_db(sled::open(path)?)
    }

    /// Throwaway database that is deleted on drop
    pub fn temporary() -> Result<Self, StorageError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, StorageError> {
        let checkpoints_tree = db.open_tree("checkpoints")?;
        Ok(Self {
            db,
            checkpoints_tree,
        })
    }

    /// Get the stored hash for a height
    pub fn get_checkpoint(&self, height: u32) -> Result<Option<Hash>, StorageError> {
        match self.checkpoints_tree.get(height.to_be_bytes())? {
            Some(bytes) => decode_hash(height, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Read every stored checkpoint in height order.
    ///
    /// Returns what was decoded before the first bad record alongside the
    /// error, if any.
    pub fn read_checkpoints(&self) -> (Vec<(u32, Hash)>, Option<StorageError>) {
        let mut entries = Vec::new();

        for item in self.checkpoints_tree.iter() {
            let decoded = item
                .map_err(StorageError::from)
                .and_then(|(key, value)| {
                    let height = decode_height(&key)?;
                    Ok((height, decode_hash(height, &value)?))
                });

            match decoded {
                Ok(entry) => entries.push(entry),
                Err(e) => return (entries, Some(e)),
            }
        }

        (entries, None)
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    /// Number of stored checkpoints
    pub fn len(&self) -> usize {
        self.checkpoints_tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints_tree.is_empty()
    }

    #[cfg(test)]
    fn insert_raw(&self, key: &[u8], value: &[u8]) {
        self.checkpoints_tree.insert(key, value).unwrap();
    }
}

impl CheckpointStore for CheckpointDB {
    fn load_into(&self, registry: &CheckpointRegistry) -> Result<LoadSummary, StorageError> {
        // Storage is read before the registry lock is taken.
        let (entries, read_error) = self.read_checkpoints();
        let read = entries.len();

        let added = registry.merge(entries)?;
        debug!(read, added, "merged stored checkpoints");

        match read_error {
            Some(e) => {
                warn!(read, added, "checkpoint load stopped early: {}", e);
                Err(e)
            }
            None => Ok(LoadSummary { read, added }),
        }
    }

    fn save_checkpoint(&self, height: u32, hash: &Hash) -> Result<(), StorageError> {
        let key = height.to_be_bytes();
        let swapped = self
            .checkpoints_tree
            .compare_and_swap(key, None as Option<&[u8]>, Some(hash.as_bytes().as_slice()))?;

        if let Err(occupied) = swapped {
            let stored = match occupied.current {
                Some(bytes) => decode_hash(height, &bytes)?,
                None => Hash::zero(),
            };
            if stored != *hash {
                return Err(StorageError::StoredConflict {
                    height,
                    stored,
                    proposed: *hash,
                });
            }
        }

        self.db.flush()?;
        Ok(())
    }
}

fn decode_height(key: &[u8]) -> Result<u32, StorageError> {
    let bytes: [u8; 4] = key
        .try_into()
        .map_err(|_| StorageError::CorruptEntry(format!("height key of {} bytes", key.len())))?;
    Ok(u32::from_be_bytes(bytes))
}

fn decode_hash(height: u32, value: &[u8]) -> Result<Hash, StorageError> {
    Hash::from_slice(value).ok_or_else(|| {
        StorageError::CorruptEntry(format!("hash of {} bytes at height {}", value.len(), height))
    })
}
