//! Storage module - block index and checkpoint persistence

mod state;
pub mod db;

pub use state::*;
pub use db::{CheckpointDB, StorageError};
