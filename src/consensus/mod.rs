//! Consensus module - block headers and checkpoint-based acceptance

mod block;
mod validation;

pub use block::*;
pub use validation::*;
