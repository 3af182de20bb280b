//! Checkpoints - trusted (height, hash) pairs, enforcement and progress estimation

mod dataset;
mod registry;
mod progress;
mod store;

pub use dataset::*;
pub use registry::*;
pub use progress::*;
pub use store::*;
