//! JSON-RPC API Module
//!
//! HTTP status surface for checkpoints and sync progress.

mod methods;
mod server;

pub use methods::*;
pub use server::*;
