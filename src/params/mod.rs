//! Network parameters - the closed set of networks and their static tables

mod network;

pub use network::*;
