//! Schema module - Configuration, graph input and result types.

mod config;
mod evolution;
mod graph;

pub use config::*;
pub use evolution::*;
pub use graph::*;
