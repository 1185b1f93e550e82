//! Compute module - Partition model, objectives and search algorithms.

mod chromosome;
mod context;
mod error;
mod graph;
mod hypotheticals;
mod local_search;
mod objective;

pub mod evolution;

pub use chromosome::*;
pub use context::*;
pub use error::*;
pub use graph::*;
pub use hypotheticals::*;
pub use local_search::*;
pub use objective::*;
