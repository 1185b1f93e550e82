//! Multi-objective evolutionary search over graph partitions.
//!
//! # Overview
//!
//! - **Candidates** (`candidate`): a chromosome with its scores, genealogy and
//!   NSGA-II bookkeeping
//! - **NSGA-II** (`nsga2`): fast non-dominated sort, crowding distance and
//!   crowded-comparison tournaments
//! - **Engine** (`search`): the generational loop with periodic local-search
//!   refinement of offspring
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use district_evolve::compute::MasterGraph;
//! use district_evolve::compute::evolution::EvolutionEngine;
//! use district_evolve::schema::EvolutionConfig;
//!
//! let graph = Arc::new(MasterGraph::grid(10, 10, 4).unwrap());
//! let config = EvolutionConfig {
//!     generations: 50,
//!     population_size: 40,
//!     ..Default::default()
//! };
//!
//! let mut engine = EvolutionEngine::from_graph(config, graph).unwrap();
//! let result = engine
//!     .run_with_callback(|progress| {
//!         println!("Generation {}: front size {}", progress.generation, progress.front_size);
//!     })
//!     .unwrap();
//!
//! println!("Pareto front: {} partitions", result.pareto_front.len());
//! ```

mod candidate;
mod nsga2;
mod search;

pub use candidate::Candidate;
pub use nsga2::{
    assign_crowding_distance, crowded_comparison, fast_non_dominated_sort, select_survivors,
    tournament_select,
};
pub use search::{EvolutionEngine, ProgressCallback};

use crate::schema::ConfigError;

use super::error::PartitionError;

/// Errors that abort an evolution run.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
}
