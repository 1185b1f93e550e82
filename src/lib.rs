//! District Evolve - Multi-objective search for contiguous graph partitions.
//!
//! Given a weighted adjacency graph of geographic units and a target district
//! count `k`, this crate searches for partitions into `k` connected components
//! that trade off competing objectives such as population equality.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, graph input and result types
//! - `compute`: Partition model, objectives, local search and the NSGA-II engine
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rand::SeedableRng;
//! use district_evolve::{
//!     compute::{LocalSearch, MasterGraph, SearchContext},
//!     schema::{LocalSearchConfig, ObjectiveSpec},
//! };
//!
//! // 6-vertex path with unit weights, two districts
//! let graph = Arc::new(MasterGraph::path(6, 2).unwrap());
//! let context = SearchContext::from_specs(
//!     graph,
//!     &[ObjectiveSpec::PopulationEquality { key: "pop".into() }],
//! )
//! .unwrap();
//!
//! // Start from a random partition and hill-climb
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let start = context.random_chromosome(&mut rng).unwrap();
//! let search = LocalSearch::new(&context, LocalSearchConfig::default());
//! let outcome = search.optimize_chromosome(start, &mut rng).unwrap();
//!
//! println!("Scores after {} moves: {:?}", outcome.steps_taken, outcome.state.scores());
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::EvolutionEngine;
pub use compute::{Chromosome, MasterGraph, SearchContext};
pub use schema::{EvolutionConfig, EvolutionResult, RunConfig};
