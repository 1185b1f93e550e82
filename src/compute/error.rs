//! Partition and search errors.

use super::chromosome::ComponentId;
use super::graph::VertexId;

/// Errors raised by partition construction, moves and scoring.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    #[error("Assignment has {actual} entries but the graph has {expected} vertices")]
    AssignmentLength { expected: usize, actual: usize },
    #[error("Vertices {i} and {j} are in the same component {component}")]
    SameComponent {
        i: VertexId,
        j: VertexId,
        component: ComponentId,
    },
    #[error("Vertex {vertex} has no weight for key {key:?}")]
    MissingWeight { vertex: VertexId, key: String },
    #[error("Weight key {0:?} is not present in the graph")]
    UnknownWeightKey(String),
    #[error("Unknown vertex {0}")]
    UnknownVertex(VertexId),
    #[error("Search context not initialized: no {0}")]
    NotInitialized(&'static str),
    #[error("Inconsistent search state (tracked scores {tracked:?}, recomputed {recomputed:?})")]
    InconsistentSearchState {
        tracked: Vec<f64>,
        recomputed: Vec<f64>,
    },
}
