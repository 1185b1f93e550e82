//! Serializable graph input.
//!
//! [`GraphDocument`] mirrors the in-memory [`MasterGraph`]: vertices with named
//! weights and an optional geometry handle, plus an undirected edge list.
//! [`GraphSource`] says where a run gets its graph from.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::compute::{DEFAULT_WEIGHT_KEY, GeometryHandle, GraphError, MasterGraph, VertexId};

/// One vertex of a graph document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VertexRecord {
    pub id: VertexId,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub geometry: Option<u64>,
}

/// Serde mirror of [`MasterGraph`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphDocument {
    /// Target number of districts.
    pub districts: usize,
    pub vertices: Vec<VertexRecord>,
    #[serde(default)]
    pub edges: Vec<(VertexId, VertexId)>,
}

impl GraphDocument {
    /// Read a graph document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GraphSourceError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Build the in-memory graph. Vertex order follows the document.
    pub fn into_graph(self) -> Result<MasterGraph, GraphError> {
        let mut graph = MasterGraph::new(self.districts)?;
        for vertex in &self.vertices {
            graph.add_vertex(vertex.id);
        }
        for vertex in self.vertices {
            for (key, value) in &vertex.weights {
                graph.set_weight(vertex.id, key, *value)?;
            }
            if let Some(handle) = vertex.geometry {
                graph.set_geometry(vertex.id, GeometryHandle(handle))?;
            }
        }
        for (a, b) in self.edges {
            for id in [a, b] {
                if graph.index_of(id).is_none() {
                    return Err(GraphError::UnknownVertex(id));
                }
            }
            graph.add_edge(a, b)?;
        }
        Ok(graph)
    }

    /// Capture an in-memory graph.
    pub fn from_graph(graph: &MasterGraph) -> Self {
        let vertices = (0..graph.num_vertices())
            .map(|index| VertexRecord {
                id: graph.vertex_id(index),
                weights: (0..graph.num_weight_columns())
                    .filter_map(|column| {
                        graph
                            .weight(column, index)
                            .map(|value| (graph.column_key(column).to_string(), value))
                    })
                    .collect(),
                geometry: graph.geometry(index).map(|handle| handle.0),
            })
            .collect();
        let edges = graph
            .edges()
            .iter()
            .map(|&(u, v)| (graph.vertex_id(u), graph.vertex_id(v)))
            .collect();

        Self {
            districts: graph.districts(),
            vertices,
            edges,
        }
    }
}

/// Where a run's graph comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GraphSource {
    /// A JSON [`GraphDocument`] on disk.
    File { path: String },
    /// A document embedded in the run config.
    Inline { graph: GraphDocument },
    /// Synthetic `rows x cols` grid. Weights are uniform integers in
    /// `1..=max_weight`, or 1 when `max_weight` is absent.
    Grid {
        rows: usize,
        cols: usize,
        districts: usize,
        #[serde(default = "default_weight_keys")]
        weight_keys: Vec<String>,
        #[serde(default)]
        max_weight: Option<u32>,
        #[serde(default)]
        seed: Option<u64>,
    },
}

fn default_weight_keys() -> Vec<String> {
    vec![DEFAULT_WEIGHT_KEY.to_string()]
}

impl GraphSource {
    /// Produce the master graph.
    pub fn load(&self) -> Result<MasterGraph, GraphSourceError> {
        match self {
            Self::File { path } => Ok(GraphDocument::load(path)?.into_graph()?),
            Self::Inline { graph } => Ok(graph.clone().into_graph()?),
            Self::Grid {
                rows,
                cols,
                districts,
                weight_keys,
                max_weight,
                seed,
            } => {
                let mut rng = StdRng::seed_from_u64(seed.unwrap_or_else(rand::random));
                let mut graph = MasterGraph::lattice(*rows, *cols, *districts)?;
                for id in 0..(rows * cols) as VertexId {
                    for key in weight_keys {
                        let value = match max_weight {
                            Some(max) => rng.gen_range(1..=(*max).max(1)) as f64,
                            None => 1.0,
                        };
                        graph.set_weight(id, key, value)?;
                    }
                }
                Ok(graph)
            }
        }
    }
}

/// Graph loading errors.
#[derive(Debug, thiserror::Error)]
pub enum GraphSourceError {
    #[error("Failed to read graph: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse graph: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),
}
