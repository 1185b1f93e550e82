//! Search context: the master graph and objectives for one run.

use std::fmt;
use std::sync::Arc;

use rand::Rng;

use crate::schema::ObjectiveSpec;

use super::chromosome::{Chromosome, ComponentScore};
use super::error::PartitionError;
use super::graph::MasterGraph;
use super::objective::{Objective, build_objectives};

/// Read-only state shared by every chromosome and worker in a run.
pub struct SearchContext {
    graph: Arc<MasterGraph>,
    objectives: Vec<Box<dyn Objective>>,
}

impl SearchContext {
    /// Validate the graph against the objectives and freeze both.
    pub fn new(
        graph: Arc<MasterGraph>,
        objectives: Vec<Box<dyn Objective>>,
    ) -> Result<Self, PartitionError> {
        if objectives.is_empty() {
            return Err(PartitionError::NotInitialized("objectives"));
        }
        if graph.num_vertices() == 0 {
            return Err(PartitionError::NotInitialized("vertices"));
        }
        for key in objectives.iter().filter_map(|o| o.weight_key()) {
            if graph.column_index(key).is_none() {
                return Err(PartitionError::UnknownWeightKey(key.to_string()));
            }
            if let Some(vertex) = graph.find_missing_weight(key) {
                return Err(PartitionError::MissingWeight {
                    vertex,
                    key: key.to_string(),
                });
            }
        }
        if !graph.is_connected() {
            log::warn!(
                "Master graph is disconnected; {} districts may be unreachable",
                graph.districts()
            );
        }

        Ok(Self { graph, objectives })
    }

    /// Build objectives from configuration, then the context.
    pub fn from_specs(
        graph: Arc<MasterGraph>,
        specs: &[ObjectiveSpec],
    ) -> Result<Self, PartitionError> {
        let objectives = build_objectives(specs, &graph)?;
        Self::new(graph, objectives)
    }

    pub fn graph(&self) -> &Arc<MasterGraph> {
        &self.graph
    }

    pub fn objectives(&self) -> &[Box<dyn Objective>] {
        &self.objectives
    }

    pub fn num_objectives(&self) -> usize {
        self.objectives.len()
    }

    pub fn objective_names(&self) -> Vec<String> {
        self.objectives.iter().map(|o| o.name().to_string()).collect()
    }

    /// Score vector of a chromosome.
    pub fn evaluate(&self, chromosome: &Chromosome) -> Vec<f64> {
        self.evaluate_components(chromosome.component_scores())
    }

    /// Score vector of raw component aggregates (e.g. a move preview).
    pub fn evaluate_components(&self, scores: &[ComponentScore]) -> Vec<f64> {
        self.objectives.iter().map(|o| o.evaluate(scores)).collect()
    }

    pub fn random_chromosome<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Chromosome, PartitionError> {
        Chromosome::random(Arc::clone(&self.graph), rng)
    }
}

impl fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchContext")
            .field("vertices", &self.graph.num_vertices())
            .field("edges", &self.graph.num_edges())
            .field("districts", &self.graph.districts())
            .field("objectives", &self.objective_names())
            .finish()
    }
}
