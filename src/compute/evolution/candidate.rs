//! Population members.

use rand::Rng;

use crate::compute::chromosome::Chromosome;
use crate::compute::context::SearchContext;
use crate::compute::error::PartitionError;
use crate::compute::local_search::LocalSearch;
use crate::compute::objective::{dominates, gradient};
use crate::schema::{CandidateSnapshot, ObjectiveScore};

/// Relative tolerance when comparing tracked and recomputed scores.
const SCORE_TOLERANCE: f64 = 1e-9;

/// A candidate individual in the population.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Unique identifier.
    pub id: u64,
    /// The partition.
    pub chromosome: Chromosome,
    /// One score per objective.
    pub scores: Vec<f64>,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
    /// Pareto rank, 1 for the first front; 0 until sorted.
    pub rank: usize,
    pub crowding_distance: f64,
    /// Number of population members dominating this one.
    pub domination_count: usize,
    /// Population indices this candidate dominates.
    pub dominated_set: Vec<usize>,
}

impl Candidate {
    /// Score `chromosome` and wrap it.
    pub fn new(
        id: u64,
        chromosome: Chromosome,
        context: &SearchContext,
        generation: usize,
        parents: Vec<u64>,
    ) -> Self {
        let scores = context.evaluate(&chromosome);
        Self {
            id,
            chromosome,
            scores,
            generation,
            parents,
            rank: 0,
            crowding_distance: 0.0,
            domination_count: 0,
            dominated_set: Vec::new(),
        }
    }

    /// Clear sorting bookkeeping before a new non-dominated sort.
    pub fn refresh(&mut self) {
        self.rank = 0;
        self.crowding_distance = 0.0;
        self.domination_count = 0;
        self.dominated_set.clear();
    }

    pub fn dominates(&self, other: &Candidate) -> bool {
        dominates(&self.scores, &other.scores)
    }

    /// Score delta from `self` to `other`.
    pub fn gradient(&self, other: &Candidate) -> f64 {
        gradient(&self.scores, &other.scores)
    }

    /// Hill-climb the chromosome, then check the tracked scores against a
    /// from-scratch rebuild.
    pub fn refine<R: Rng + ?Sized>(
        mut self,
        search: &LocalSearch<'_>,
        rng: &mut R,
    ) -> Result<Self, PartitionError> {
        let outcome = search.optimize_chromosome(self.chromosome, rng)?;
        let (chromosome, scores) = outcome.state.into_parts();
        self.chromosome = chromosome;
        self.scores = scores;
        self.refresh();
        self.verify(search.context())?;
        Ok(self)
    }

    /// Fail with `InconsistentSearchState` if the tracked scores differ from a
    /// fresh evaluation of a rebuilt chromosome.
    pub fn verify(&self, context: &SearchContext) -> Result<(), PartitionError> {
        let recomputed = context.evaluate(&self.chromosome.rebuilt()?);
        let consistent = recomputed.len() == self.scores.len()
            && recomputed.iter().zip(&self.scores).all(|(a, b)| {
                (a - b).abs() <= SCORE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
            });
        if consistent {
            Ok(())
        } else {
            Err(PartitionError::InconsistentSearchState {
                tracked: self.scores.clone(),
                recomputed,
            })
        }
    }

    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self, objective_names: &[String]) -> CandidateSnapshot {
        CandidateSnapshot {
            id: self.id,
            generation: self.generation,
            parents: self.parents.clone(),
            rank: self.rank,
            scores: objective_names
                .iter()
                .zip(&self.scores)
                .map(|(name, &score)| ObjectiveScore {
                    name: name.clone(),
                    score,
                })
                .collect(),
            assignment: self.chromosome.assignment().to_vec(),
            components: self.chromosome.component_vertices(),
        }
    }
}
