//! Sampled steepest-ascent Pareto hill climbing over single-vertex moves.
//!
//! Each step samples a bounded number of hypothetical edges, simulates every
//! sampled move against the current component aggregates, and applies the
//! dominating move with the largest gradient. Sampling keeps the per-step cost
//! independent of the total number of cut edges.

use rand::Rng;

use crate::schema::LocalSearchConfig;

use super::chromosome::Chromosome;
use super::context::SearchContext;
use super::error::PartitionError;
use super::graph::VertexId;
use super::hypotheticals::Edge;
use super::objective::{dominates, gradient};

/// A chromosome together with its tracked score vector.
#[derive(Debug, Clone)]
pub struct SearchState {
    chromosome: Chromosome,
    scores: Vec<f64>,
}

impl SearchState {
    pub fn new(context: &SearchContext, chromosome: Chromosome) -> Self {
        let scores = context.evaluate(&chromosome);
        Self { chromosome, scores }
    }

    pub fn chromosome(&self) -> &Chromosome {
        &self.chromosome
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn into_parts(self) -> (Chromosome, Vec<f64>) {
        (self.chromosome, self.scores)
    }

    /// Move vertex `j` into the component of vertex `i` and rescore, in place.
    pub fn connect_vertices(
        &mut self,
        context: &SearchContext,
        (i, j): (VertexId, VertexId),
    ) -> Result<(), PartitionError> {
        let graph = self.chromosome.graph();
        let i = graph.index_of(i).ok_or(PartitionError::UnknownVertex(i))?;
        let j = graph.index_of(j).ok_or(PartitionError::UnknownVertex(j))?;
        self.chromosome.apply_move(i, j)?;
        self.scores = context.evaluate(&self.chromosome);
        Ok(())
    }

    pub fn dominates(&self, other: &SearchState) -> bool {
        dominates(&self.scores, &other.scores)
    }

    pub fn gradient(&self, other: &SearchState) -> f64 {
        gradient(&self.scores, &other.scores)
    }

    fn apply(&mut self, (i, j): Edge, scores: Vec<f64>) -> Result<(), PartitionError> {
        self.chromosome.apply_move(i, j)?;
        self.scores = scores;
        Ok(())
    }
}

/// Result of a local-search run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub state: SearchState,
    /// Number of moves applied.
    pub steps_taken: usize,
    /// Whether the search stopped at a local optimum rather than the step budget.
    pub converged: bool,
}

/// Local-search driver bound to a search context.
pub struct LocalSearch<'a> {
    context: &'a SearchContext,
    config: LocalSearchConfig,
}

impl<'a> LocalSearch<'a> {
    pub fn new(context: &'a SearchContext, config: LocalSearchConfig) -> Self {
        Self { context, config }
    }

    pub fn context(&self) -> &'a SearchContext {
        self.context
    }

    pub fn config(&self) -> &LocalSearchConfig {
        &self.config
    }

    /// Best dominating move among a uniform sample of hypothetical edges.
    ///
    /// Returns the move and the scores it would produce, or `None` when no
    /// sampled move dominates the current state. Among equal gradients the
    /// first sampled move wins.
    pub fn find_best_neighbor<R: Rng + ?Sized>(
        &self,
        state: &SearchState,
        rng: &mut R,
    ) -> Result<Option<(Edge, Vec<f64>)>, PartitionError> {
        let moves = state
            .chromosome
            .hypotheticals()
            .sample(rng, self.config.sample_size);

        let mut best: Option<(Edge, Vec<f64>, f64)> = None;
        for (i, j) in moves {
            let preview = state.chromosome.preview_move(i, j)?;
            let scores = self.context.evaluate_components(&preview.scores);
            if !dominates(&scores, &state.scores) {
                continue;
            }
            let ascent = gradient(&state.scores, &scores);
            if best.as_ref().is_none_or(|(_, _, top)| ascent > *top) {
                best = Some((preview.edge, scores, ascent));
            }
        }

        Ok(best.map(|(edge, scores, _)| (edge, scores)))
    }

    /// Climb from `state` until no sampled move dominates or the step budget is spent.
    pub fn optimize<R: Rng + ?Sized>(
        &self,
        mut state: SearchState,
        rng: &mut R,
    ) -> Result<SearchOutcome, PartitionError> {
        let mut steps_taken = 0;
        let mut converged = false;

        while steps_taken < self.config.steps {
            let Some((edge, scores)) = self.find_best_neighbor(&state, rng)? else {
                converged = true;
                break;
            };
            log::trace!(
                "Local search step {}: move {:?}, scores {:?}",
                steps_taken + 1,
                edge,
                scores
            );
            state.apply(edge, scores)?;
            steps_taken += 1;
        }

        Ok(SearchOutcome {
            state,
            steps_taken,
            converged,
        })
    }

    /// Convenience wrapper: score `chromosome` and optimize it.
    pub fn optimize_chromosome<R: Rng + ?Sized>(
        &self,
        chromosome: Chromosome,
        rng: &mut R,
    ) -> Result<SearchOutcome, PartitionError> {
        self.optimize(SearchState::new(self.context, chromosome), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::graph::MasterGraph;
    use crate::compute::hypotheticals::HypotheticalSet;
    use crate::schema::ObjectiveSpec;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn context(graph: MasterGraph) -> SearchContext {
        let specs = [ObjectiveSpec::PopulationEquality {
            key: "pop".to_string(),
        }];
        SearchContext::from_specs(Arc::new(graph), &specs).unwrap()
    }

    fn chromosome(context: &SearchContext, assignment: Vec<u32>) -> Chromosome {
        Chromosome::new(Arc::clone(context.graph()), assignment).unwrap()
    }

    #[test]
    fn test_connect_vertices_rescores() {
        let context = context(MasterGraph::path(8, 2).unwrap());
        let start = chromosome(&context, vec![1, 1, 1, 1, 2, 2, 2, 2]);
        let mut state = SearchState::new(&context, start);
        assert_eq!(state.scores(), &[4.0]);

        state.connect_vertices(&context, (3, 4)).unwrap();
        assert_eq!(state.chromosome().assignment(), &[1, 1, 1, 1, 1, 2, 2, 2]);
        assert_eq!(state.scores(), &[3.0]);
        assert_eq!(
            state.chromosome().hypotheticals(),
            &HypotheticalSet::from_edges([(4, 5)])
        );

        assert!(matches!(
            state.connect_vertices(&context, (0, 1)),
            Err(PartitionError::SameComponent { .. })
        ));
    }

    #[test]
    fn test_state_dominance() {
        let context = context(MasterGraph::path(6, 2).unwrap());
        let good = SearchState::new(&context, chromosome(&context, vec![1, 1, 1, 2, 2, 2]));
        let bad = SearchState::new(&context, chromosome(&context, vec![1, 2, 2, 2, 2, 2]));
        assert!(good.dominates(&bad));
        assert!(!bad.dominates(&good));
        assert!(!good.dominates(&good.clone()));
        assert_eq!(bad.gradient(&good), 2.0);
    }

    #[test]
    fn test_find_best_neighbor_simple() {
        let context = context(MasterGraph::path(6, 2).unwrap());
        let search = LocalSearch::new(&context, LocalSearchConfig::default());
        let mut rng = StdRng::seed_from_u64(0);

        let state = SearchState::new(&context, chromosome(&context, vec![1, 1, 2, 2, 2, 2]));
        let (edge, scores) = search.find_best_neighbor(&state, &mut rng).unwrap().unwrap();
        assert_eq!(edge, (1, 2));
        assert_eq!(scores, vec![3.0]);

        let mut next = state.clone();
        next.apply(edge, scores).unwrap();
        assert_eq!(next.chromosome().assignment(), &[1, 1, 1, 2, 2, 2]);
        assert!(search.find_best_neighbor(&next, &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_optimize_path() {
        let context = context(MasterGraph::path(6, 2).unwrap());
        let search = LocalSearch::new(&context, LocalSearchConfig::default());
        let mut rng = StdRng::seed_from_u64(42);

        let start = chromosome(&context, vec![1, 2, 2, 2, 2, 2]);
        let outcome = search.optimize_chromosome(start, &mut rng).unwrap();

        assert_eq!(outcome.state.scores(), &[3.0]);
        assert_eq!(outcome.state.chromosome().assignment(), &[1, 1, 1, 2, 2, 2]);
        assert_eq!(
            outcome.state.chromosome().hypotheticals(),
            &HypotheticalSet::from_edges([(2, 3)])
        );
        assert_eq!(outcome.steps_taken, 2);
        assert!(outcome.converged);
    }

    #[test]
    fn test_optimize_respects_step_budget() {
        let context = context(MasterGraph::path(6, 2).unwrap());
        let config = LocalSearchConfig {
            steps: 1,
            sample_size: 50,
        };
        let search = LocalSearch::new(&context, config);
        let mut rng = StdRng::seed_from_u64(42);

        let outcome = search
            .optimize_chromosome(chromosome(&context, vec![1, 2, 2, 2, 2, 2]), &mut rng)
            .unwrap();
        assert_eq!(outcome.steps_taken, 1);
        assert!(!outcome.converged);
        assert_eq!(outcome.state.scores(), &[2.0]);
    }

    #[test]
    fn test_optimize_returns_immediately_without_hypotheticals() {
        let context = context(MasterGraph::path(4, 1).unwrap());
        let search = LocalSearch::new(&context, LocalSearchConfig::default());
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = search
            .optimize_chromosome(chromosome(&context, vec![1; 4]), &mut rng)
            .unwrap();
        assert_eq!(outcome.steps_taken, 0);
        assert!(outcome.converged);
    }

    #[test]
    fn test_optimize_grid_reaches_balance() {
        let rows = 15;
        let cols = 15;
        let context = context(MasterGraph::grid(rows, cols, 2).unwrap());
        // Every hypothetical edge is sampled each step, so the climb is exhaustive.
        let config = LocalSearchConfig {
            steps: 500,
            sample_size: 2000,
        };
        let search = LocalSearch::new(&context, config);
        let mut rng = StdRng::seed_from_u64(7);

        let node_count = rows * cols;
        let mut assignment = vec![2; node_count];
        assignment[0] = 1;
        let outcome = search
            .optimize_chromosome(chromosome(&context, assignment), &mut rng)
            .unwrap();

        assert_eq!(outcome.state.scores(), &[(node_count / 2) as f64]);
        assert!(outcome.converged);
    }

    #[test]
    fn test_optimize_is_monotone() {
        let context = context(MasterGraph::grid(6, 6, 3).unwrap());
        let single_step = LocalSearch::new(
            &context,
            LocalSearchConfig {
                steps: 1,
                sample_size: 50,
            },
        );
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..10 {
            let start = context.random_chromosome(&mut rng).unwrap();
            let mut state = SearchState::new(&context, start);

            for _ in 0..LocalSearchConfig::default().steps {
                let outcome = single_step.optimize(state.clone(), &mut rng).unwrap();
                if outcome.converged {
                    assert_eq!(outcome.steps_taken, 0);
                    assert_eq!(outcome.state.scores(), state.scores());
                    break;
                }
                assert_eq!(outcome.steps_taken, 1);
                assert!(
                    outcome.state.dominates(&state),
                    "{:?} does not dominate {:?}",
                    outcome.state.scores(),
                    state.scores()
                );
                state = outcome.state;
            }

            // Tracked scores match a fresh evaluation.
            let fresh = context.evaluate(&state.chromosome().rebuilt().unwrap());
            assert_eq!(fresh, state.scores());
        }
    }
}
