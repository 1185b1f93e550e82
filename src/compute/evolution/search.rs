//! The generational NSGA-II engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::compute::chromosome::Chromosome;
use crate::compute::context::SearchContext;
use crate::compute::error::PartitionError;
use crate::compute::graph::MasterGraph;
use crate::compute::local_search::LocalSearch;
use crate::schema::{
    CandidateSnapshot, EvolutionConfig, EvolutionHistory, EvolutionPhase, EvolutionProgress,
    EvolutionResult, EvolutionStats, GenerationSummary, StopReason,
};

use super::EvolutionError;
use super::candidate::Candidate;
use super::nsga2::{select_survivors, tournament_select};

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(&EvolutionProgress) + Send + Sync>;

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    context: Arc<SearchContext>,
    bounds: Vec<(f64, f64)>,
    rng: StdRng,
    population: Vec<Candidate>,
    front: Vec<Candidate>,
    history: EvolutionHistory,
    generation: usize,
    mutation_probability: f64,
    phase: EvolutionPhase,
    total_evaluations: u64,
    total_refinements: u64,
    next_id: u64,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine over an existing search context.
    pub fn new(
        config: EvolutionConfig,
        context: Arc<SearchContext>,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        let seed = config.random_seed.unwrap_or_else(rand::random);
        let bounds = context.objectives().iter().map(|o| o.bounds()).collect();

        Ok(Self {
            mutation_probability: config.mutation_probability,
            config,
            context,
            bounds,
            rng: StdRng::seed_from_u64(seed),
            population: Vec::new(),
            front: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            phase: EvolutionPhase::Initializing,
            total_evaluations: 0,
            total_refinements: 0,
            next_id: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Build the search context from the configured objectives, then the engine.
    pub fn from_graph(
        config: EvolutionConfig,
        graph: Arc<MasterGraph>,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        let context = SearchContext::from_specs(graph, &config.objectives)?;
        Self::new(config, Arc::new(context))
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn context(&self) -> &Arc<SearchContext> {
        &self.context
    }

    /// Current (selected) population.
    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    /// Distinct members of the current first front.
    pub fn pareto_front(&self) -> &[Candidate] {
        &self.front
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn mutation_probability(&self) -> f64 {
        self.mutation_probability
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Initialize the population with uniformly random partitions.
    pub fn initialize(&mut self) -> Result<(), EvolutionError> {
        self.phase = EvolutionPhase::Initializing;
        self.generation = 0;
        self.history = EvolutionHistory::default();
        self.mutation_probability = self.config.mutation_probability;

        let mut population = Vec::with_capacity(self.config.population_size);
        for _ in 0..self.config.population_size {
            let chromosome = self.context.random_chromosome(&mut self.rng)?;
            let id = self.next_id();
            population.push(Candidate::new(id, chromosome, &self.context, 0, Vec::new()));
        }
        self.total_evaluations += population.len() as u64;

        self.population = select_survivors(population, self.config.population_size, &self.bounds);
        self.update_front();
        Ok(())
    }

    /// Produce `population_size` children by tournament, crossover and mutation.
    fn breed(&mut self, generation: usize) -> Result<Vec<Candidate>, PartitionError> {
        let size = self.config.population_size;
        let mut children = Vec::with_capacity(size + 1);

        while children.len() < size {
            let a = tournament_select(&self.population, self.config.tournament_size, &mut self.rng);
            let b = tournament_select(&self.population, self.config.tournament_size, &mut self.rng);
            let parents = vec![self.population[a].id, self.population[b].id];

            let (first, second) = self.population[a]
                .chromosome
                .crossover(&self.population[b].chromosome, &mut self.rng)?;

            for mut chromosome in [first, second] {
                if self.rng.gen_bool(self.mutation_probability) {
                    chromosome.mutate(&mut self.rng);
                }
                let id = self.next_id();
                children.push(Candidate::new(
                    id,
                    chromosome,
                    &self.context,
                    generation,
                    parents.clone(),
                ));
            }
        }

        children.truncate(size);
        self.total_evaluations += children.len() as u64;
        Ok(children)
    }

    /// Hill-climb every child. Each child gets its own RNG seeded from the
    /// engine RNG, so results do not depend on scheduling.
    fn refine(&mut self, children: Vec<Candidate>) -> Result<Vec<Candidate>, PartitionError> {
        let seeds: Vec<u64> = (0..children.len()).map(|_| self.rng.r#gen()).collect();
        let context: &SearchContext = &self.context;
        let config = &self.config.local_search;
        let cancelled = &self.cancelled;

        let refine_one = |(child, seed): (Candidate, u64)| -> Result<Candidate, PartitionError> {
            if cancelled.load(Ordering::Relaxed) {
                return Ok(child);
            }
            let search = LocalSearch::new(context, config.clone());
            child.refine(&search, &mut StdRng::seed_from_u64(seed))
        };

        let count = children.len() as u64;
        let refined = if self.config.multiprocess {
            children
                .into_par_iter()
                .zip(seeds)
                .map(&refine_one)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            children
                .into_iter()
                .zip(seeds)
                .map(&refine_one)
                .collect::<Result<Vec<_>, _>>()?
        };
        self.total_refinements += count;
        Ok(refined)
    }

    /// Run a single generation step. Returns `false` when the generation was
    /// discarded because of cancellation.
    pub fn step_generation(&mut self) -> Result<bool, EvolutionError> {
        let generation = self.generation + 1;
        self.phase = EvolutionPhase::Evolving;

        let mut children = self.breed(generation)?;

        let refined = self.config.optimize && generation % self.config.optimization_interval == 0;
        if refined {
            self.phase = EvolutionPhase::Refining;
            log::debug!(
                "Generation {}: refining {} children",
                generation,
                children.len()
            );
            children = self.refine(children)?;
            if self.cancelled.load(Ordering::Relaxed) {
                log::warn!(
                    "Generation {} cancelled during refinement; keeping generation {}",
                    generation,
                    self.generation
                );
                return Ok(false);
            }
        }

        let mut merged = std::mem::take(&mut self.population);
        merged.extend(children);
        self.population = select_survivors(merged, self.config.population_size, &self.bounds);
        self.update_front();

        let unique_parents = self
            .population
            .iter()
            .map(|c| &c.chromosome)
            .collect::<FxHashSet<&Chromosome>>()
            .len();
        let summary = GenerationSummary {
            generation,
            front_size: self.front.len(),
            unique_parents,
            best_scores: self.best_scores(),
            mutation_probability: self.mutation_probability,
            refined,
            converged: unique_parents == 1,
            front: self.front_snapshots(),
        };
        log::debug!(
            "Generation {}: front {}, unique parents {}, best {:?}",
            generation,
            summary.front_size,
            summary.unique_parents,
            summary.best_scores
        );
        self.history.generations.push(summary);

        self.mutation_probability *= self.config.mutation_decay;
        self.generation = generation;
        Ok(true)
    }

    /// Recompute the stored front from the current population's rank-1 members.
    fn update_front(&mut self) {
        let mut seen: FxHashSet<&Chromosome> = FxHashSet::default();
        let front: Vec<Candidate> = self
            .population
            .iter()
            .filter(|c| c.rank == 1 && seen.insert(&c.chromosome))
            .cloned()
            .collect();
        self.front = front;
    }

    /// Best score per objective across the population.
    fn best_scores(&self) -> Vec<f64> {
        (0..self.context.num_objectives())
            .map(|m| {
                self.population
                    .iter()
                    .map(|c| c.scores[m])
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect()
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.generations,
            population_size: self.population.len(),
            front_size: self.front.len(),
            best_scores: self.best_scores(),
            mutation_probability: self.mutation_probability,
            last_generation: self.history.last().cloned(),
            phase: self.phase,
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.config.early_break
            && let Some(last) = self.history.last()
            && last.converged
        {
            return Some(StopReason::Converged);
        }

        if self.generation >= self.config.generations {
            return Some(StopReason::MaxGenerations);
        }

        None
    }

    /// Serializable view of the current front.
    pub fn front_snapshots(&self) -> Vec<CandidateSnapshot> {
        let names = self.context.objective_names();
        self.front.iter().map(|c| c.to_snapshot(&names)).collect()
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<EvolutionResult, EvolutionError>
    where
        F: Fn(&EvolutionProgress),
    {
        let start_time = Instant::now();
        log::info!(
            "Starting evolution: {} generations, population {}, {:?}",
            self.config.generations,
            self.config.population_size,
            self.context
        );

        self.initialize()?;
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            if self.step_generation()? {
                callback(&self.progress());
            }
        };

        self.phase = EvolutionPhase::Stopped;
        let elapsed = start_time.elapsed().as_secs_f64();
        log::info!(
            "Evolution stopped after {} generations ({:?}) in {:.2}s; front size {}",
            self.generation,
            stop_reason,
            elapsed,
            self.front.len()
        );

        Ok(EvolutionResult {
            pareto_front: self.front_snapshots(),
            history: self.history.clone(),
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.total_evaluations,
                total_refinements: self.total_refinements,
                elapsed_seconds: elapsed,
                stop_reason,
            },
        })
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(|_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LocalSearchConfig, ObjectiveSpec};
    use std::sync::Mutex;

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            generations: 5,
            population_size: 12,
            optimization_interval: 2,
            local_search: LocalSearchConfig {
                steps: 5,
                sample_size: 10,
            },
            random_seed: Some(17),
            ..Default::default()
        }
    }

    fn grid(rows: usize, cols: usize, districts: usize) -> Arc<MasterGraph> {
        Arc::new(MasterGraph::grid(rows, cols, districts).unwrap())
    }

    #[test]
    fn test_evolution_engine_creation() {
        let mut engine = EvolutionEngine::from_graph(small_config(), grid(4, 4, 2)).unwrap();
        engine.initialize().unwrap();

        assert_eq!(engine.population().len(), 12);
        assert!(!engine.pareto_front().is_empty());
        assert!(engine.pareto_front().iter().all(|c| c.rank == 1));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EvolutionConfig {
            population_size: 1,
            ..Default::default()
        };
        assert!(matches!(
            EvolutionEngine::from_graph(config, grid(3, 3, 2)),
            Err(EvolutionError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_objective_key_rejected() {
        let config = EvolutionConfig {
            objectives: vec![ObjectiveSpec::PopulationEquality {
                key: "votes".to_string(),
            }],
            ..small_config()
        };
        assert!(matches!(
            EvolutionEngine::from_graph(config, grid(3, 3, 2)),
            Err(EvolutionError::Partition(PartitionError::UnknownWeightKey(_)))
        ));
    }

    #[test]
    fn test_evolution_run() {
        let mut engine = EvolutionEngine::from_graph(small_config(), grid(4, 4, 2)).unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.stats.generations, 5);
        assert_eq!(result.history.len(), 5);
        assert_eq!(result.stats.total_evaluations, 12 * 6);
        // Generations 2 and 4 are refined.
        assert_eq!(result.stats.total_refinements, 24);
        let refined: Vec<bool> = result.history.generations.iter().map(|g| g.refined).collect();
        assert_eq!(refined, vec![false, true, false, true, false]);

        assert!(!result.pareto_front.is_empty());
        assert!(result.pareto_front.iter().all(|s| s.rank == 1));
        assert_eq!(engine.population().len(), 12);
    }

    #[test]
    fn test_front_is_mutually_non_dominated() {
        let config = EvolutionConfig {
            objectives: vec![
                ObjectiveSpec::PopulationEquality {
                    key: "pop".to_string(),
                },
                ObjectiveSpec::SizeEquality,
            ],
            ..small_config()
        };
        let mut engine = EvolutionEngine::from_graph(config, grid(4, 4, 3)).unwrap();
        engine.run().unwrap();

        let front = engine.pareto_front();
        for a in front {
            for b in front {
                assert!(!a.dominates(b));
            }
            assert!(a.verify(engine.context()).is_ok());
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = |multiprocess| {
            let config = EvolutionConfig {
                multiprocess,
                ..small_config()
            };
            let mut engine = EvolutionEngine::from_graph(config, grid(4, 4, 2)).unwrap();
            let result = engine.run().unwrap();
            result
                .pareto_front
                .into_iter()
                .map(|s| s.assignment)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(true), run(true));
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn test_mutation_probability_decays() {
        let mut engine = EvolutionEngine::from_graph(small_config(), grid(3, 3, 2)).unwrap();
        engine.run().unwrap();
        let expected = 0.7 * 0.99f64.powi(5);
        assert!((engine.mutation_probability() - expected).abs() < 1e-12);
        assert_eq!(engine.history().generations[0].mutation_probability, 0.7);
    }

    #[test]
    fn test_best_scores_never_decrease() {
        let config = EvolutionConfig {
            generations: 6,
            optimization_interval: 1,
            ..small_config()
        };
        let mut engine = EvolutionEngine::from_graph(config, grid(4, 4, 2)).unwrap();
        let result = engine.run().unwrap();

        let best: Vec<f64> = result
            .history
            .generations
            .iter()
            .map(|g| g.best_scores[0])
            .collect();
        assert!(best.windows(2).all(|w| w[0] <= w[1]), "{best:?}");
        assert!(result.history.generations.iter().all(|g| g.refined));
    }

    #[test]
    fn test_early_break_on_converged_parents() {
        // With a single district every random partition is the same.
        let config = EvolutionConfig {
            early_break: true,
            ..small_config()
        };
        let mut engine = EvolutionEngine::from_graph(config, grid(3, 3, 1)).unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::Converged);
        assert_eq!(result.stats.generations, 1);
        assert_eq!(result.history.converged_at(), Some(1));
        assert_eq!(result.pareto_front.len(), 1);
    }

    #[test]
    fn test_cancellation() {
        let mut engine = EvolutionEngine::from_graph(small_config(), grid(3, 3, 2)).unwrap();
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
        assert!(!result.pareto_front.is_empty());
    }

    #[test]
    fn test_cancellation_during_refinement_discards_generation() {
        let config = EvolutionConfig {
            optimization_interval: 1,
            ..small_config()
        };
        let mut engine = EvolutionEngine::from_graph(config, grid(4, 4, 2)).unwrap();
        engine.initialize().unwrap();
        let before: Vec<u64> = engine.population().iter().map(|c| c.id).collect();

        engine.cancel_handle().store(true, Ordering::Relaxed);
        assert!(!engine.step_generation().unwrap());
        assert_eq!(engine.generation(), 0);
        assert!(engine.history().is_empty());
        let after: Vec<u64> = engine.population().iter().map(|c| c.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_summaries_record_front() {
        let mut engine = EvolutionEngine::from_graph(small_config(), grid(4, 4, 2)).unwrap();
        let result = engine.run().unwrap();

        for summary in &result.history.generations {
            assert_eq!(summary.front.len(), summary.front_size);
            assert!(summary.front.iter().all(|s| s.rank == 1));
        }
        let last = result.history.last().unwrap();
        assert_eq!(last.front, result.pareto_front);
    }

    #[test]
    fn test_cancel_between_generations_returns_best_front() {
        let mut engine = EvolutionEngine::from_graph(small_config(), grid(4, 4, 2)).unwrap();
        let cancel = engine.cancel_handle();

        let result = engine
            .run_with_callback(move |progress| {
                if progress.generation == 2 {
                    cancel.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 2);
        assert!(!result.pareto_front.is_empty());
        assert_eq!(result.history.last().unwrap().front, result.pareto_front);

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("Cancelled"));
    }

    #[test]
    fn test_callback_receives_progress() {
        let seen = Mutex::new(Vec::new());
        let mut engine = EvolutionEngine::from_graph(small_config(), grid(3, 3, 2)).unwrap();
        engine
            .run_with_callback(|progress| seen.lock().unwrap().push(progress.generation))
            .unwrap();
        assert_eq!(seen.into_inner().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }
}
