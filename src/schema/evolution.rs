//! Evolution configuration, progress and result types.
//!
//! The configuration drives [`EvolutionEngine`](crate::compute::evolution::EvolutionEngine);
//! the progress and result types are what it reports back to callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compute::{ComponentId, DEFAULT_WEIGHT_KEY, VertexId};

use super::ConfigError;

/// Top-level configuration for the NSGA-II search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Number of generations to run.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Candidates per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Initial probability that a child is mutated.
    #[serde(default = "default_mutation_probability")]
    pub mutation_probability: f64,
    /// Factor applied to the mutation probability after every generation.
    #[serde(default = "default_mutation_decay")]
    pub mutation_decay: f64,
    /// Contestants per tournament.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Refine offspring with local search.
    #[serde(default = "default_true")]
    pub optimize: bool,
    /// Refine on every generation divisible by this interval.
    #[serde(default = "default_optimization_interval")]
    pub optimization_interval: usize,
    /// Refine offspring in parallel.
    #[serde(default = "default_true")]
    pub multiprocess: bool,
    /// Stop as soon as the parent pool has collapsed to a single partition.
    #[serde(default)]
    pub early_break: bool,
    /// Local-search budget per refined child.
    #[serde(default)]
    pub local_search: LocalSearchConfig,
    /// Objectives to maximize.
    #[serde(default = "default_objectives")]
    pub objectives: Vec<ObjectiveSpec>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            generations: default_generations(),
            population_size: default_population_size(),
            mutation_probability: default_mutation_probability(),
            mutation_decay: default_mutation_decay(),
            tournament_size: default_tournament_size(),
            optimize: true,
            optimization_interval: default_optimization_interval(),
            multiprocess: true,
            early_break: false,
            local_search: LocalSearchConfig::default(),
            objectives: default_objectives(),
            random_seed: None,
        }
    }
}

fn default_generations() -> usize {
    500
}

fn default_population_size() -> usize {
    300
}

fn default_mutation_probability() -> f64 {
    0.7
}

fn default_mutation_decay() -> f64 {
    0.99
}

fn default_tournament_size() -> usize {
    3
}

fn default_optimization_interval() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_objectives() -> Vec<ObjectiveSpec> {
    vec![ObjectiveSpec::PopulationEquality {
        key: default_weight_key(),
    }]
}

fn default_weight_key() -> String {
    DEFAULT_WEIGHT_KEY.to_string()
}

/// Local-search budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSearchConfig {
    /// Maximum number of accepted moves.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Hypothetical edges sampled per step.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            sample_size: default_sample_size(),
        }
    }
}

fn default_steps() -> usize {
    20
}

fn default_sample_size() -> usize {
    50
}

/// Objective selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ObjectiveSpec {
    /// Maximize the smallest district total of a weight column.
    PopulationEquality {
        #[serde(default = "default_weight_key")]
        key: String,
    },
    /// Maximize the smallest district vertex count.
    SizeEquality,
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }
        if self.objectives.is_empty() {
            return Err(ConfigError::NoObjectives);
        }
        if !(0.0..=1.0).contains(&self.mutation_probability) {
            return Err(ConfigError::InvalidProbability(self.mutation_probability));
        }
        if !(self.mutation_decay > 0.0 && self.mutation_decay <= 1.0) {
            return Err(ConfigError::InvalidDecay(self.mutation_decay));
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::InvalidTournamentSize);
        }
        if self.optimization_interval == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.local_search.sample_size == 0 {
            return Err(ConfigError::InvalidSampleSize);
        }
        for spec in &self.objectives {
            if let ObjectiveSpec::PopulationEquality { key } = spec
                && key.is_empty()
            {
                return Err(ConfigError::EmptyWeightKey);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Current phase of the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvolutionPhase {
    Initializing,
    Evolving,
    Refining,
    Stopped,
}

/// Per-generation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSummary {
    pub generation: usize,
    /// Size of the first front after selection.
    pub front_size: usize,
    /// Distinct partitions among the selected parents.
    pub unique_parents: usize,
    /// Best score per objective across the selected parents.
    pub best_scores: Vec<f64>,
    /// Mutation probability used for this generation's children.
    pub mutation_probability: f64,
    /// Whether offspring were refined with local search.
    pub refined: bool,
    /// Whether every selected parent is the same partition.
    pub converged: bool,
    /// Distinct members of the first front after selection.
    #[serde(default)]
    pub front: Vec<CandidateSnapshot>,
}

/// Run history, one summary per completed generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionHistory {
    pub generations: Vec<GenerationSummary>,
}

impl EvolutionHistory {
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn last(&self) -> Option<&GenerationSummary> {
        self.generations.last()
    }

    /// Front size per generation.
    pub fn front_sizes(&self) -> Vec<usize> {
        self.generations.iter().map(|g| g.front_size).collect()
    }

    /// First generation at which the parent pool converged.
    pub fn converged_at(&self) -> Option<usize> {
        self.generations
            .iter()
            .find(|g| g.converged)
            .map(|g| g.generation)
    }
}

/// Progress update passed to the engine callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Last completed generation.
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Current population size.
    pub population_size: usize,
    /// Size of the current first front.
    pub front_size: usize,
    /// Best score per objective in the current population.
    pub best_scores: Vec<f64>,
    /// Mutation probability for the next generation.
    pub mutation_probability: f64,
    /// Summary of the last completed generation.
    pub last_generation: Option<GenerationSummary>,
    /// Current phase of the algorithm.
    pub phase: EvolutionPhase,
}

/// Named objective score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectiveScore {
    pub name: String,
    pub score: f64,
}

/// Serializable view of a candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateSnapshot {
    /// Unique identifier.
    pub id: u64,
    /// Generation this candidate was created.
    pub generation: usize,
    /// Parent IDs (for genealogy).
    pub parents: Vec<u64>,
    /// Pareto rank (1 = non-dominated).
    pub rank: usize,
    /// Per-objective scores.
    pub scores: Vec<ObjectiveScore>,
    /// Normalized label per vertex index.
    pub assignment: Vec<ComponentId>,
    /// Component id to member vertex ids.
    pub components: BTreeMap<ComponentId, Vec<VertexId>>,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Non-dominated candidates of the final population.
    pub pareto_front: Vec<CandidateSnapshot>,
    /// Per-generation history.
    pub history: EvolutionHistory,
    /// Summary statistics.
    pub stats: EvolutionStats,
}

/// Summary statistics of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations completed.
    pub generations: usize,
    /// Objective evaluations of fresh candidates.
    pub total_evaluations: u64,
    /// Children refined with local search.
    pub total_refinements: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Ran the configured number of generations.
    MaxGenerations,
    /// Parent pool converged with `early_break` set.
    Converged,
    /// Cancelled through the engine's cancel handle.
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = EvolutionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generations, 500);
        assert_eq!(config.population_size, 300);
        assert_eq!(config.local_search.sample_size, 50);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: EvolutionConfig =
            serde_json::from_str(r#"{"generations": 10, "local_search": {"steps": 5}}"#).unwrap();
        assert_eq!(config.generations, 10);
        assert_eq!(config.population_size, 300);
        assert_eq!(config.local_search.steps, 5);
        assert_eq!(config.local_search.sample_size, 50);
        assert_eq!(config.objectives, default_objectives());
        assert!(config.optimize);
    }

    #[test]
    fn test_objective_spec_tagging() {
        let specs: Vec<ObjectiveSpec> = serde_json::from_str(
            r#"[
                {"type": "PopulationEquality", "key": "votes"},
                {"type": "PopulationEquality"},
                {"type": "SizeEquality"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            specs,
            vec![
                ObjectiveSpec::PopulationEquality {
                    key: "votes".to_string()
                },
                ObjectiveSpec::PopulationEquality {
                    key: "pop".to_string()
                },
                ObjectiveSpec::SizeEquality,
            ]
        );
    }

    #[test]
    fn test_validation_errors() {
        let invalid = [
            EvolutionConfig {
                population_size: 1,
                ..Default::default()
            },
            EvolutionConfig {
                objectives: Vec::new(),
                ..Default::default()
            },
            EvolutionConfig {
                mutation_probability: 1.5,
                ..Default::default()
            },
            EvolutionConfig {
                mutation_decay: 0.0,
                ..Default::default()
            },
            EvolutionConfig {
                optimization_interval: 0,
                ..Default::default()
            },
            EvolutionConfig {
                tournament_size: 0,
                ..Default::default()
            },
            EvolutionConfig {
                local_search: LocalSearchConfig {
                    steps: 20,
                    sample_size: 0,
                },
                ..Default::default()
            },
        ];
        for config in invalid {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn test_history_helpers() {
        let summary = |generation, converged| GenerationSummary {
            generation,
            front_size: generation,
            unique_parents: 1,
            best_scores: vec![1.0],
            mutation_probability: 0.5,
            refined: false,
            converged,
            front: Vec::new(),
        };
        let history = EvolutionHistory {
            generations: vec![summary(1, false), summary(2, true), summary(3, true)],
        };
        assert_eq!(history.front_sizes(), vec![1, 2, 3]);
        assert_eq!(history.converged_at(), Some(2));
    }

    #[test]
    fn test_summary_without_front_deserializes() {
        let json = r#"{
            "generation": 4,
            "front_size": 2,
            "unique_parents": 7,
            "best_scores": [3.0],
            "mutation_probability": 0.6,
            "refined": true,
            "converged": false
        }"#;
        let summary: GenerationSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.unique_parents, 7);
        assert!(summary.front.is_empty());
    }
}
