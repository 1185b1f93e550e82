//! Objective functions over partitions.
//!
//! Every objective maps per-component aggregates to a scalar where higher is
//! better. Structural defects (fragmented districts, wrong district count) are
//! penalized in units of `total + 1`, which exceeds any reachable base score, so
//! every invalid partition scores below every valid one.

use crate::schema::ObjectiveSpec;

use super::chromosome::ComponentScore;
use super::error::PartitionError;
use super::graph::MasterGraph;

/// Multiplier on the penalty unit for each district too many or too few.
const WRONG_COUNT_FACTOR: f64 = 10.0;

/// A scalar objective, monotone increasing in partition quality.
pub trait Objective: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    /// Score a partition from its component aggregates.
    fn evaluate(&self, scores: &[ComponentScore]) -> f64;

    /// `(min, max)` range of valid scores, used to normalize crowding distance.
    fn bounds(&self) -> (f64, f64);

    /// Best attainable score.
    fn goal(&self) -> f64 {
        self.bounds().1
    }

    /// Weight column this objective reads, if any.
    fn weight_key(&self) -> Option<&str> {
        None
    }
}

/// Penalty for fragments beyond one per component and for `|m - k|`.
fn structural_penalty(scores: &[ComponentScore], districts: usize, unit: f64) -> f64 {
    let components = scores.len();
    let pieces: usize = scores.iter().map(|s| s.pieces).sum();
    let extra_fragments = pieces.saturating_sub(components);
    let wrong_count = components.abs_diff(districts);
    unit * (extra_fragments as f64 + WRONG_COUNT_FACTOR * wrong_count as f64)
}

/// Maximize the smallest district total of a weight column.
#[derive(Debug, Clone)]
pub struct PopulationEquality {
    key: String,
    column: usize,
    districts: usize,
    total: f64,
}

impl PopulationEquality {
    pub fn new(graph: &MasterGraph, key: &str) -> Result<Self, PartitionError> {
        let column = graph
            .column_index(key)
            .ok_or_else(|| PartitionError::UnknownWeightKey(key.to_string()))?;
        Ok(Self {
            key: key.to_string(),
            column,
            districts: graph.districts(),
            total: graph.total_weight(column),
        })
    }
}

impl Objective for PopulationEquality {
    fn name(&self) -> &str {
        "Population equality"
    }

    fn evaluate(&self, scores: &[ComponentScore]) -> f64 {
        let base = scores
            .iter()
            .map(|s| s.totals[self.column])
            .reduce(f64::min)
            .unwrap_or(0.0);
        base - structural_penalty(scores, self.districts, self.total + 1.0)
    }

    fn bounds(&self) -> (f64, f64) {
        (0.0, self.total / self.districts as f64)
    }

    fn weight_key(&self) -> Option<&str> {
        Some(&self.key)
    }
}

/// Maximize the smallest district vertex count.
#[derive(Debug, Clone)]
pub struct SizeEquality {
    districts: usize,
    vertices: usize,
}

impl SizeEquality {
    pub fn new(graph: &MasterGraph) -> Self {
        Self {
            districts: graph.districts(),
            vertices: graph.num_vertices(),
        }
    }
}

impl Objective for SizeEquality {
    fn name(&self) -> &str {
        "Size equality"
    }

    fn evaluate(&self, scores: &[ComponentScore]) -> f64 {
        let base = scores.iter().map(|s| s.size).min().unwrap_or(0) as f64;
        base - structural_penalty(scores, self.districts, self.vertices as f64 + 1.0)
    }

    fn bounds(&self) -> (f64, f64) {
        (0.0, self.vertices as f64 / self.districts as f64)
    }
}

/// Instantiate configured objectives against a graph.
pub fn build_objectives(
    specs: &[ObjectiveSpec],
    graph: &MasterGraph,
) -> Result<Vec<Box<dyn Objective>>, PartitionError> {
    specs
        .iter()
        .map(|spec| -> Result<Box<dyn Objective>, PartitionError> {
            match spec {
                ObjectiveSpec::PopulationEquality { key } => {
                    Ok(Box::new(PopulationEquality::new(graph, key)?))
                }
                ObjectiveSpec::SizeEquality => Ok(Box::new(SizeEquality::new(graph))),
            }
        })
        .collect()
}

/// `a` dominates `b`: no worse on every objective and strictly better on one.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b) {
        if x < y {
            return false;
        }
        if x > y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Sum of per-objective deltas going from `from` to `to`.
pub fn gradient(from: &[f64], to: &[f64]) -> f64 {
    from.iter().zip(to).map(|(a, b)| b - a).sum()
}
