//! Partition chromosome: a per-vertex component label vector with cached
//! per-component structure.
//!
//! Labels are always normalized (`1..=m` in order of first appearance), so two
//! chromosomes describing the same partition compare equal regardless of how
//! they were labelled.
//!
//! Two mutation disciplines share this type:
//!
//! - [`Chromosome::connect_vertices`] and [`Chromosome::crossover`] return new
//!   values and leave `self` untouched. Population-level operators use these.
//! - [`Chromosome::apply_move`] and [`Chromosome::mutate`] update in place and
//!   are reserved for a single owner: the local-search hot loop, or a child that
//!   was just produced by crossover.
//!
//! In-place updates are incremental: weight totals are adjusted arithmetically
//! and fragment counts are recomputed only over the two touched components.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter;
use std::sync::Arc;

use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};

use super::error::PartitionError;
use super::graph::{MasterGraph, VertexId};
use super::hypotheticals::{Edge, HypotheticalSet};

/// Component label. Valid labels are `1..=num_components()`.
pub type ComponentId = u32;

/// Aggregate statistics for one component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentScore {
    /// Weight totals, one per graph weight column.
    pub totals: Vec<f64>,
    /// Number of vertices.
    pub size: usize,
    /// Number of graph-connected pieces; anything above 1 is a fragmented district.
    pub pieces: usize,
}

impl ComponentScore {
    fn empty(columns: usize) -> Self {
        Self {
            totals: vec![0.0; columns],
            size: 0,
            pieces: 0,
        }
    }
}

/// Component scores that would result from a move, computed without applying it.
#[derive(Debug, Clone)]
pub struct MovePreview {
    /// The move: pull `edge.1` into the component of `edge.0`.
    pub edge: Edge,
    /// Resulting per-component scores (unordered).
    pub scores: Vec<ComponentScore>,
}

/// Normalize labels in place so they read `1, 2, ...` in order of first appearance.
pub fn normalize(assignment: &mut [ComponentId]) {
    let mut mapping: FxHashMap<ComponentId, ComponentId> = FxHashMap::default();
    for label in assignment.iter_mut() {
        let next = mapping.len() as ComponentId + 1;
        *label = *mapping.entry(*label).or_insert(next);
    }
}

/// A partition of the master graph.
#[derive(Clone)]
pub struct Chromosome {
    graph: Arc<MasterGraph>,
    assignment: Vec<ComponentId>,
    // Indexed by `label - 1`.
    members: Vec<FxHashSet<usize>>,
    scores: Vec<ComponentScore>,
    first: Vec<usize>,
    hypotheticals: HypotheticalSet,
}

impl Chromosome {
    /// Build a chromosome from a raw label vector (one label per vertex index).
    pub fn new(
        graph: Arc<MasterGraph>,
        mut assignment: Vec<ComponentId>,
    ) -> Result<Self, PartitionError> {
        if assignment.len() != graph.num_vertices() {
            return Err(PartitionError::AssignmentLength {
                expected: graph.num_vertices(),
                actual: assignment.len(),
            });
        }
        normalize(&mut assignment);

        let count = assignment.iter().copied().max().unwrap_or(0) as usize;
        let columns = graph.num_weight_columns();
        let mut members = vec![FxHashSet::default(); count];
        let mut scores = vec![ComponentScore::empty(columns); count];
        let mut first = vec![usize::MAX; count];

        for (v, &label) in assignment.iter().enumerate() {
            let c = label as usize - 1;
            members[c].insert(v);
            first[c] = first[c].min(v);
            let score = &mut scores[c];
            score.size += 1;
            for (column, total) in score.totals.iter_mut().enumerate() {
                *total += graph.weight(column, v).unwrap_or(0.0);
            }
        }

        for (score, set) in scores.iter_mut().zip(&members) {
            score.pieces = graph.count_pieces(set.iter().copied(), |v| set.contains(&v));
        }

        let hypotheticals = HypotheticalSet::from_edges(
            graph
                .edges()
                .iter()
                .copied()
                .filter(|&(u, v)| assignment[u] != assignment[v]),
        );

        Ok(Self {
            graph,
            assignment,
            members,
            scores,
            first,
            hypotheticals,
        })
    }

    /// Uniformly random assignment of every vertex to one of the graph's `k` districts.
    pub fn random<R: Rng + ?Sized>(
        graph: Arc<MasterGraph>,
        rng: &mut R,
    ) -> Result<Self, PartitionError> {
        let k = graph.districts() as ComponentId;
        let assignment = (0..graph.num_vertices())
            .map(|_| rng.gen_range(1..=k))
            .collect();
        Self::new(graph, assignment)
    }

    /// Rebuild from scratch from the current assignment.
    pub fn rebuilt(&self) -> Result<Self, PartitionError> {
        Self::new(Arc::clone(&self.graph), self.assignment.clone())
    }

    pub fn graph(&self) -> &Arc<MasterGraph> {
        &self.graph
    }

    /// Normalized labels, one per vertex index.
    pub fn assignment(&self) -> &[ComponentId] {
        &self.assignment
    }

    #[inline]
    pub fn num_components(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn component_at(&self, index: usize) -> ComponentId {
        self.assignment[index]
    }

    /// Component of the vertex with id `vertex`.
    pub fn component_of(&self, vertex: VertexId) -> Result<ComponentId, PartitionError> {
        Ok(self.assignment[self.index(vertex)?])
    }

    pub fn in_same_component(&self, u: VertexId, v: VertexId) -> Result<bool, PartitionError> {
        Ok(self.component_of(u)? == self.component_of(v)?)
    }

    /// Vertex indices of component `label`.
    pub fn members(&self, label: ComponentId) -> Option<&FxHashSet<usize>> {
        self.members.get((label as usize).checked_sub(1)?)
    }

    /// `(label, vertex indices)` for every component.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &FxHashSet<usize>)> {
        self.members
            .iter()
            .enumerate()
            .map(|(c, set)| (c as ComponentId + 1, set))
    }

    /// Component mapping in vertex ids, sorted, for reporting.
    pub fn component_vertices(&self) -> BTreeMap<ComponentId, Vec<VertexId>> {
        self.components()
            .map(|(label, set)| {
                let mut ids: Vec<VertexId> =
                    set.iter().map(|&v| self.graph.vertex_id(v)).collect();
                ids.sort_unstable();
                (label, ids)
            })
            .collect()
    }

    /// Per-component scores; entry `c` belongs to label `c + 1`.
    pub fn component_scores(&self) -> &[ComponentScore] {
        &self.scores
    }

    pub fn component_score(&self, label: ComponentId) -> Option<&ComponentScore> {
        self.scores.get((label as usize).checked_sub(1)?)
    }

    /// Total number of connected pieces across all components.
    pub fn total_pieces(&self) -> usize {
        self.scores.iter().map(|s| s.pieces).sum()
    }

    /// Incrementally maintained cut-edge set.
    pub fn hypotheticals(&self) -> &HypotheticalSet {
        &self.hypotheticals
    }

    /// Cut-edge set recomputed by a full scan of the graph.
    pub fn compute_hypotheticals(&self) -> HypotheticalSet {
        HypotheticalSet::from_edges(
            self.graph
                .edges()
                .iter()
                .copied()
                .filter(|&(u, v)| self.assignment[u] != self.assignment[v]),
        )
    }

    /// New chromosome in which vertex `j` joins the component of vertex `i`.
    pub fn connect_vertices(&self, (i, j): (VertexId, VertexId)) -> Result<Self, PartitionError> {
        let (i, j) = (self.index(i)?, self.index(j)?);
        let mut next = self.clone();
        next.apply_move(i, j)?;
        Ok(next)
    }

    /// Move vertex index `j` into the component of vertex index `i`, in place.
    pub fn apply_move(&mut self, i: usize, j: usize) -> Result<(), PartitionError> {
        let target = self.assignment[i];
        if self.assignment[j] == target {
            return Err(self.same_component(i, j));
        }
        self.reassign(j, target);
        Ok(())
    }

    /// Scores that `apply_move(i, j)` would produce.
    pub fn preview_move(&self, i: usize, j: usize) -> Result<MovePreview, PartitionError> {
        let to = self.assignment[i];
        let from = self.assignment[j];
        if from == to {
            return Err(self.same_component(i, j));
        }
        let (f, t) = (from as usize - 1, to as usize - 1);
        let mut scores = self.scores.clone();

        let target = &self.members[t];
        let gained = &mut scores[t];
        gained.size += 1;
        for (column, total) in gained.totals.iter_mut().enumerate() {
            *total += self.graph.weight(column, j).unwrap_or(0.0);
        }
        gained.pieces = self.graph.count_pieces(
            target.iter().copied().chain(iter::once(j)),
            |v| v == j || target.contains(&v),
        );

        let source = &self.members[f];
        if source.len() == 1 {
            scores.remove(f);
        } else {
            let lost = &mut scores[f];
            lost.size -= 1;
            for (column, total) in lost.totals.iter_mut().enumerate() {
                *total -= self.graph.weight(column, j).unwrap_or(0.0);
            }
            lost.pieces = self.graph.count_pieces(
                source.iter().copied().filter(|&v| v != j),
                |v| v != j && source.contains(&v),
            );
        }

        Ok(MovePreview {
            edge: (i, j),
            scores,
        })
    }

    /// Single-point crossover; both children have the parents' length.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        other: &Chromosome,
        rng: &mut R,
    ) -> Result<(Chromosome, Chromosome), PartitionError> {
        let n = self.assignment.len();
        if other.assignment.len() != n {
            return Err(PartitionError::AssignmentLength {
                expected: n,
                actual: other.assignment.len(),
            });
        }
        if n < 2 {
            return Ok((self.clone(), other.clone()));
        }

        let split = rng.gen_range(1..n);
        let a = [&self.assignment[..split], &other.assignment[split..]].concat();
        let b = [&other.assignment[..split], &self.assignment[split..]].concat();

        Ok((
            Chromosome::new(Arc::clone(&self.graph), a)?,
            Chromosome::new(Arc::clone(&self.graph), b)?,
        ))
    }

    /// Reassign one random vertex to a random existing component, in place.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.assignment.is_empty() {
            return;
        }
        let v = rng.gen_range(0..self.assignment.len());
        let label = rng.gen_range(1..=self.num_components() as ComponentId);
        self.reassign(v, label);
    }

    fn index(&self, vertex: VertexId) -> Result<usize, PartitionError> {
        self.graph
            .index_of(vertex)
            .ok_or(PartitionError::UnknownVertex(vertex))
    }

    fn same_component(&self, i: usize, j: usize) -> PartitionError {
        PartitionError::SameComponent {
            i: self.graph.vertex_id(i),
            j: self.graph.vertex_id(j),
            component: self.assignment[i],
        }
    }

    fn reassign(&mut self, v: usize, to: ComponentId) {
        let from = self.assignment[v];
        if from == to {
            return;
        }
        let (f, t) = (from as usize - 1, to as usize - 1);
        let graph = Arc::clone(&self.graph);
        self.assignment[v] = to;

        self.members[f].remove(&v);
        self.members[t].insert(v);

        for column in 0..graph.num_weight_columns() {
            let w = graph.weight(column, v).unwrap_or(0.0);
            self.scores[f].totals[column] -= w;
            self.scores[t].totals[column] += w;
        }
        self.scores[f].size -= 1;
        self.scores[t].size += 1;

        let source = &self.members[f];
        self.scores[f].pieces = graph.count_pieces(source.iter().copied(), |u| source.contains(&u));
        if self.first[f] == v {
            self.first[f] = source.iter().copied().min().unwrap_or(usize::MAX);
        }
        let target = &self.members[t];
        self.scores[t].pieces = graph.count_pieces(target.iter().copied(), |u| target.contains(&u));
        self.first[t] = self.first[t].min(v);

        for &n in graph.neighbors(v) {
            if self.assignment[n] == to {
                self.hypotheticals.remove((v, n));
            } else {
                self.hypotheticals.add((v, n));
            }
        }

        self.renormalize();
    }

    /// Restore label normalization after a reassignment. Relabels the whole
    /// assignment only when a component vanished or first appearances reordered.
    fn renormalize(&mut self) {
        let count = self.members.len();
        let normalized = self.members.iter().all(|set| !set.is_empty())
            && self.first.windows(2).all(|w| w[0] < w[1]);
        if normalized {
            return;
        }

        let mut order: Vec<usize> = (0..count)
            .filter(|&c| !self.members[c].is_empty())
            .collect();
        order.sort_unstable_by_key(|&c| self.first[c]);

        let mut relabel = vec![0 as ComponentId; count];
        for (new, &old) in order.iter().enumerate() {
            relabel[old] = new as ComponentId + 1;
        }
        for label in self.assignment.iter_mut() {
            *label = relabel[*label as usize - 1];
        }

        self.members = order
            .iter()
            .map(|&c| std::mem::take(&mut self.members[c]))
            .collect();
        self.scores = order
            .iter()
            .map(|&c| std::mem::take(&mut self.scores[c]))
            .collect();
        self.first = order.iter().map(|&c| self.first[c]).collect();
    }
}

impl PartialEq for Chromosome {
    fn eq(&self, other: &Self) -> bool {
        self.assignment == other.assignment
    }
}

impl Eq for Chromosome {}

impl Hash for Chromosome {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.assignment.hash(state);
    }
}

impl fmt::Debug for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chromosome")
            .field("assignment", &self.assignment)
            .field("components", &self.num_components())
            .field("hypotheticals", &self.hypotheticals.len())
            .finish()
    }
}
