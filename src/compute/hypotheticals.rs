//! The set of hypothetical (cut) edges of a partition.
//!
//! Every master-graph edge whose endpoints lie in different components is a
//! candidate single-vertex move. Both directions are stored so a uniformly
//! sampled entry is directly a move `(i, j)`: "pull `j` into `i`'s component".

use rand::Rng;
use rand::seq::index;
use rustc_hash::FxHashMap;

/// Directed edge between dense vertex indices.
pub type Edge = (usize, usize);

/// Symmetric edge set with O(1) membership, insertion, removal and sampling.
#[derive(Debug, Clone, Default)]
pub struct HypotheticalSet {
    edges: Vec<Edge>,
    positions: FxHashMap<Edge, usize>,
}

impl HypotheticalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from undirected edges; each is stored in both directions.
    pub fn from_edges<I: IntoIterator<Item = Edge>>(edges: I) -> Self {
        let mut set = Self::new();
        for edge in edges {
            set.add(edge);
        }
        set
    }

    /// Number of directed entries (twice the number of cut edges).
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether the undirected edge `{i, j}` is present.
    #[inline]
    pub fn contains(&self, (i, j): Edge) -> bool {
        self.positions.contains_key(&(i, j)) || self.positions.contains_key(&(j, i))
    }

    /// Insert `{i, j}` in both directions. Returns `false` if it was already present.
    pub fn add(&mut self, (i, j): Edge) -> bool {
        let inserted = self.insert_directed((i, j));
        self.insert_directed((j, i)) || inserted
    }

    /// Remove `{i, j}` in both directions. Returns `false` if it was absent.
    pub fn remove(&mut self, (i, j): Edge) -> bool {
        let removed = self.remove_directed((i, j));
        self.remove_directed((j, i)) || removed
    }

    /// Directed entries in storage order.
    pub fn iter(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().copied()
    }

    /// Uniform sample without replacement of `min(len, amount)` directed entries.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, amount: usize) -> Vec<Edge> {
        let amount = amount.min(self.edges.len());
        index::sample(rng, self.edges.len(), amount)
            .into_iter()
            .map(|i| self.edges[i])
            .collect()
    }

    fn insert_directed(&mut self, edge: Edge) -> bool {
        if self.positions.contains_key(&edge) {
            return false;
        }
        self.positions.insert(edge, self.edges.len());
        self.edges.push(edge);
        true
    }

    fn remove_directed(&mut self, edge: Edge) -> bool {
        let Some(pos) = self.positions.remove(&edge) else {
            return false;
        };
        self.edges.swap_remove(pos);
        if let Some(&moved) = self.edges.get(pos) {
            self.positions.insert(moved, pos);
        }
        true
    }
}

impl PartialEq for HypotheticalSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.edges.iter().all(|e| other.positions.contains_key(e))
    }
}

impl Eq for HypotheticalSet {}
