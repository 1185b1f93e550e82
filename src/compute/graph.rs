//! Master graph: the immutable weighted adjacency graph shared by every partition.
//!
//! Vertices carry an opaque [`VertexId`] plus a dense index in `0..num_vertices()`
//! assigned in insertion order. All hot-path structures (assignments, adjacency,
//! hypothetical edges) work on dense indices; ids only appear at the API boundary.

use rustc_hash::{FxHashMap, FxHashSet};

/// Opaque vertex identifier supplied by the annotation layer.
pub type VertexId = u64;

/// Weight column used when no key is configured.
pub const DEFAULT_WEIGHT_KEY: &str = "pop";

/// Opaque geometry handle (shape reference) carried for the reporting layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

/// Graph construction errors.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Unknown vertex {0}")]
    UnknownVertex(VertexId),
    #[error("Self loop on vertex {0}")]
    SelfLoop(VertexId),
    #[error("District count must be at least 1")]
    InvalidDistricts,
}

/// A named per-vertex weight column.
#[derive(Debug, Clone)]
struct WeightColumn {
    key: String,
    values: Vec<Option<f64>>,
}

/// Undirected vertex-weighted graph with a fixed vertex order.
#[derive(Debug, Clone)]
pub struct MasterGraph {
    districts: usize,
    ids: Vec<VertexId>,
    index: FxHashMap<VertexId, usize>,
    adjacency: Vec<Vec<usize>>,
    edges: Vec<(usize, usize)>,
    edge_set: FxHashSet<(usize, usize)>,
    columns: Vec<WeightColumn>,
    geometry: Vec<Option<GeometryHandle>>,
}

impl MasterGraph {
    /// Create an empty graph targeting `districts` components.
    pub fn new(districts: usize) -> Result<Self, GraphError> {
        if districts == 0 {
            return Err(GraphError::InvalidDistricts);
        }
        Ok(Self {
            districts,
            ids: Vec::new(),
            index: FxHashMap::default(),
            adjacency: Vec::new(),
            edges: Vec::new(),
            edge_set: FxHashSet::default(),
            columns: Vec::new(),
            geometry: Vec::new(),
        })
    }

    /// Path graph `0 - 1 - ... - (n-1)` with unit `pop` weights.
    pub fn path(n: usize, districts: usize) -> Result<Self, GraphError> {
        let mut graph = Self::new(districts)?;
        for v in 0..n as VertexId {
            graph.add_vertex(v);
            graph.set_weight(v, DEFAULT_WEIGHT_KEY, 1.0)?;
        }
        for v in 1..n as VertexId {
            graph.add_edge(v - 1, v)?;
        }
        Ok(graph)
    }

    /// `rows x cols` grid graph with unit `pop` weights. Vertex `(r, c)` has id `r * cols + c`.
    pub fn grid(rows: usize, cols: usize, districts: usize) -> Result<Self, GraphError> {
        let mut graph = Self::lattice(rows, cols, districts)?;
        for id in 0..(rows * cols) as VertexId {
            graph.set_weight(id, DEFAULT_WEIGHT_KEY, 1.0)?;
        }
        Ok(graph)
    }

    /// Unweighted `rows x cols` grid; vertices are inserted row by row.
    pub fn lattice(rows: usize, cols: usize, districts: usize) -> Result<Self, GraphError> {
        let mut graph = Self::new(districts)?;
        for id in 0..(rows * cols) as VertexId {
            graph.add_vertex(id);
        }
        for r in 0..rows {
            for c in 0..cols {
                let id = (r * cols + c) as VertexId;
                if c + 1 < cols {
                    graph.add_edge(id, id + 1)?;
                }
                if r + 1 < rows {
                    graph.add_edge(id, id + cols as VertexId)?;
                }
            }
        }
        Ok(graph)
    }

    /// Add a vertex, returning its dense index. Adding an existing id is a no-op.
    pub fn add_vertex(&mut self, id: VertexId) -> usize {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id);
        self.index.insert(id, idx);
        self.adjacency.push(Vec::new());
        self.geometry.push(None);
        for column in &mut self.columns {
            column.values.push(None);
        }
        idx
    }

    /// Add an undirected edge, inserting missing endpoints. Duplicate edges are ignored.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> Result<(), GraphError> {
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        let u = self.add_vertex(a);
        let v = self.add_vertex(b);
        let key = (u.min(v), u.max(v));
        if self.edge_set.insert(key) {
            self.edges.push(key);
            self.adjacency[u].push(v);
            self.adjacency[v].push(u);
        }
        Ok(())
    }

    /// Set weight `key` of vertex `id`, creating the column on first use.
    pub fn set_weight(&mut self, id: VertexId, key: &str, value: f64) -> Result<(), GraphError> {
        let idx = *self.index.get(&id).ok_or(GraphError::UnknownVertex(id))?;
        let column = match self.column_index(key) {
            Some(c) => c,
            None => {
                self.columns.push(WeightColumn {
                    key: key.to_string(),
                    values: vec![None; self.ids.len()],
                });
                self.columns.len() - 1
            }
        };
        self.columns[column].values[idx] = Some(value);
        Ok(())
    }

    /// Attach an opaque geometry handle to vertex `id`.
    pub fn set_geometry(&mut self, id: VertexId, handle: GeometryHandle) -> Result<(), GraphError> {
        let idx = *self.index.get(&id).ok_or(GraphError::UnknownVertex(id))?;
        self.geometry[idx] = Some(handle);
        Ok(())
    }

    #[inline]
    pub fn districts(&self) -> usize {
        self.districts
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Vertex ids in index order.
    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    #[inline]
    pub fn vertex_id(&self, index: usize) -> VertexId {
        self.ids[index]
    }

    #[inline]
    pub fn index_of(&self, id: VertexId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[inline]
    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.adjacency[index]
    }

    /// Canonical `(min, max)` index pairs.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    #[inline]
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.edge_set.contains(&(u.min(v), u.max(v)))
    }

    pub fn geometry(&self, index: usize) -> Option<GeometryHandle> {
        self.geometry[index]
    }

    pub fn num_weight_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn weight_keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.key.as_str())
    }

    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    pub fn column_key(&self, column: usize) -> &str {
        &self.columns[column].key
    }

    /// Weight of vertex `index` in `column`, `None` when the vertex lacks the attribute.
    #[inline]
    pub fn weight(&self, column: usize, index: usize) -> Option<f64> {
        self.columns[column].values[index]
    }

    /// Sum of a column, treating missing values as zero.
    pub fn total_weight(&self, column: usize) -> f64 {
        self.columns[column].values.iter().flatten().sum()
    }

    /// First vertex lacking a weight in column `key`; `None` when the column is
    /// complete or not declared.
    pub fn find_missing_weight(&self, key: &str) -> Option<VertexId> {
        let column = self.columns.iter().find(|c| c.key == key)?;
        column
            .values
            .iter()
            .position(Option::is_none)
            .map(|idx| self.ids[idx])
    }

    /// Number of connected pieces of the subgraph induced by `members`.
    ///
    /// `contains` must agree with `members`; the walk never leaves the member set,
    /// so the cost is proportional to the members and their incident edges.
    pub fn count_pieces<I, F>(&self, members: I, contains: F) -> usize
    where
        I: IntoIterator<Item = usize>,
        F: Fn(usize) -> bool,
    {
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        let mut stack = Vec::new();
        let mut pieces = 0;

        for source in members {
            if !seen.insert(source) {
                continue;
            }
            pieces += 1;
            stack.push(source);
            while let Some(v) = stack.pop() {
                for &n in &self.adjacency[v] {
                    if contains(n) && seen.insert(n) {
                        stack.push(n);
                    }
                }
            }
        }
        pieces
    }

    /// Whether the whole graph is a single connected piece.
    pub fn is_connected(&self) -> bool {
        self.num_vertices() == 0 || self.count_pieces(0..self.num_vertices(), |_| true) == 1
    }
}
