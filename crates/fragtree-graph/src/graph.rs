//! Fragment graph: a rooted DAG of candidate fragments connected by losses.
//!
//! Vertex 0 is always the pseudo-root (empty formula). Losses are stored in
//! insertion order and that order is the column numbering every solver
//! backend uses for the loss indicator variables.

use crate::error::GraphError;
use crate::ids::{LossId, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// A candidate fragment (molecular formula decomposition of a peak).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Molecular formula of the fragment. Empty for the pseudo-root.
    pub formula: String,
    /// Color class; at most one fragment per color may appear in a tree.
    pub color: u32,
    /// Peak the fragment explains, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak: Option<u32>,
}

impl Fragment {
    pub fn new(formula: impl Into<String>, color: u32) -> Self {
        Self {
            formula: formula.into(),
            color,
            peak: None,
        }
    }

    /// Check if this is the pseudo-root fragment.
    pub fn is_pseudo_root(&self) -> bool {
        self.formula.is_empty()
    }
}

/// A directed loss edge between two fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loss {
    pub source: VertexId,
    pub target: VertexId,
    pub weight: f64,
    /// Formula of the neutral loss.
    #[serde(default)]
    pub formula: String,
}

/// Serialized form of a [`FragmentGraph`]; adjacency is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphData {
    fragments: Vec<Fragment>,
    losses: Vec<Loss>,
}

/// A rooted DAG of fragments and losses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "GraphData", try_from = "GraphData")]
pub struct FragmentGraph {
    fragments: Vec<Fragment>,
    losses: Vec<Loss>,
    incoming: Vec<Vec<LossId>>,
    outgoing: Vec<Vec<LossId>>,
    by_formula: HashMap<String, Vec<VertexId>>,
}

impl FragmentGraph {
    /// Create a graph containing only the pseudo-root.
    pub fn new() -> Self {
        Self::with_root(Fragment::new(String::new(), 0))
    }

    /// Create a graph whose vertex 0 is the given root fragment.
    pub fn with_root(root: Fragment) -> Self {
        let mut graph = Self {
            fragments: Vec::new(),
            losses: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            by_formula: HashMap::new(),
        };
        graph.push_fragment(root);
        graph
    }

    /// Pre-allocate storage for the expected graph size.
    pub fn with_capacities(vertices: usize, losses: usize) -> Self {
        let mut graph = Self::new();
        graph.fragments.reserve(vertices);
        graph.incoming.reserve(vertices);
        graph.outgoing.reserve(vertices);
        graph.losses.reserve(losses);
        graph
    }

    fn push_fragment(&mut self, fragment: Fragment) -> VertexId {
        let id = VertexId::new(self.fragments.len() as u32);
        self.by_formula
            .entry(fragment.formula.clone())
            .or_default()
            .push(id);
        self.fragments.push(fragment);
        self.incoming.push(Vec::new());
        self.outgoing.push(Vec::new());
        id
    }

    /// Add a fragment vertex and return its ID.
    pub fn add_fragment(&mut self, formula: impl Into<String>, color: u32) -> VertexId {
        self.push_fragment(Fragment::new(formula, color))
    }

    /// Add a fragment vertex explaining the given peak.
    pub fn add_fragment_with_peak(
        &mut self,
        formula: impl Into<String>,
        color: u32,
        peak: u32,
    ) -> VertexId {
        let mut fragment = Fragment::new(formula, color);
        fragment.peak = Some(peak);
        self.push_fragment(fragment)
    }

    /// Add a loss edge between two existing fragments.
    ///
    /// # Errors
    ///
    /// Returns an error if either vertex is unknown, the target is the
    /// pseudo-root, source and target coincide, or the weight is not finite.
    pub fn add_loss(
        &mut self,
        source: VertexId,
        target: VertexId,
        weight: f64,
        formula: impl Into<String>,
    ) -> Result<LossId, GraphError> {
        self.ensure_vertex_exists(source)?;
        self.ensure_vertex_exists(target)?;
        if target == self.root() {
            return Err(GraphError::RootAsTarget);
        }
        if source == target {
            return Err(GraphError::SelfLoop(source));
        }
        if !weight.is_finite() {
            return Err(GraphError::NonFiniteWeight {
                source,
                target,
                weight,
            });
        }

        let id = LossId::new(self.losses.len() as u32);
        self.losses.push(Loss {
            source,
            target,
            weight,
            formula: formula.into(),
        });
        self.outgoing[source.index()].push(id);
        self.incoming[target.index()].push(id);

        trace!(
            component = "graph",
            operation = "add_loss",
            status = "success",
            loss = id.inner(),
            source = source.inner(),
            target = target.inner(),
            weight,
            "Added loss"
        );
        Ok(id)
    }

    fn ensure_vertex_exists(&self, id: VertexId) -> Result<(), GraphError> {
        if id.index() < self.fragments.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownVertex(id))
        }
    }

    /// The pseudo-root vertex.
    pub fn root(&self) -> VertexId {
        VertexId::new(0)
    }

    pub fn num_vertices(&self) -> usize {
        self.fragments.len()
    }

    pub fn num_losses(&self) -> usize {
        self.losses.len()
    }

    /// Get a fragment by vertex ID.
    pub fn fragment(&self, id: VertexId) -> Result<&Fragment, GraphError> {
        self.fragments
            .get(id.index())
            .ok_or(GraphError::UnknownVertex(id))
    }

    /// All fragments in vertex order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Get a loss by ID.
    pub fn loss(&self, id: LossId) -> Option<&Loss> {
        self.losses.get(id.index())
    }

    /// All losses in insertion order.
    pub fn losses(&self) -> &[Loss] {
        &self.losses
    }

    /// Losses entering the given vertex, in insertion order.
    pub fn incoming(&self, id: VertexId) -> &[LossId] {
        self.incoming.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Losses leaving the given vertex, in insertion order.
    pub fn outgoing(&self, id: VertexId) -> &[LossId] {
        self.outgoing.get(id.index()).map_or(&[], Vec::as_slice)
    }

    pub fn in_degree(&self, id: VertexId) -> usize {
        self.incoming(id).len()
    }

    pub fn out_degree(&self, id: VertexId) -> usize {
        self.outgoing(id).len()
    }

    /// Largest color used by any fragment.
    pub fn max_color(&self) -> u32 {
        self.fragments
            .iter()
            .map(|fragment| fragment.color)
            .max()
            .unwrap_or(0)
    }

    /// All vertices carrying the given formula.
    pub fn vertices_with_formula(&self, formula: &str) -> &[VertexId] {
        self.by_formula.get(formula).map_or(&[], Vec::as_slice)
    }

    /// Iterate over vertex IDs in order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.fragments.len()).map(|index| VertexId::new(index as u32))
    }

    /// Group vertices into topological layers.
    ///
    /// Layer 0 holds every vertex without incoming losses; each following
    /// layer holds the vertices whose parents all appear in earlier layers.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CycleDetected`] if some vertices are never freed.
    pub fn topological_layers(&self) -> Result<Vec<Vec<VertexId>>, GraphError> {
        let mut indegree = self.incoming.iter().map(Vec::len).collect::<Vec<_>>();
        let mut layers: Vec<Vec<VertexId>> = Vec::new();
        let mut current = self
            .vertex_ids()
            .filter(|id| indegree[id.index()] == 0)
            .collect::<Vec<_>>();
        let mut visited = 0usize;

        while !current.is_empty() {
            visited += current.len();
            let mut next = Vec::new();
            for &vertex in &current {
                for &loss_id in self.outgoing(vertex) {
                    let target = self.losses[loss_id.index()].target;
                    indegree[target.index()] -= 1;
                    if indegree[target.index()] == 0 {
                        next.push(target);
                    }
                }
            }
            layers.push(current);
            current = next;
        }

        if visited != self.fragments.len() {
            return Err(GraphError::CycleDetected {
                unvisited: self.fragments.len() - visited,
            });
        }
        Ok(layers)
    }

    /// Check that the graph can be handed to a tree solver.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph has no losses or contains a cycle.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.losses.is_empty() {
            return Err(GraphError::NoLosses);
        }
        let layers = self.topological_layers()?;
        debug!(
            component = "graph",
            operation = "validate",
            status = "success",
            vertices = self.num_vertices(),
            losses = self.num_losses(),
            depth = layers.len(),
            "Validated fragment graph"
        );
        Ok(())
    }
}

impl Default for FragmentGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl From<FragmentGraph> for GraphData {
    fn from(graph: FragmentGraph) -> Self {
        GraphData {
            fragments: graph.fragments,
            losses: graph.losses,
        }
    }
}

impl TryFrom<GraphData> for FragmentGraph {
    type Error = GraphError;

    fn try_from(data: GraphData) -> Result<Self, Self::Error> {
        let mut fragments = data.fragments.into_iter();
        let mut graph = match fragments.next() {
            Some(root) => FragmentGraph::with_root(root),
            None => FragmentGraph::new(),
        };
        for fragment in fragments {
            graph.push_fragment(fragment);
        }
        for loss in data.losses {
            graph.add_loss(loss.source, loss.target, loss.weight, loss.formula)?;
        }
        Ok(graph)
    }
}
