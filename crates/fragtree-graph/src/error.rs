//! Graph error types.

use crate::ids::VertexId;

/// Errors that can occur while building or validating a fragment graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Vertex ID does not exist in the graph.
    UnknownVertex(VertexId),
    /// The pseudo-root cannot be the target of a loss.
    RootAsTarget,
    /// A loss must connect two distinct fragments.
    SelfLoop(VertexId),
    /// Loss weights must be finite.
    NonFiniteWeight { source: VertexId, target: VertexId, weight: f64 },
    /// The graph contains a directed cycle.
    CycleDetected { unvisited: usize },
    /// The graph has no losses to select from.
    NoLosses,
    /// A tree must contain at least its root.
    EmptyTree,
    /// Only the first tree node may lack a parent, and parents precede children.
    InvalidTreeParent { node: usize, parent: Option<usize> },
}

impl GraphError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::UnknownVertex(_) => "GRAPH_UNKNOWN_VERTEX",
            GraphError::RootAsTarget => "GRAPH_ROOT_AS_TARGET",
            GraphError::SelfLoop(_) => "GRAPH_SELF_LOOP",
            GraphError::NonFiniteWeight { .. } => "GRAPH_NON_FINITE_WEIGHT",
            GraphError::CycleDetected { .. } => "GRAPH_CYCLE",
            GraphError::NoLosses => "GRAPH_EMPTY",
            GraphError::EmptyTree => "TREE_EMPTY",
            GraphError::InvalidTreeParent { .. } => "TREE_INVALID_PARENT",
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::UnknownVertex(id) => {
                write!(f, "[{}] Vertex {} does not exist", self.code(), id)
            }
            GraphError::RootAsTarget => write!(
                f,
                "[{}] The pseudo-root cannot be the target of a loss",
                self.code()
            ),
            GraphError::SelfLoop(id) => {
                write!(f, "[{}] Loss from vertex {} to itself", self.code(), id)
            }
            GraphError::NonFiniteWeight {
                source,
                target,
                weight,
            } => write!(
                f,
                "[{}] Loss {} -> {} has non-finite weight {}",
                self.code(),
                source,
                target,
                weight
            ),
            GraphError::CycleDetected { unvisited } => write!(
                f,
                "[{}] Graph has a cycle ({} vertices not reachable in topological order)",
                self.code(),
                unvisited
            ),
            GraphError::NoLosses => write!(f, "[{}] Graph has no losses", self.code()),
            GraphError::EmptyTree => write!(f, "[{}] Tree has no root node", self.code()),
            GraphError::InvalidTreeParent { node, parent } => match parent {
                Some(parent) => write!(
                    f,
                    "[{}] Tree node {} has parent {} which does not precede it",
                    self.code(),
                    node,
                    parent
                ),
                None => write!(f, "[{}] Tree node {} has no parent", self.code(), node),
            },
        }
    }
}

impl std::error::Error for GraphError {}
