//! Fragmentation tree: the colorful subtree selected from a fragment graph.

use crate::error::GraphError;
use crate::graph::{Fragment, Loss};
use crate::ids::VertexId;
use serde::{Deserialize, Serialize};

/// A node of a [`FragmentationTree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub formula: String,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak: Option<u32>,
    /// Graph vertex this node was built from.
    pub vertex: VertexId,
    /// Index of the parent node; `None` for the root.
    pub parent: Option<usize>,
    /// Formula of the loss leading into this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_formula: Option<String>,
    /// Weight of the loss leading into this node (0 for the root).
    pub incoming_weight: f64,
}

/// Serialized form of a [`FragmentationTree`]; children and weight are
/// rebuilt from the parent links on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TreeData {
    nodes: Vec<TreeNode>,
}

/// Rooted tree of fragments with an aggregate weight.
///
/// The root is the graph's pseudo-root; every other node has exactly one
/// parent. Nodes are stored in insertion order, so a parent always precedes
/// its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TreeData", try_from = "TreeData")]
pub struct FragmentationTree {
    nodes: Vec<TreeNode>,
    children: Vec<Vec<usize>>,
    tree_weight: f64,
}

impl FragmentationTree {
    /// Create a tree containing only the root built from the given vertex.
    pub fn new(vertex: VertexId, root: &Fragment) -> Self {
        Self {
            nodes: vec![TreeNode {
                formula: root.formula.clone(),
                color: root.color,
                peak: root.peak,
                vertex,
                parent: None,
                loss_formula: None,
                incoming_weight: 0.0,
            }],
            children: vec![Vec::new()],
            tree_weight: 0.0,
        }
    }

    /// Attach a child below `parent`, reached through `loss`.
    ///
    /// Returns the index of the new node, or `None` if `parent` is unknown.
    pub fn add_child(
        &mut self,
        parent: usize,
        vertex: VertexId,
        fragment: &Fragment,
        loss: &Loss,
    ) -> Option<usize> {
        if parent >= self.nodes.len() {
            return None;
        }
        Some(self.push_node(
            parent,
            TreeNode {
                formula: fragment.formula.clone(),
                color: fragment.color,
                peak: fragment.peak,
                vertex,
                parent: Some(parent),
                loss_formula: Some(loss.formula.clone()),
                incoming_weight: loss.weight,
            },
        ))
    }

    /// `parent` must index an existing node.
    fn push_node(&mut self, parent: usize, node: TreeNode) -> usize {
        let index = self.nodes.len();
        self.tree_weight += node.incoming_weight;
        self.nodes.push(node);
        self.children.push(Vec::new());
        self.children[parent].push(index);
        index
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: usize) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn parent(&self, index: usize) -> Option<&TreeNode> {
        self.nodes
            .get(index)
            .and_then(|node| node.parent)
            .and_then(|parent| self.nodes.get(parent))
    }

    /// Sum of all loss weights in the tree.
    pub fn tree_weight(&self) -> f64 {
        self.tree_weight
    }

    /// Sum of the weights of losses leaving the root.
    pub fn root_score(&self) -> f64 {
        self.children(0)
            .iter()
            .map(|&child| self.nodes[child].incoming_weight)
            .sum()
    }

    /// Find the first node carrying the given formula.
    pub fn find(&self, formula: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.formula == formula)
    }

    /// Iterate over `(parent, child)` index pairs.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| node.parent.map(|parent| (parent, index)))
    }
}

impl From<FragmentationTree> for TreeData {
    fn from(tree: FragmentationTree) -> Self {
        TreeData { nodes: tree.nodes }
    }
}

impl TryFrom<TreeData> for FragmentationTree {
    type Error = GraphError;

    fn try_from(data: TreeData) -> Result<Self, Self::Error> {
        let mut nodes = data.nodes.into_iter();
        let root = nodes.next().ok_or(GraphError::EmptyTree)?;
        if root.parent.is_some() {
            return Err(GraphError::InvalidTreeParent {
                node: 0,
                parent: root.parent,
            });
        }
        let mut tree = FragmentationTree {
            nodes: vec![root],
            children: vec![Vec::new()],
            tree_weight: 0.0,
        };
        for node in nodes {
            let index = tree.nodes.len();
            match node.parent {
                Some(parent) if parent < index => {
                    tree.push_node(parent, node);
                }
                parent => return Err(GraphError::InvalidTreeParent { node: index, parent }),
            }
        }
        Ok(tree)
    }
}
