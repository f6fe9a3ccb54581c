//! Map a previously computed tree onto the columns of a new graph.
//!
//! Matching is best effort. Fragments are identified by formula: edges
//! leaving the template root match the graph root's outgoing losses by target
//! formula, deeper edges match the incoming losses of same-formula vertices by
//! loss formula. Template edges without a counterpart are skipped.

use crate::offsets::EdgeIndex;
use fragtree_graph::{FragmentGraph, FragmentationTree, TreeNode};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Start columns derived from a template tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmStart {
    /// Columns to seed with 1, sorted and unique.
    pub columns: Vec<usize>,
    /// Template edges with no matching loss.
    pub unmatched: usize,
}

impl WarmStart {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

pub fn start_columns(
    graph: &FragmentGraph,
    index: &EdgeIndex,
    template: &FragmentationTree,
) -> WarmStart {
    let mut columns = BTreeSet::new();
    let mut unmatched = 0usize;

    for (parent, child) in template.edges() {
        let (Some(parent_node), Some(child_node)) = (template.node(parent), template.node(child))
        else {
            continue;
        };
        let column = if parent_node.parent.is_none() {
            match_root_edge(graph, index, child_node)
        } else {
            match_inner_edge(graph, child_node)
        };
        match column {
            Some(column) => {
                columns.insert(column);
            }
            None => unmatched += 1,
        }
    }

    if unmatched > 0 {
        warn!(
            component = "ilp",
            operation = "warm_start",
            status = "partial",
            matched = columns.len(),
            unmatched,
            "Template edges without a matching loss were skipped"
        );
    } else {
        debug!(
            component = "ilp",
            operation = "warm_start",
            status = "success",
            matched = columns.len(),
            "Mapped template onto graph"
        );
    }

    WarmStart {
        columns: columns.into_iter().collect(),
        unmatched,
    }
}

fn match_root_edge(graph: &FragmentGraph, index: &EdgeIndex, child: &TreeNode) -> Option<usize> {
    index
        .outgoing_columns(graph.root())
        .iter()
        .copied()
        .find(|&column| {
            graph
                .fragment(graph.losses()[column].target)
                .is_ok_and(|fragment| fragment.formula == child.formula)
        })
}

fn match_inner_edge(graph: &FragmentGraph, child: &TreeNode) -> Option<usize> {
    let loss_formula = child.loss_formula.as_deref()?;
    graph
        .vertices_with_formula(&child.formula)
        .iter()
        .flat_map(|&vertex| graph.incoming(vertex))
        .map(|id| id.index())
        .find(|&column| graph.losses()[column].formula == loss_formula)
}
