//! Rebuild a fragmentation tree from a 0/1 column assignment.

use crate::error::VerificationError;
use crate::offsets::EdgeIndex;
use fragtree_graph::{FragmentGraph, FragmentationTree};
use std::collections::HashSet;
use tracing::debug;

/// Check that no two selected losses end in the same color.
///
/// Every vertex has at most one selected incoming loss afterwards, since all
/// losses into a vertex share its color.
pub fn check_colorful(graph: &FragmentGraph, assignment: &[bool]) -> Result<(), VerificationError> {
    let mut seen = HashSet::new();
    for (loss, _) in graph
        .losses()
        .iter()
        .zip(assignment)
        .filter(|(_, selected)| **selected)
    {
        let color = graph.fragments()[loss.target.index()].color;
        if !seen.insert(color) {
            return Err(VerificationError::ColorConflict { color });
        }
    }
    Ok(())
}

/// Walk the selected losses depth-first from the root.
///
/// Selected losses that are not reachable from the root are left out of the
/// tree; verification then reports the weight they contributed as a gap.
pub fn build_tree(
    graph: &FragmentGraph,
    index: &EdgeIndex,
    assignment: &[bool],
) -> Result<FragmentationTree, VerificationError> {
    if assignment.len() != graph.num_losses() {
        return Err(VerificationError::AssignmentLength {
            expected: graph.num_losses(),
            got: assignment.len(),
        });
    }
    check_colorful(graph, assignment)?;

    let root = graph.root();
    let mut tree = FragmentationTree::new(root, &graph.fragments()[root.index()]);
    let mut stack = vec![(0usize, root)];

    while let Some((node, vertex)) = stack.pop() {
        for &column in index.outgoing_columns(vertex) {
            if !assignment[column] {
                continue;
            }
            let loss = &graph.losses()[column];
            let fragment = &graph.fragments()[loss.target.index()];
            if let Some(child) = tree.add_child(node, loss.target, fragment, loss) {
                stack.push((child, loss.target));
            }
        }
    }

    if tree.num_edges() == 0 {
        return Err(VerificationError::EmptyTree);
    }

    debug!(
        component = "ilp",
        operation = "reconstruct",
        status = "success",
        nodes = tree.num_nodes(),
        tree_weight = tree.tree_weight(),
        "Reconstructed tree"
    );
    Ok(tree)
}
