//! Independent check of a reconstructed tree against the source graph.
//!
//! Each tree edge is matched among the child vertex's incoming losses by its
//! endpoints and formulas, not by column, so the check does not share any
//! indexing with the model that produced it.

use crate::error::VerificationError;
use fragtree_graph::{FragmentGraph, FragmentationTree, TreeNode};
use std::collections::HashSet;
use tracing::{error, warn};

/// Largest accepted difference between reported and recomputed score.
pub const SCORE_TOLERANCE: f64 = 1e-4;

/// Differences above this are logged even when within tolerance.
pub const GAP_WARNING: f64 = 1e-9;

/// Outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerifiedScore {
    pub reported: f64,
    pub recomputed: f64,
    /// `reported - recomputed`
    pub gap: f64,
}

pub fn verify_tree(
    graph: &FragmentGraph,
    tree: &FragmentationTree,
    score: f64,
) -> Result<VerifiedScore, VerificationError> {
    if tree.num_edges() == 0 {
        return Err(VerificationError::EmptyTree);
    }

    let mut colors = HashSet::new();
    for node in &tree.nodes()[1..] {
        if !colors.insert(node.color) {
            return Err(VerificationError::ColorConflict { color: node.color });
        }
    }

    let mut recomputed = 0.0;
    for (parent, child) in tree.edges() {
        let (Some(parent), Some(child)) = (tree.node(parent), tree.node(child)) else {
            continue;
        };
        recomputed += loss_weight(graph, parent, child).ok_or_else(|| {
            VerificationError::MissingLoss {
                parent: parent.formula.clone(),
                child: child.formula.clone(),
            }
        })?;
    }

    let gap = score - recomputed;
    if gap.abs() > SCORE_TOLERANCE || gap.is_nan() {
        error!(
            component = "ilp",
            operation = "verify",
            status = "mismatch",
            reported = score,
            recomputed,
            gap,
            "Backend score disagrees with the tree weight"
        );
        return Err(VerificationError::ScoreMismatch {
            expected: score,
            actual: recomputed,
            gap,
        });
    }
    if gap.abs() > GAP_WARNING {
        warn!(
            component = "ilp",
            operation = "verify",
            status = "gap",
            reported = score,
            recomputed,
            gap,
            "Backend score differs slightly from the tree weight"
        );
    }

    Ok(VerifiedScore {
        reported: score,
        recomputed,
        gap,
    })
}

/// Weight of the loss from `parent`'s vertex into `child`'s vertex.
///
/// Both nodes must still carry the formulas of the vertices they name.
fn loss_weight(graph: &FragmentGraph, parent: &TreeNode, child: &TreeNode) -> Option<f64> {
    let fragment = graph.fragment(child.vertex).ok()?;
    if fragment.formula != child.formula {
        return None;
    }
    graph
        .incoming(child.vertex)
        .iter()
        .filter_map(|&id| graph.loss(id))
        .find(|loss| {
            loss.source == parent.vertex
                && graph
                    .fragment(loss.source)
                    .is_ok_and(|source| source.formula == parent.formula)
                && child
                    .loss_formula
                    .as_deref()
                    .is_none_or(|formula| formula == loss.formula)
        })
        .map(|loss| loss.weight)
}
