//! Linear rows of the colorful subtree formulation.

use crate::offsets::EdgeIndex;
use fragtree_graph::FragmentGraph;
use fragtree_solver::{Bounds, ConstraintFamily, LinearRow};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Rows produced for one graph, in emission order.
#[derive(Debug, Clone, Default)]
pub struct ConstraintRows {
    rows: Vec<LinearRow>,
}

impl ConstraintRows {
    pub fn rows(&self) -> &[LinearRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<LinearRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows per constraint family.
    pub fn family_counts(&self) -> BTreeMap<ConstraintFamily, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.family).or_insert(0) += 1;
        }
        counts
    }

    /// Check whether every row holds for a 0/1 assignment.
    pub fn all_satisfied(&self, assignment: &[bool], tolerance: f64) -> bool {
        self.rows
            .iter()
            .all(|row| row.is_satisfied(assignment, tolerance))
    }

    fn push(&mut self, row: LinearRow) {
        trace!(
            component = "ilp",
            operation = "build_rows",
            status = "success",
            family = row.family.as_str(),
            nnz = row.len(),
            lower = row.bounds.lower,
            upper = row.bounds.upper,
            "Emitted row"
        );
        self.rows.push(row);
    }
}

/// Build every constraint row for `graph`.
///
/// Columns are loss indices. The minimal score row is only emitted for a
/// finite `minimal_score`.
pub fn build_rows(
    graph: &FragmentGraph,
    index: &EdgeIndex,
    minimal_score: Option<f64>,
) -> ConstraintRows {
    let mut rows = ConstraintRows::default();
    push_tree_rows(graph, index, &mut rows);
    push_color_rows(graph, &mut rows);
    push_minimal_tree_size_row(graph, index, &mut rows);
    if let Some(score) = minimal_score.filter(|score| score.is_finite()) {
        push_minimal_score_row(graph, score, &mut rows);
    }

    debug!(
        component = "ilp",
        operation = "build_rows",
        status = "success",
        vertices = graph.num_vertices(),
        losses = graph.num_losses(),
        rows = rows.len(),
        "Built constraint rows"
    );
    rows
}

/// A non-root vertex keeps at most one parent and may only branch once reached.
fn push_tree_rows(graph: &FragmentGraph, index: &EdgeIndex, rows: &mut ConstraintRows) {
    for vertex in graph.vertex_ids().filter(|&v| v != graph.root()) {
        let incoming: Vec<usize> = graph.incoming(vertex).iter().map(|id| id.index()).collect();

        for &out_column in index.outgoing_columns(vertex) {
            let mut columns = incoming.clone();
            let mut coefficients = vec![1.0; incoming.len()];
            columns.push(out_column);
            coefficients.push(-1.0);
            rows.push(LinearRow {
                family: ConstraintFamily::Tree,
                columns,
                coefficients,
                bounds: Bounds::at_least(0.0),
            });
        }

        if !incoming.is_empty() {
            rows.push(LinearRow::unit(
                ConstraintFamily::TreeParent,
                incoming,
                Bounds::at_most(1.0),
            ));
        }
    }
}

/// At most one selected loss ends in each color.
fn push_color_rows(graph: &FragmentGraph, rows: &mut ConstraintRows) {
    let mut classes: Vec<Vec<usize>> = vec![Vec::new(); graph.max_color() as usize + 1];
    for (column, loss) in graph.losses().iter().enumerate() {
        let color = graph.fragments()[loss.target.index()].color;
        classes[color as usize].push(column);
    }

    for class in classes.into_iter().filter(|class| !class.is_empty()) {
        rows.push(LinearRow::unit(
            ConstraintFamily::Color,
            class,
            Bounds::at_most(1.0),
        ));
    }
}

fn push_minimal_tree_size_row(graph: &FragmentGraph, index: &EdgeIndex, rows: &mut ConstraintRows) {
    rows.push(LinearRow::unit(
        ConstraintFamily::MinimalTreeSize,
        index.outgoing_columns(graph.root()).to_vec(),
        Bounds::at_least(1.0),
    ));
}

fn push_minimal_score_row(graph: &FragmentGraph, minimal_score: f64, rows: &mut ConstraintRows) {
    rows.push(LinearRow {
        family: ConstraintFamily::MinimalScore,
        columns: (0..graph.num_losses()).collect(),
        coefficients: graph.losses().iter().map(|loss| loss.weight).collect(),
        bounds: Bounds::at_least(minimal_score),
    });
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::tests::support::scenario_graph;

    fn rows_of(rows: &ConstraintRows, family: ConstraintFamily) -> Vec<&LinearRow> {
        rows.rows().iter().filter(|row| row.family == family).collect()
    }

    #[test]
    fn test_scenario_rows() {
        let graph = scenario_graph();
        let index = EdgeIndex::compute(&graph);
        let rows = build_rows(&graph, &index, None);

        // A has one outgoing loss: x_rootA - x_AB >= 0
        let tree = rows_of(&rows, ConstraintFamily::Tree);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].columns, vec![0, 1]);
        assert_eq!(tree[0].coefficients, vec![1.0, -1.0]);
        assert_eq!(tree[0].bounds, Bounds::at_least(0.0));

        // A, B and C each have one parent candidate
        assert_eq!(rows_of(&rows, ConstraintFamily::TreeParent).len(), 3);

        // color 1 holds root->A and root->C, color 2 holds A->B
        let color = rows_of(&rows, ConstraintFamily::Color);
        assert_eq!(color.len(), 2);
        assert_eq!(color[0].columns, vec![0, 2]);
        assert_eq!(color[1].columns, vec![1]);

        let size = rows_of(&rows, ConstraintFamily::MinimalTreeSize);
        assert_eq!(size.len(), 1);
        assert_eq!(size[0].columns, vec![0, 2]);
        assert_eq!(size[0].bounds.lower, 1.0);

        assert!(rows_of(&rows, ConstraintFamily::MinimalScore).is_empty());
    }

    #[test]
    fn test_minimal_score_row_uses_weights() {
        let graph = scenario_graph();
        let index = EdgeIndex::compute(&graph);
        let rows = build_rows(&graph, &index, Some(6.5));

        let score = rows_of(&rows, ConstraintFamily::MinimalScore);
        assert_eq!(score.len(), 1);
        assert_eq!(score[0].columns, vec![0, 1, 2]);
        assert_eq!(score[0].coefficients, vec![5.0, 3.0, 4.0]);
        assert_eq!(score[0].bounds.lower, 6.5);
    }

    #[test]
    fn test_infinite_minimal_score_is_skipped() {
        let graph = scenario_graph();
        let index = EdgeIndex::compute(&graph);
        let rows = build_rows(&graph, &index, Some(f64::NEG_INFINITY));
        assert!(rows_of(&rows, ConstraintFamily::MinimalScore).is_empty());
    }

    #[test]
    fn test_family_counts() {
        let graph = scenario_graph();
        let index = EdgeIndex::compute(&graph);
        let counts = build_rows(&graph, &index, Some(1.0)).family_counts();
        assert_eq!(counts[&ConstraintFamily::Tree], 1);
        assert_eq!(counts[&ConstraintFamily::TreeParent], 3);
        assert_eq!(counts[&ConstraintFamily::Color], 2);
        assert_eq!(counts[&ConstraintFamily::MinimalTreeSize], 1);
        assert_eq!(counts[&ConstraintFamily::MinimalScore], 1);
    }

    #[test]
    fn test_rows_accept_best_tree_and_reject_color_clash() {
        let graph = scenario_graph();
        let index = EdgeIndex::compute(&graph);
        let rows = build_rows(&graph, &index, None);

        assert!(rows.all_satisfied(&[true, true, false], 1e-9));
        // root->A and root->C share color 1
        assert!(!rows.all_satisfied(&[true, false, true], 1e-9));
        // A->B without A
        assert!(!rows.all_satisfied(&[false, true, true], 1e-9));
        // empty tree
        assert!(!rows.all_satisfied(&[false, false, false], 1e-9));
    }

    #[test]
    fn test_diamond_tree_parent_row() {
        let mut graph = FragmentGraph::new();
        let a = graph.add_fragment("C6H6O", 1);
        let b = graph.add_fragment("C6H6", 2);
        let d = graph.add_fragment("C5H6", 3);
        graph.add_loss(graph.root(), a, 1.0, "").unwrap();
        graph.add_loss(graph.root(), b, 1.0, "").unwrap();
        graph.add_loss(a, d, 1.0, "CO").unwrap();
        graph.add_loss(b, d, 1.0, "C").unwrap();

        let index = EdgeIndex::compute(&graph);
        let rows = build_rows(&graph, &index, None);

        // both parents of d selected at once violates the parent row
        assert!(!rows.all_satisfied(&[true, true, true, true], 1e-9));
        assert!(rows.all_satisfied(&[true, true, true, false], 1e-9));
    }
}
