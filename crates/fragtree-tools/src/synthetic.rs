//! Seeded synthetic fragment graphs.

use fragtree_graph::{FragmentGraph, GraphError, VertexId};
use rand::prelude::*;
use tracing::debug;

/// Shape of a synthetic graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticGraphConfig {
    /// Fragments besides the pseudo-root.
    pub vertices: usize,
    /// Fragment `k` gets color `1 + (k - 1) % colors`.
    pub colors: u32,
    /// Probability of a loss between an earlier and a later fragment.
    pub density: f64,
    pub seed: u64,
    /// Draw formulas from a pool of this size instead of giving every
    /// fragment its own, so unrelated fragments share formulas.
    pub formula_pool: Option<usize>,
}

impl Default for SyntheticGraphConfig {
    fn default() -> Self {
        Self {
            vertices: 40,
            colors: 20,
            density: 0.15,
            seed: 42,
            formula_pool: None,
        }
    }
}

/// Generate a DAG where losses only run from lower to higher vertex ids.
///
/// Every fragment has at least one incoming loss and fragment 1 always hangs
/// off the root. Weights are multiples of 1/4 in `[-2, 6]`, so sums are exact.
pub fn synthetic_graph(config: &SyntheticGraphConfig) -> Result<FragmentGraph, GraphError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let colors = config.colors.max(1);
    let density = config.density.clamp(0.0, 1.0);
    let mut graph = FragmentGraph::with_capacities(config.vertices + 1, config.vertices * 4);

    for k in 1..=config.vertices {
        let color = 1 + (k as u32 - 1) % colors;
        let formula = match config.formula_pool {
            Some(pool) => format!("P{}", rng.gen_range(0..pool.max(1))),
            None => format!("F{k}"),
        };
        let target = graph.add_fragment_with_peak(formula, color, color);

        let mut parents: Vec<usize> = (0..k).filter(|_| rng.gen_bool(density)).collect();
        if parents.is_empty() {
            parents.push(rng.gen_range(0..k));
        }
        for parent in parents {
            let weight = rng.gen_range(0..=32) as f64 * 0.25 - 2.0;
            graph.add_loss(
                VertexId::new(parent as u32),
                target,
                weight,
                format!("L{parent}_{k}"),
            )?;
        }
    }

    debug!(
        component = "tools",
        operation = "synthetic_graph",
        status = "success",
        seed = config.seed,
        vertices = graph.num_vertices(),
        losses = graph.num_losses(),
        "Generated synthetic graph"
    );
    Ok(graph)
}
