//! Maximum colorful subtree computation as a 0/1 integer program.
//!
//! Every loss of a [`FragmentGraph`](fragtree_graph::FragmentGraph) becomes a
//! binary column weighted by the loss weight. Rows keep the selection a tree
//! hanging off the pseudo-root that uses each color at most once. The model is
//! solved by any [`MipBackend`](fragtree_solver::MipBackend); the result is
//! rebuilt into a [`FragmentationTree`](fragtree_graph::FragmentationTree) and
//! checked against the graph before it is returned.
//!
//! ```no_run
//! use fragtree_ilp::TreeSolver;
//! use fragtree_solver::{BackendFactory, TreeOptions};
//! use fragtree_graph::FragmentGraph;
//! use std::sync::Arc;
//!
//! fn best_tree(factory: Arc<dyn BackendFactory>, graph: &FragmentGraph) {
//!     let solver = TreeSolver::new(factory);
//!     match solver.compute(graph, &TreeOptions::new().with_time_limit(60.0)) {
//!         Ok(computed) => println!("score {}", computed.score),
//!         Err(err) if err.is_retriable() => println!("retry with fewer peaks"),
//!         Err(err) => println!("{err}"),
//!     }
//! }
//! ```

pub mod constraints;
mod error;
pub mod offsets;
pub mod reconstruct;
mod session;
mod solver;
pub mod verify;
pub mod warm_start;

#[cfg(test)]
mod tests;

pub use constraints::{ConstraintRows, build_rows};
pub use error::{TreeError, VerificationError};
pub use offsets::EdgeIndex;
pub use reconstruct::build_tree;
pub use solver::{ComputedTree, SolveStatistics, TreeSolver};
pub use verify::{GAP_WARNING, SCORE_TOLERANCE, VerifiedScore, verify_tree};
pub use warm_start::{WarmStart, start_columns};
