//! Data model for fragmentation tree computation.
//!
//! - [`FragmentGraph`]: rooted DAG of candidate fragments (vertices, grouped
//!   into colors) and losses (weighted edges)
//! - [`FragmentationTree`]: the colorful subtree selected from a graph
//! - [`VertexId`], [`LossId`]: dense typed indices

pub mod error;
pub mod graph;
pub mod ids;
pub mod tree;

pub use error::GraphError;
pub use graph::{Fragment, FragmentGraph, Loss};
pub use ids::{LossId, VertexId};
pub use tree::{FragmentationTree, TreeNode};
