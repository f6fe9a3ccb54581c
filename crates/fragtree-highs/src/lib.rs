//! HiGHS backend for colorful subtree computation.
//!
//! [`HighsFactory`] plugs the HiGHS MIP solver into the `fragtree-ilp`
//! `TreeSolver`. Engine statuses are mapped onto
//! [`SolveStatus`](fragtree_solver::SolveStatus) here and no HiGHS type
//! leaves the crate through the backend contract.

mod backend;
pub mod model;
mod status;

pub use backend::{HighsBackend, HighsFactory};
pub use model::{HighsProgram, HighsProgramError, HighsSettings, HighsStatus};
