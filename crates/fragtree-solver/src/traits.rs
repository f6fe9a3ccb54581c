//! Backend contract for MIP engines.

use crate::{BackendError, Bounds, LinearRow, ObjectiveSense, SolveStatus, TreeOptions};
use fragtree_graph::FragmentGraph;
use std::sync::Mutex;

/// A 0/1 integer linear programming engine, scoped to a single solve.
///
/// Columns are binary edge indicators added in loss order; rows are sparse
/// linear constraints. After [`solve`](MipBackend::solve) returns
/// [`SolveStatus::ComputationCorrect`] the accessors expose the optimum.
/// [`dispose`](MipBackend::dispose) releases any native resources and is
/// called exactly once per backend by the orchestrator.
pub trait MipBackend {
    /// Limit the wall-clock time of the next solve.
    fn set_time_limit(&mut self, seconds: f64) -> Result<(), BackendError>;

    /// Hint the number of threads the engine may use.
    fn set_threads(&mut self, threads: u32) -> Result<(), BackendError>;

    /// Enable or disable engine output on the console.
    fn set_log_to_console(&mut self, _enabled: bool) -> Result<(), BackendError> {
        Ok(())
    }

    /// Add an integer column with the given bounds and objective coefficient.
    ///
    /// Returns the index of the new column.
    fn add_column(&mut self, bounds: Bounds, objective: f64) -> Result<usize, BackendError>;

    /// Add a sparse row. Returns the index of the new row.
    fn add_row(&mut self, row: &LinearRow) -> Result<usize, BackendError>;

    fn set_objective_sense(&mut self, sense: ObjectiveSense) -> Result<(), BackendError>;

    /// Seed the search: listed columns start at 1, all others at 0.
    fn set_start_values(&mut self, selected: &[usize]) -> Result<(), BackendError>;

    fn solve(&mut self) -> Result<SolveStatus, BackendError>;

    /// Objective value of the last solve.
    fn objective_value(&self) -> Result<f64, BackendError>;

    /// Selected columns of the last solve, indexed by column.
    fn variable_assignment(&self) -> Result<Vec<bool>, BackendError>;

    /// Release native resources held by the engine.
    fn dispose(&mut self) -> Result<(), BackendError>;
}

/// Creates [`MipBackend`] instances; registered once and shared across solves.
pub trait BackendFactory: Send + Sync {
    /// Create a fresh backend for one solve of `graph`.
    fn create(
        &self,
        graph: &FragmentGraph,
        options: &TreeOptions,
    ) -> Result<Box<dyn MipBackend>, BackendError>;

    /// Whether independent backends may solve concurrently.
    fn is_thread_safe(&self) -> bool;

    /// Lock held around every solve of this factory's backends when they are
    /// not thread-safe. Factories without one share a process-wide lock.
    fn solve_lock(&self) -> Option<&Mutex<()>> {
        None
    }

    /// Human-readable engine name.
    fn name(&self) -> &str;
}
