//! Per-solve configuration.

use fragtree_graph::FragmentationTree;
use std::sync::Arc;

/// Options for a single tree computation.
///
/// Passed by reference into every solve; never stored as global state.
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    /// Time limit in seconds. `None`, zero or negative means no limit.
    pub time_limit: Option<f64>,
    /// Number of threads the backend may use. `None` uses backend default.
    pub threads: Option<u32>,
    /// Minimal acceptable tree score. `None` or non-finite means no bound.
    pub minimal_score: Option<f64>,
    /// Previously computed tree used to seed the backend.
    pub template: Option<Arc<FragmentationTree>>,
    /// Log backend output to console. `None` uses backend default.
    pub log_to_console: Option<bool>,
}

impl TreeOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Set the number of threads.
    pub fn with_threads(mut self, count: u32) -> Self {
        self.threads = Some(count);
        self
    }

    /// Set the minimal acceptable tree score.
    pub fn with_minimal_score(mut self, score: f64) -> Self {
        self.minimal_score = Some(score);
        self
    }

    /// Seed the solve with a previously computed tree.
    pub fn with_template(mut self, tree: impl Into<Arc<FragmentationTree>>) -> Self {
        self.template = Some(tree.into());
        self
    }

    /// Enable or disable console logging of the backend.
    pub fn with_log_to_console(mut self, enabled: bool) -> Self {
        self.log_to_console = Some(enabled);
        self
    }

    /// Time limit to forward to a backend, if any.
    pub fn effective_time_limit(&self) -> Option<f64> {
        self.time_limit
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
    }

    /// Thread count to forward to a backend, if any.
    pub fn effective_threads(&self) -> Option<u32> {
        self.threads.filter(|count| *count > 0)
    }

    /// Minimal score to encode as a constraint, if any.
    pub fn effective_minimal_score(&self) -> Option<f64> {
        self.minimal_score.filter(|score| score.is_finite())
    }

    /// Check if these options are completely empty (all defaults).
    pub fn is_empty(&self) -> bool {
        self.time_limit.is_none()
            && self.threads.is_none()
            && self.minimal_score.is_none()
            && self.template.is_none()
            && self.log_to_console.is_none()
    }
}
