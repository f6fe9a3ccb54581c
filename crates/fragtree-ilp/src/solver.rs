//! Per-solve orchestration over a pluggable backend.
//!
//! A solve runs through explicit phase values: [`PreparedSolve`] holds the
//! edge index and model summary after the backend has been populated,
//! [`SolvedModel`] holds the optimum, and the final tree is reconstructed and
//! verified from there. Nothing survives the call except the result.

use crate::constraints::build_rows;
use crate::error::{TreeError, VerificationError};
use crate::offsets::EdgeIndex;
use crate::reconstruct::build_tree;
use crate::verify::{VerifiedScore, verify_tree};
use crate::warm_start::{WarmStart, start_columns};
use crate::session::BackendSession;
use fragtree_graph::{FragmentGraph, FragmentationTree};
use fragtree_solver::{
    BackendError, BackendFactory, Bounds, ConstraintFamily, MipBackend, ObjectiveSense,
    SolveStatus, TreeOptions,
};
use fragtree_tools::{MeasurementRecorder, StageMeasurement};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Size of the model handed to the backend and how the solve went.
#[derive(Debug, Clone, Default)]
pub struct SolveStatistics {
    /// Backend name as reported by its factory.
    pub backend: String,
    pub num_columns: usize,
    /// Rows per constraint family.
    pub rows: BTreeMap<ConstraintFamily, usize>,
    /// Warm-start mapping, when a template was given.
    pub warm_start: Option<WarmStart>,
    /// `reported - recomputed` score.
    pub score_gap: f64,
    /// Solved without a backend because the graph has a single loss.
    pub trivial: bool,
    pub stages: Vec<StageMeasurement>,
}

impl SolveStatistics {
    pub fn num_rows(&self) -> usize {
        self.rows.values().sum()
    }

    pub fn stage(&self, name: &str) -> Option<&StageMeasurement> {
        self.stages.iter().find(|stage| stage.stage == name)
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|stage| stage.duration).sum()
    }
}

/// A verified maximum colorful subtree.
#[derive(Debug, Clone)]
pub struct ComputedTree {
    pub tree: FragmentationTree,
    /// Objective value reported by the backend.
    pub score: f64,
    pub status: SolveStatus,
    pub statistics: SolveStatistics,
}

/// Model summary carried from preparation to the result.
#[derive(Debug, Default)]
struct ModelSummary {
    num_columns: usize,
    rows: BTreeMap<ConstraintFamily, usize>,
    warm_start: Option<WarmStart>,
}

/// Backend populated with columns, start values, rows and objective sense.
struct PreparedSolve<'g> {
    graph: &'g FragmentGraph,
    index: EdgeIndex,
    summary: ModelSummary,
}

/// Optimal backend result, not yet checked against the graph.
struct SolvedModel<'g> {
    graph: &'g FragmentGraph,
    index: EdgeIndex,
    summary: ModelSummary,
    score: f64,
    assignment: Vec<bool>,
}

impl<'g> PreparedSolve<'g> {
    fn prepare(
        graph: &'g FragmentGraph,
        options: &TreeOptions,
        backend: &mut dyn MipBackend,
    ) -> Result<Self, TreeError> {
        if let Some(threads) = options.effective_threads() {
            backend.set_threads(threads)?;
        }
        if let Some(seconds) = options.effective_time_limit() {
            backend.set_time_limit(seconds)?;
        }
        if let Some(enabled) = options.log_to_console {
            backend.set_log_to_console(enabled)?;
        }

        let index = EdgeIndex::compute(graph);

        for (expected, loss) in graph.losses().iter().enumerate() {
            let column = backend.add_column(Bounds::binary(), loss.weight)?;
            if column != expected {
                return Err(BackendError::LengthMismatch {
                    expected,
                    got: column,
                }
                .into());
            }
            trace!(
                component = "ilp",
                operation = "add_column",
                status = "success",
                column,
                weight = loss.weight,
                "Added loss column"
            );
        }

        let warm_start = match options.template.as_deref() {
            Some(template) => {
                let start = start_columns(graph, &index, template);
                if !start.is_empty() {
                    backend.set_start_values(&start.columns)?;
                }
                Some(start)
            }
            None => None,
        };

        let rows = build_rows(graph, &index, options.effective_minimal_score());
        for row in rows.rows() {
            backend.add_row(row)?;
        }
        backend.set_objective_sense(ObjectiveSense::Maximize)?;

        let summary = ModelSummary {
            num_columns: graph.num_losses(),
            rows: rows.family_counts(),
            warm_start,
        };
        debug!(
            component = "ilp",
            operation = "prepare",
            status = "success",
            columns = summary.num_columns,
            rows = rows.len(),
            tree_rows = summary.rows.get(&ConstraintFamily::Tree).copied().unwrap_or(0),
            color_rows = summary.rows.get(&ConstraintFamily::Color).copied().unwrap_or(0),
            "Prepared model"
        );

        Ok(Self {
            graph,
            index,
            summary,
        })
    }

    fn solve(self, backend: &mut dyn MipBackend) -> Result<SolvedModel<'g>, TreeError> {
        let status = backend.solve()?;
        if !status.is_correct() {
            warn!(
                component = "ilp",
                operation = "solve",
                status = status.as_str(),
                columns = self.summary.num_columns,
                "Backend finished without an optimal tree"
            );
            return Err(TreeError::Aborted { status });
        }

        let score = backend.objective_value()?;
        let assignment = backend.variable_assignment()?;
        debug!(
            component = "ilp",
            operation = "solve",
            status = status.as_str(),
            score,
            selected = assignment.iter().filter(|selected| **selected).count(),
            "Backend found optimal tree"
        );

        Ok(SolvedModel {
            graph: self.graph,
            index: self.index,
            summary: self.summary,
            score,
            assignment,
        })
    }
}

impl SolvedModel<'_> {
    fn reconstruct(&self) -> Result<FragmentationTree, VerificationError> {
        build_tree(self.graph, &self.index, &self.assignment)
    }

    fn verify(&self, tree: &FragmentationTree) -> Result<VerifiedScore, VerificationError> {
        verify_tree(self.graph, tree, self.score)
    }
}

/// Serializes solves of non-thread-safe factories that bring no lock of their own.
static SHARED_SOLVE_LOCK: Mutex<()> = Mutex::new(());

/// Computes maximum colorful subtrees with backends from one factory.
///
/// Backends of a factory that is not thread-safe are used one at a time
/// across every solver sharing that factory; thread-safe backends solve
/// concurrently.
pub struct TreeSolver {
    factory: Arc<dyn BackendFactory>,
    capture_memory: bool,
}

impl TreeSolver {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            factory,
            capture_memory: false,
        }
    }

    /// Record RSS before and after each stage in the statistics.
    pub fn with_memory_tracking(mut self, enabled: bool) -> Self {
        self.capture_memory = enabled;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.factory.name()
    }

    fn recorder(&self) -> MeasurementRecorder {
        if self.capture_memory {
            MeasurementRecorder::new()
        } else {
            MeasurementRecorder::durations_only()
        }
    }

    /// Compute the maximum colorful subtree of `graph`.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidGraph`] if the graph is empty or cyclic.
    /// - [`TreeError::Aborted`] if the backend finished without an optimal
    ///   tree; check [`TreeError::is_retriable`] before giving up.
    /// - [`TreeError::Backend`] if the backend failed.
    /// - [`TreeError::Verification`] if the result contradicts the graph.
    pub fn compute(
        &self,
        graph: &FragmentGraph,
        options: &TreeOptions,
    ) -> Result<ComputedTree, TreeError> {
        graph.validate()?;
        debug!(
            component = "ilp",
            operation = "compute",
            status = "start",
            backend = self.factory.name(),
            vertices = graph.num_vertices(),
            losses = graph.num_losses(),
            "Computing tree"
        );

        let result = if graph.num_losses() == 1 {
            self.compute_trivial(graph, options)
        } else {
            let _serial = (!self.factory.is_thread_safe()).then(|| {
                self.factory
                    .solve_lock()
                    .unwrap_or(&SHARED_SOLVE_LOCK)
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
            });
            self.compute_with_backend(graph, options)
        };

        match &result {
            Ok(computed) => debug!(
                component = "ilp",
                operation = "compute",
                status = "success",
                backend = self.factory.name(),
                score = computed.score,
                edges = computed.tree.num_edges(),
                duration_ms = computed.statistics.total_duration().as_secs_f64() * 1000.0,
                "Computed tree"
            ),
            Err(err) => debug!(
                component = "ilp",
                operation = "compute",
                status = "error",
                backend = self.factory.name(),
                code = err.code(),
                "Tree computation failed"
            ),
        }
        result
    }

    /// Compute trees for independent graphs in parallel.
    ///
    /// Results are returned in input order.
    pub fn compute_all(
        &self,
        jobs: &[(&FragmentGraph, TreeOptions)],
    ) -> Vec<Result<ComputedTree, TreeError>> {
        jobs.par_iter()
            .map(|(graph, options)| self.compute(graph, options))
            .collect()
    }

    /// A single root loss is optimal without a model.
    fn compute_trivial(
        &self,
        graph: &FragmentGraph,
        options: &TreeOptions,
    ) -> Result<ComputedTree, TreeError> {
        let mut recorder = self.recorder();
        let loss = &graph.losses()[0];
        let below_minimum = options
            .effective_minimal_score()
            .is_some_and(|minimum| loss.weight < minimum);
        if loss.source != graph.root() || below_minimum {
            return Err(TreeError::Aborted {
                status: SolveStatus::Infeasible,
            });
        }

        let stage = recorder.begin_stage("reconstruct");
        let index = EdgeIndex::compute(graph);
        let tree = build_tree(graph, &index, &[true])?;
        recorder.end_stage(stage);

        trace!(
            component = "ilp",
            operation = "compute",
            status = "trivial",
            weight = loss.weight,
            "Single loss graph solved without backend"
        );

        Ok(ComputedTree {
            tree,
            score: loss.weight,
            status: SolveStatus::ComputationCorrect,
            statistics: SolveStatistics {
                backend: self.factory.name().to_string(),
                num_columns: 1,
                trivial: true,
                stages: recorder.into_stages(),
                ..SolveStatistics::default()
            },
        })
    }

    fn compute_with_backend(
        &self,
        graph: &FragmentGraph,
        options: &TreeOptions,
    ) -> Result<ComputedTree, TreeError> {
        let mut recorder = self.recorder();

        let stage = recorder.begin_stage("prepare");
        let backend = self.factory.create(graph, options)?;
        let mut session = BackendSession::new(backend, self.factory.name());
        let prepared = PreparedSolve::prepare(graph, options, session.backend_mut())?;
        recorder.end_stage(stage);

        let stage = recorder.begin_stage("solve");
        let solved = prepared.solve(session.backend_mut())?;
        recorder.end_stage(stage);

        let stage = recorder.begin_stage("reconstruct");
        let tree = solved.reconstruct()?;
        recorder.end_stage(stage);

        let stage = recorder.begin_stage("verify");
        let verified = solved.verify(&tree)?;
        recorder.end_stage(stage);

        let SolvedModel { score, summary, .. } = solved;
        Ok(ComputedTree {
            tree,
            score,
            status: SolveStatus::ComputationCorrect,
            statistics: SolveStatistics {
                backend: self.factory.name().to_string(),
                num_columns: summary.num_columns,
                rows: summary.rows,
                warm_start: summary.warm_start,
                score_gap: verified.gap,
                trivial: false,
                stages: recorder.into_stages(),
            },
        })
    }
}
