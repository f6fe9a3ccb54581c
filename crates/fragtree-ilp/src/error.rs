//! Error types for tree computation.

use fragtree_graph::GraphError;
use fragtree_solver::{BackendError, SolveStatus};

/// Inconsistencies between a backend result and the graph it was solved on.
///
/// These indicate a modelling or backend defect, never a property of the
/// input data.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationError {
    /// The recomputed tree weight differs from the reported objective.
    ScoreMismatch { expected: f64, actual: f64, gap: f64 },
    /// A tree edge has no matching loss in the graph.
    MissingLoss { parent: String, child: String },
    /// Two selected fragments share a color.
    ColorConflict { color: u32 },
    /// No loss leaves the root.
    EmptyTree,
    /// The assignment does not cover every column.
    AssignmentLength { expected: usize, got: usize },
}

impl VerificationError {
    pub fn code(&self) -> &'static str {
        match self {
            VerificationError::ScoreMismatch { .. } => "VERIFY_SCORE_MISMATCH",
            VerificationError::MissingLoss { .. } => "VERIFY_MISSING_LOSS",
            VerificationError::ColorConflict { .. } => "VERIFY_COLOR_CONFLICT",
            VerificationError::EmptyTree => "VERIFY_EMPTY_TREE",
            VerificationError::AssignmentLength { .. } => "VERIFY_ASSIGNMENT_LENGTH",
        }
    }
}

impl std::fmt::Display for VerificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationError::ScoreMismatch {
                expected,
                actual,
                gap,
            } => write!(
                f,
                "[{}] Backend reported score {} but the tree weighs {} (gap {:e})",
                self.code(),
                expected,
                actual,
                gap
            ),
            VerificationError::MissingLoss { parent, child } => write!(
                f,
                "[{}] No loss from '{}' to '{}' in the graph",
                self.code(),
                parent,
                child
            ),
            VerificationError::ColorConflict { color } => write!(
                f,
                "[{}] Color {} is used more than once",
                self.code(),
                color
            ),
            VerificationError::EmptyTree => {
                write!(f, "[{}] No loss leaves the root", self.code())
            }
            VerificationError::AssignmentLength { expected, got } => write!(
                f,
                "[{}] Assignment has {} values, expected {}",
                self.code(),
                got,
                expected
            ),
        }
    }
}

impl std::error::Error for VerificationError {}

/// Error returned by [`TreeSolver::compute`](crate::TreeSolver::compute).
#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    /// The graph cannot be solved as given.
    InvalidGraph(GraphError),
    /// The backend finished without an optimal tree.
    Aborted { status: SolveStatus },
    /// The backend failed while building or solving the model.
    Backend(BackendError),
    /// The backend result is inconsistent with the graph.
    Verification(VerificationError),
}

impl TreeError {
    pub fn code(&self) -> &'static str {
        match self {
            TreeError::InvalidGraph(err) => err.code(),
            TreeError::Aborted { status } => match status {
                SolveStatus::Infeasible => "TREE_INFEASIBLE",
                SolveStatus::Timeout => "TREE_TIMEOUT",
                SolveStatus::Abandoned => "TREE_ABANDONED",
                SolveStatus::NoSolution | SolveStatus::ComputationCorrect => "TREE_NO_SOLUTION",
            },
            TreeError::Backend(err) => err.code(),
            TreeError::Verification(err) => err.code(),
        }
    }

    /// Abort status, if the backend finished without an optimal tree.
    pub fn status(&self) -> Option<SolveStatus> {
        match self {
            TreeError::Aborted { status } => Some(*status),
            _ => None,
        }
    }

    /// The solve hit its time limit.
    pub fn is_timeout(&self) -> bool {
        self.status() == Some(SolveStatus::Timeout)
    }

    /// A relaxed retry may succeed: the backend timed out or gave up.
    pub fn is_retriable(&self) -> bool {
        self.status().is_some_and(SolveStatus::is_retriable)
    }

    /// The result contradicts the model; points at a bug rather than the input.
    pub fn is_defect(&self) -> bool {
        matches!(self, TreeError::Verification(_))
    }
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::InvalidGraph(err) => write!(f, "{}", err),
            TreeError::Aborted { status } => {
                write!(f, "[{}] Solve aborted with status {}", self.code(), status)
            }
            TreeError::Backend(err) => write!(f, "{}", err),
            TreeError::Verification(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TreeError::InvalidGraph(err) => Some(err),
            TreeError::Backend(err) => Some(err),
            TreeError::Verification(err) => Some(err),
            TreeError::Aborted { .. } => None,
        }
    }
}

impl From<GraphError> for TreeError {
    fn from(err: GraphError) -> Self {
        TreeError::InvalidGraph(err)
    }
}

impl From<BackendError> for TreeError {
    fn from(err: BackendError) -> Self {
        TreeError::Backend(err)
    }
}

impl From<VerificationError> for TreeError {
    fn from(err: VerificationError) -> Self {
        TreeError::Verification(err)
    }
}
