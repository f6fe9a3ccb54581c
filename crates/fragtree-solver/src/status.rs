//! Solve outcome taxonomy.

/// Outcome of a backend solve, mapped from engine-specific codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    /// An optimal tree was found.
    ComputationCorrect,
    /// No tree satisfies the constraints (including the minimal score).
    Infeasible,
    /// The backend exceeded its time limit.
    Timeout,
    /// The backend gave up for a resource or iteration reason.
    Abandoned,
    /// The backend reported none of the above.
    NoSolution,
}

impl SolveStatus {
    /// Check if the status carries an optimal solution.
    pub fn is_correct(self) -> bool {
        matches!(self, SolveStatus::ComputationCorrect)
    }

    /// Check if a caller may retry with a relaxed graph.
    pub fn is_retriable(self) -> bool {
        matches!(self, SolveStatus::Timeout | SolveStatus::Abandoned)
    }

    /// Get a stable string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::ComputationCorrect => "computation_correct",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Timeout => "timeout",
            SolveStatus::Abandoned => "abandoned",
            SolveStatus::NoSolution => "no_solution",
        }
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
