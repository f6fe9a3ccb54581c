//! Status conversions at the HiGHS boundary.

use crate::model::HighsStatus;
use fragtree_solver::SolveStatus;

impl HighsStatus {
    /// Name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            HighsStatus::Optimal => "optimal",
            HighsStatus::Infeasible => "infeasible",
            HighsStatus::Unbounded => "unbounded",
            HighsStatus::UnboundedOrInfeasible => "unbounded_or_infeasible",
            HighsStatus::ReachedTimeLimit => "time_limit",
            HighsStatus::ReachedIterationLimit => "iteration_limit",
            HighsStatus::Unknown => "unknown",
        }
    }
}

impl From<HighsStatus> for SolveStatus {
    fn from(status: HighsStatus) -> Self {
        match status {
            HighsStatus::Optimal => SolveStatus::ComputationCorrect,
            HighsStatus::Infeasible | HighsStatus::UnboundedOrInfeasible => SolveStatus::Infeasible,
            HighsStatus::ReachedTimeLimit => SolveStatus::Timeout,
            HighsStatus::ReachedIterationLimit => SolveStatus::Abandoned,
            // a maximisation over binaries cannot be unbounded
            HighsStatus::Unbounded | HighsStatus::Unknown => SolveStatus::NoSolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_highs_status_lands_in_the_taxonomy() {
        let cases = [
            (HighsStatus::Optimal, SolveStatus::ComputationCorrect),
            (HighsStatus::Infeasible, SolveStatus::Infeasible),
            (HighsStatus::UnboundedOrInfeasible, SolveStatus::Infeasible),
            (HighsStatus::ReachedTimeLimit, SolveStatus::Timeout),
            (HighsStatus::ReachedIterationLimit, SolveStatus::Abandoned),
            (HighsStatus::Unbounded, SolveStatus::NoSolution),
            (HighsStatus::Unknown, SolveStatus::NoSolution),
        ];
        for (highs, expected) in cases {
            assert_eq!(SolveStatus::from(highs), expected, "{}", highs.as_str());
        }
    }

    #[test]
    fn test_only_limits_are_retriable() {
        assert!(SolveStatus::from(HighsStatus::ReachedTimeLimit).is_retriable());
        assert!(SolveStatus::from(HighsStatus::ReachedIterationLimit).is_retriable());
        assert!(!SolveStatus::from(HighsStatus::Infeasible).is_retriable());
    }
}
