//! [`MipBackend`] over HiGHS.

use crate::model::{HighsProgram, HighsProgramError, HighsSettings};
use fragtree_graph::FragmentGraph;
use fragtree_solver::{
    BackendError, BackendFactory, Bounds, LinearRow, MipBackend, ObjectiveSense, SolveStatus,
    TreeOptions,
};
use tracing::debug;

/// Columns above this value count as selected.
const SELECTION_THRESHOLD: f64 = 0.5;

impl From<HighsProgramError> for BackendError {
    fn from(err: HighsProgramError) -> Self {
        match err {
            HighsProgramError::UnknownColumn {
                column,
                num_columns,
            } => BackendError::ColumnIndexOutOfBounds {
                column,
                num_columns,
            },
            HighsProgramError::NotSolved { operation } => BackendError::SolveRequired { operation },
            HighsProgramError::AlreadySolved { .. } => BackendError::Native(err.to_string()),
        }
    }
}

/// One HiGHS program scoped to a single solve.
#[derive(Debug)]
pub struct HighsBackend {
    program: Option<HighsProgram>,
    status: Option<SolveStatus>,
}

impl HighsBackend {
    pub fn new(program: HighsProgram) -> Self {
        Self {
            program: Some(program),
            status: None,
        }
    }

    fn program(&self) -> Result<&HighsProgram, BackendError> {
        self.program.as_ref().ok_or(BackendError::AlreadyDisposed)
    }

    fn program_mut(&mut self) -> Result<&mut HighsProgram, BackendError> {
        self.program.as_mut().ok_or(BackendError::AlreadyDisposed)
    }

    /// The program, if the last solve was optimal.
    fn optimum(&self, operation: &'static str) -> Result<&HighsProgram, BackendError> {
        let program = self.program()?;
        if self.status.is_some_and(SolveStatus::is_correct) {
            Ok(program)
        } else {
            Err(BackendError::SolveRequired { operation })
        }
    }
}

impl MipBackend for HighsBackend {
    fn set_time_limit(&mut self, seconds: f64) -> Result<(), BackendError> {
        self.program_mut()?.settings_mut().time_limit = Some(seconds);
        Ok(())
    }

    /// HiGHS sizes its global scheduler on the first solve of a process;
    /// later solves must request the same thread count.
    fn set_threads(&mut self, threads: u32) -> Result<(), BackendError> {
        self.program_mut()?.settings_mut().threads =
            Some(i32::try_from(threads).unwrap_or(i32::MAX));
        Ok(())
    }

    fn set_log_to_console(&mut self, enabled: bool) -> Result<(), BackendError> {
        self.program_mut()?.settings_mut().log_to_console = enabled;
        Ok(())
    }

    fn add_column(&mut self, bounds: Bounds, objective: f64) -> Result<usize, BackendError> {
        Ok(self.program_mut()?.add_column(bounds, objective)?)
    }

    fn add_row(&mut self, row: &LinearRow) -> Result<usize, BackendError> {
        Ok(self.program_mut()?.add_row(row)?)
    }

    fn set_objective_sense(&mut self, sense: ObjectiveSense) -> Result<(), BackendError> {
        self.program_mut()?.set_sense(sense);
        Ok(())
    }

    fn set_start_values(&mut self, selected: &[usize]) -> Result<(), BackendError> {
        Ok(self.program_mut()?.set_start(selected)?)
    }

    fn solve(&mut self) -> Result<SolveStatus, BackendError> {
        let raw = self.program_mut()?.solve()?;
        let status = SolveStatus::from(raw);
        debug!(
            component = "highs",
            operation = "solve",
            status = status.as_str(),
            highs_status = raw.as_str(),
            "HiGHS solve finished"
        );
        self.status = Some(status);
        Ok(status)
    }

    fn objective_value(&self) -> Result<f64, BackendError> {
        Ok(self.optimum("objective_value")?.objective_value()?)
    }

    fn variable_assignment(&self) -> Result<Vec<bool>, BackendError> {
        let values = self.optimum("variable_assignment")?.column_values()?;
        Ok(values
            .into_iter()
            .map(|value| value > SELECTION_THRESHOLD)
            .collect())
    }

    fn dispose(&mut self) -> Result<(), BackendError> {
        let mut program = self.program.take().ok_or(BackendError::AlreadyDisposed)?;
        program.release();
        Ok(())
    }
}

/// Creates [`HighsBackend`]s. HiGHS instances are independent, so solves may
/// run concurrently.
#[derive(Debug, Clone)]
pub struct HighsFactory {
    mip_rel_gap: f64,
}

impl HighsFactory {
    pub fn new() -> Self {
        Self { mip_rel_gap: 0.0 }
    }

    /// Relative MIP gap at which HiGHS reports optimality (default 0).
    pub fn with_mip_rel_gap(mut self, gap: f64) -> Self {
        self.mip_rel_gap = gap;
        self
    }
}

impl Default for HighsFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory for HighsFactory {
    fn create(
        &self,
        graph: &FragmentGraph,
        _options: &TreeOptions,
    ) -> Result<Box<dyn MipBackend>, BackendError> {
        let program = HighsProgram::new(HighsSettings {
            mip_rel_gap: self.mip_rel_gap,
            ..HighsSettings::default()
        });
        debug!(
            component = "highs",
            operation = "create",
            status = "success",
            losses = graph.num_losses(),
            mip_rel_gap = self.mip_rel_gap,
            "Created HiGHS backend"
        );
        Ok(Box::new(HighsBackend::new(program)))
    }

    fn is_thread_safe(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "HiGHS"
    }
}
