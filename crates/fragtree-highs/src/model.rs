//! A 0/1 program staged for a single HiGHS run.
//!
//! Columns and rows are collected into a `highs::RowProblem`; `solve` hands
//! the problem to HiGHS together with the settings and start vector, and
//! keeps the solved model for reading. A program is solved at most once.

use fragtree_solver::{Bounds, LinearRow, ObjectiveSense};
use highs::{Col, HighsModelStatus, RowProblem, Sense, SolvedModel};
use std::fmt;
use tracing::{debug, trace, warn};

/// Model status reported by HiGHS after a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighsStatus {
    Optimal,
    Infeasible,
    Unbounded,
    UnboundedOrInfeasible,
    ReachedTimeLimit,
    ReachedIterationLimit,
    /// Load, presolve or solve error, or a status without a mapping.
    Unknown,
}

impl From<HighsModelStatus> for HighsStatus {
    fn from(status: HighsModelStatus) -> Self {
        match status {
            HighsModelStatus::Optimal => HighsStatus::Optimal,
            HighsModelStatus::Infeasible => HighsStatus::Infeasible,
            HighsModelStatus::Unbounded => HighsStatus::Unbounded,
            HighsModelStatus::UnboundedOrInfeasible => HighsStatus::UnboundedOrInfeasible,
            HighsModelStatus::ReachedTimeLimit => HighsStatus::ReachedTimeLimit,
            HighsModelStatus::ReachedIterationLimit => HighsStatus::ReachedIterationLimit,
            _ => HighsStatus::Unknown,
        }
    }
}

/// Engine settings applied when the program is solved.
#[derive(Debug, Clone, PartialEq)]
pub struct HighsSettings {
    pub time_limit: Option<f64>,
    /// Must be identical for every solve in a process; HiGHS sizes its
    /// scheduler once.
    pub threads: Option<i32>,
    pub mip_rel_gap: f64,
    pub log_to_console: bool,
}

impl Default for HighsSettings {
    fn default() -> Self {
        Self {
            time_limit: None,
            threads: None,
            mip_rel_gap: 0.0,
            log_to_console: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HighsProgramError {
    UnknownColumn { column: usize, num_columns: usize },
    NotSolved { operation: &'static str },
    AlreadySolved { operation: &'static str },
}

impl HighsProgramError {
    pub fn code(&self) -> &'static str {
        match self {
            HighsProgramError::UnknownColumn { .. } => "HIGHS_UNKNOWN_COLUMN",
            HighsProgramError::NotSolved { .. } => "HIGHS_NOT_SOLVED",
            HighsProgramError::AlreadySolved { .. } => "HIGHS_ALREADY_SOLVED",
        }
    }
}

impl fmt::Display for HighsProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighsProgramError::UnknownColumn {
                column,
                num_columns,
            } => write!(
                f,
                "[{}] column {column} does not exist ({num_columns} columns)",
                self.code()
            ),
            HighsProgramError::NotSolved { operation } => {
                write!(f, "[{}] {operation} needs a solved program", self.code())
            }
            HighsProgramError::AlreadySolved { operation } => write!(
                f,
                "[{}] {operation} is not possible after the program was solved",
                self.code()
            ),
        }
    }
}

impl std::error::Error for HighsProgramError {}

enum Stage {
    Building(RowProblem),
    Solved(SolvedModel),
    Released,
}

/// Binary columns, sparse rows and an optional start vector for HiGHS.
pub struct HighsProgram {
    stage: Stage,
    columns: Vec<Col>,
    num_rows: usize,
    sense: ObjectiveSense,
    start: Option<Vec<f64>>,
    settings: HighsSettings,
}

impl HighsProgram {
    pub fn new(settings: HighsSettings) -> Self {
        Self {
            stage: Stage::Building(RowProblem::default()),
            columns: Vec::new(),
            num_rows: 0,
            sense: ObjectiveSense::Maximize,
            start: None,
            settings,
        }
    }

    pub fn settings(&self) -> &HighsSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut HighsSettings {
        &mut self.settings
    }

    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn is_solved(&self) -> bool {
        matches!(self.stage, Stage::Solved(_))
    }

    fn problem_mut(&mut self, operation: &'static str) -> Result<&mut RowProblem, HighsProgramError> {
        match &mut self.stage {
            Stage::Building(problem) => Ok(problem),
            _ => Err(HighsProgramError::AlreadySolved { operation }),
        }
    }

    fn solved(&self, operation: &'static str) -> Result<&SolvedModel, HighsProgramError> {
        match &self.stage {
            Stage::Solved(model) => Ok(model),
            _ => Err(HighsProgramError::NotSolved { operation }),
        }
    }

    /// Add an integer column within `bounds`. Returns its index.
    pub fn add_column(&mut self, bounds: Bounds, objective: f64) -> Result<usize, HighsProgramError> {
        let problem = self.problem_mut("add_column")?;
        let col = problem.add_integer_column(objective, bounds.lower..=bounds.upper);
        self.columns.push(col);
        Ok(self.columns.len() - 1)
    }

    /// Add `row` over previously added columns. Returns its index.
    pub fn add_row(&mut self, row: &LinearRow) -> Result<usize, HighsProgramError> {
        let num_columns = self.columns.len();
        let factors = row
            .columns
            .iter()
            .zip(&row.coefficients)
            .map(|(&column, &coefficient)| {
                self.columns
                    .get(column)
                    .map(|col| (*col, coefficient))
                    .ok_or(HighsProgramError::UnknownColumn {
                        column,
                        num_columns,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        trace!(
            component = "highs",
            operation = "add_row",
            status = "success",
            family = row.family.as_str(),
            nnz = factors.len(),
            "Adding row"
        );
        self.problem_mut("add_row")?
            .add_row(row.bounds.lower..=row.bounds.upper, factors);
        self.num_rows += 1;
        Ok(self.num_rows - 1)
    }

    /// Start HiGHS from the 0/1 vector with exactly `selected` set.
    pub fn set_start(&mut self, selected: &[usize]) -> Result<(), HighsProgramError> {
        self.problem_mut("set_start")?;
        let num_columns = self.columns.len();
        let mut values = vec![0.0; num_columns];
        for &column in selected {
            *values
                .get_mut(column)
                .ok_or(HighsProgramError::UnknownColumn {
                    column,
                    num_columns,
                })? = 1.0;
        }
        self.start = Some(values);
        Ok(())
    }

    /// Run HiGHS on the staged problem.
    pub fn solve(&mut self) -> Result<HighsStatus, HighsProgramError> {
        let stage = std::mem::replace(&mut self.stage, Stage::Released);
        let problem = match stage {
            Stage::Building(problem) => problem,
            other => {
                self.stage = other;
                return Err(HighsProgramError::AlreadySolved { operation: "solve" });
            }
        };

        debug!(
            component = "highs",
            operation = "solve",
            status = "start",
            columns = self.columns.len(),
            rows = self.num_rows,
            warm = self.start.is_some(),
            "Solving program"
        );

        let sense = match self.sense {
            ObjectiveSense::Minimize => Sense::Minimise,
            ObjectiveSense::Maximize => Sense::Maximise,
        };
        let mut model = problem.optimise(sense);
        if self.settings.log_to_console {
            model.set_option("output_flag", true);
            model.set_option("log_to_console", true);
        } else {
            model.make_quiet();
        }
        model.set_option("mip_rel_gap", self.settings.mip_rel_gap);
        if let Some(seconds) = self.settings.time_limit {
            model.set_option("time_limit", seconds);
        }
        if let Some(threads) = self.settings.threads {
            model.set_option("threads", threads);
        }
        if let Some(start) = self.start.take() {
            if let Err(err) = model.try_set_solution(Some(&start), None, None, None) {
                warn!(
                    component = "highs",
                    operation = "set_start",
                    status = "warn",
                    ?err,
                    "HiGHS rejected the start vector; solving cold"
                );
            }
        }

        let solved = model.solve();
        let status = HighsStatus::from(solved.status());
        self.stage = Stage::Solved(solved);
        Ok(status)
    }

    pub fn objective_value(&self) -> Result<f64, HighsProgramError> {
        Ok(self.solved("objective_value")?.objective_value())
    }

    /// Primal column values of the solve.
    pub fn column_values(&self) -> Result<Vec<f64>, HighsProgramError> {
        Ok(self
            .solved("column_values")?
            .get_solution()
            .columns()
            .to_vec())
    }

    /// Free the HiGHS model and staged data.
    pub fn release(&mut self) {
        self.stage = Stage::Released;
        self.columns.clear();
        self.start = None;
    }
}

impl fmt::Debug for HighsProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            Stage::Building(_) => "building",
            Stage::Solved(_) => "solved",
            Stage::Released => "released",
        };
        f.debug_struct("HighsProgram")
            .field("stage", &stage)
            .field("num_columns", &self.columns.len())
            .field("num_rows", &self.num_rows)
            .field("sense", &self.sense)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
