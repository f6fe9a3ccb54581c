//! Solver-agnostic linear rows.

/// Lower and upper bound of a column or row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// `[lower, +inf)`
    pub fn at_least(lower: f64) -> Self {
        Self::new(lower, f64::INFINITY)
    }

    /// `(-inf, upper]`
    pub fn at_most(upper: f64) -> Self {
        Self::new(f64::NEG_INFINITY, upper)
    }

    /// Bounds of a binary indicator column.
    pub fn binary() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Check whether a value lies within the bounds, up to `tolerance`.
    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.lower - tolerance && value <= self.upper + tolerance
    }
}

/// Constraint family a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintFamily {
    /// `incoming(v) - out_edge >= 0` for each outgoing edge of a non-root vertex.
    Tree,
    /// `incoming(v) <= 1` for each non-root vertex.
    TreeParent,
    /// At most one selected edge into each color.
    Color,
    /// At least one edge leaves the root.
    MinimalTreeSize,
    /// Total weight reaches the configured minimal score.
    MinimalScore,
}

impl ConstraintFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintFamily::Tree => "tree",
            ConstraintFamily::TreeParent => "tree_parent",
            ConstraintFamily::Color => "color",
            ConstraintFamily::MinimalTreeSize => "minimal_tree_size",
            ConstraintFamily::MinimalScore => "minimal_score",
        }
    }
}

/// A sparse linear row `lower <= sum(coefficients[i] * x[columns[i]]) <= upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRow {
    pub family: ConstraintFamily,
    pub columns: Vec<usize>,
    pub coefficients: Vec<f64>,
    pub bounds: Bounds,
}

impl LinearRow {
    /// Row with all coefficients equal to one.
    pub fn unit(family: ConstraintFamily, columns: Vec<usize>, bounds: Bounds) -> Self {
        let coefficients = vec![1.0; columns.len()];
        Self {
            family,
            columns,
            coefficients,
            bounds,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Evaluate the row activity for a 0/1 assignment indexed by column.
    pub fn activity(&self, assignment: &[bool]) -> f64 {
        self.columns
            .iter()
            .zip(&self.coefficients)
            .filter(|(column, _)| assignment.get(**column).copied().unwrap_or(false))
            .map(|(_, coeff)| *coeff)
            .sum()
    }

    /// Check whether a 0/1 assignment satisfies this row.
    pub fn is_satisfied(&self, assignment: &[bool], tolerance: f64) -> bool {
        self.bounds.contains(self.activity(assignment), tolerance)
    }
}

/// Objective sense for optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}
