//! Backend error types.

/// Errors raised by a [`MipBackend`](crate::MipBackend).
///
/// Engine-specific failures are carried as [`BackendError::Native`] so that no
/// engine type escapes the backend boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// A row referenced a column that was never added.
    ColumnIndexOutOfBounds { column: usize, num_columns: usize },
    /// Parallel arrays had different lengths.
    LengthMismatch { expected: usize, got: usize },
    /// A solution accessor was called before `solve`.
    SolveRequired { operation: &'static str },
    /// The backend was used after `dispose`.
    AlreadyDisposed,
    /// Engine-specific failure.
    Native(String),
}

impl BackendError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::ColumnIndexOutOfBounds { .. } => "BACKEND_COLUMN_OUT_OF_BOUNDS",
            BackendError::LengthMismatch { .. } => "BACKEND_LENGTH_MISMATCH",
            BackendError::SolveRequired { .. } => "BACKEND_SOLVE_REQUIRED",
            BackendError::AlreadyDisposed => "BACKEND_DISPOSED",
            BackendError::Native(_) => "BACKEND_NATIVE",
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::ColumnIndexOutOfBounds {
                column,
                num_columns,
            } => write!(
                f,
                "[{}] Column index {} out of bounds (num_columns = {})",
                self.code(),
                column,
                num_columns
            ),
            BackendError::LengthMismatch { expected, got } => write!(
                f,
                "[{}] Length mismatch (expected {}, got {})",
                self.code(),
                expected,
                got
            ),
            BackendError::SolveRequired { operation } => {
                write!(f, "[{}] solve must be called before {}", self.code(), operation)
            }
            BackendError::AlreadyDisposed => {
                write!(f, "[{}] Backend was already disposed", self.code())
            }
            BackendError::Native(msg) => write!(f, "[{}] Backend error: {}", self.code(), msg),
        }
    }
}

impl std::error::Error for BackendError {}
