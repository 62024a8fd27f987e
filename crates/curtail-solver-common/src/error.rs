//! Error types for solver invocations.

use thiserror::Error;

use crate::problem::{ProblemType, VarType};

/// Errors that can occur during solver operations.
///
/// None of these are retried: an unmodified infeasible problem stays
/// infeasible.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Unknown or not compiled-in backend.
    #[error("Unknown solver '{name}'; supported values: {supported}")]
    UnknownSolver { name: String, supported: String },

    /// Backend cannot handle a declared variable type.
    #[error("Solver {solver} does not support {var_type} variables ({problem_type} problem); use a MIP-capable backend or relax the curtailment status")]
    UnsupportedVariableType {
        solver: String,
        var_type: VarType,
        problem_type: ProblemType,
    },

    /// No assignment satisfies every constraint.
    #[error("Problem is infeasible: {0}")]
    Infeasible(String),

    /// The objective can decrease without bound.
    #[error("Problem is unbounded")]
    Unbounded,

    /// The requested time limit cannot be represented.
    #[error("Invalid solver time limit: {seconds} seconds")]
    InvalidTimeLimit { seconds: f64 },

    /// Timeout while waiting for solver.
    #[error("Solver did not converge within {seconds:.1} seconds")]
    Timeout { seconds: f64 },

    /// Solver stopped without an optimal point for another reason.
    #[error("Solver did not converge: {0}")]
    NotConverged(String),

    /// The solver worker thread died.
    #[error("Solver worker failed: {0}")]
    WorkerFailed(String),
}

impl SolverError {
    /// Status reported alongside this failure.
    pub fn status(&self) -> crate::SolutionStatus {
        use crate::SolutionStatus;
        match self {
            SolverError::Infeasible(_) => SolutionStatus::Infeasible,
            SolverError::Unbounded => SolutionStatus::Unbounded,
            SolverError::Timeout { .. } => SolutionStatus::Timeout,
            SolverError::NotConverged(_) => SolutionStatus::NumericalError,
            SolverError::UnknownSolver { .. }
            | SolverError::InvalidTimeLimit { .. }
            | SolverError::UnsupportedVariableType { .. }
            | SolverError::WorkerFailed(_) => SolutionStatus::Error,
        }
    }
}

/// Result type alias for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;
