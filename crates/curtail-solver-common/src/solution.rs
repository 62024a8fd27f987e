//! Solution representation returned from solver backends.

use serde::{Deserialize, Serialize};

/// Status of the solver solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Solver timed out.
    Timeout,
    /// Numerical difficulties.
    NumericalError,
    /// Generic error occurred.
    Error,
}

impl SolutionStatus {
    /// Check if this status represents a successful solve.
    pub fn is_success(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Infeasible => write!(f, "infeasible"),
            SolutionStatus::Unbounded => write!(f, "unbounded"),
            SolutionStatus::Timeout => write!(f, "timeout"),
            SolutionStatus::NumericalError => write!(f, "numerical_error"),
            SolutionStatus::Error => write!(f, "error"),
        }
    }
}

/// Optimal assignment in variable order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionVector {
    pub status: SolutionStatus,
    pub objective: f64,
    pub values: Vec<f64>,
    /// Solve time in milliseconds.
    pub solve_time_ms: u64,
}

impl SolutionVector {
    pub fn optimal(values: Vec<f64>, objective: f64, solve_time_ms: u64) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            objective,
            values,
            solve_time_ms,
        }
    }

    /// Check if solution is optimal.
    pub fn is_optimal(&self) -> bool {
        self.status.is_success()
    }
}
