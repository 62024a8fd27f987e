//! Solver-service contract for curtailment studies.
//!
//! This crate defines what a formulation hands to a solver backend and what
//! comes back, independent of any particular backend.
//!
//! # Contract
//!
//! ```text
//! LinearProgram ──solve──> SolutionVector | SolverError
//! ```
//!
//! A [`LinearProgram`] is a frozen list of variables (bounds plus a type tag),
//! a linear objective to minimise, and constraint rows written as
//! `lower <= expression <= upper`. The solver returns values in variable
//! order, or a [`SolverError`] that distinguishes infeasible, unbounded and
//! not-converged outcomes.
//!
//! # Backends
//!
//! | Solver | Problem Type | Notes |
//! |--------|--------------|-------|
//! | microlp | LP/MIP | Pure Rust branch and bound (default) |
//! | Clarabel | LP | Pure Rust interior point; continuous variables only |
//! | HiGHS  | LP/MIP | Native, behind the `solver-highs` feature |

pub mod error;
pub mod problem;
pub mod solution;

pub use error::{SolverError, SolverResult};
pub use problem::{ConstraintRow, LinearExpr, LinearProgram, ProblemType, VarType, VariableDef};
pub use solution::{SolutionStatus, SolutionVector};
