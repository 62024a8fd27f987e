//! # curtail-algo: Curtailment scheduling for congested radial feeders
//!
//! Given a validated [`NetworkModel`](curtail_core::NetworkModel), this crate
//! decides which loads to hold at their guaranteed level so that voltages and
//! branch flows stay within limits, with as few curtailments as possible.
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Formulate | [`ProblemBuilder`] | [`Formulation`] (MILP or LP relaxation) |
//! | Solve | [`solve()`] | [`Solution`] keyed by [`VarKey`] |
//! | Recover | [`recover()`] | [`PhasorSnapshot`] per time step |
//! | Query | [`SolutionView`] | values by document id |
//!
//! [`CongestionStudy`] chains the stages after validation.
//!
//! ## Solver backends
//!
//! `microlp` is always available and handles binary variables. `clarabel`
//! (default feature `solver-clarabel`) solves the continuous relaxation only.
//! `highs` needs the `solver-highs` feature and a C++ toolchain.
//!
//! ## Example
//!
//! ```ignore
//! use curtail_algo::CongestionStudy;
//! use curtail_core::{NetworkDocument, StudyConfig};
//!
//! let doc = NetworkDocument::from_path("feeder.json")?;
//! let outcome = CongestionStudy::new(StudyConfig::default())?.run(&doc)?;
//! println!("curtailments: {}", outcome.solution.objective);
//! ```

pub mod error;
pub mod formulation;
pub mod pipeline;
pub mod query;
pub mod recovery;
pub mod solve;

pub use error::{FormulationError, PipelineError, RecoveryError};
pub use formulation::{
    Formulation, FormulationOptions, FormulationSummary, PhaseRotation, Power, ProblemBuilder,
    RowFamily, VarKey,
};
pub use pipeline::{CongestionStudy, StageTimes, StudyOutcome};
pub use query::{CurtailmentEvent, PhaseSelector, Quantity, SolutionView};
pub use recovery::{recover, PhasorSnapshot, RecoveryOptions};
pub use solve::{solve, MilpSolverKind, Solution, SolverOptions};
