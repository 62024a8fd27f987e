//! Solver adapter: hands a [`Formulation`] to a good_lp backend and maps the
//! answer back to [`VarKey`]s.
//!
//! The solve runs on a dedicated worker thread so that a wall-clock limit can
//! be enforced uniformly across backends. When the limit elapses the caller
//! gets [`SolverError::Timeout`]. HiGHS also receives the limit and stops on
//! its own; microlp and Clarabel have no cancellation hook, so their worker
//! runs to completion and its result is discarded.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use curtail_core::StudyConfig;
use curtail_solver_common::{
    ConstraintRow, LinearExpr, LinearProgram, SolutionStatus, SolutionVector, SolverError,
    SolverResult, VarType,
};
#[cfg(feature = "solver-clarabel")]
use good_lp::solvers::clarabel::clarabel as clarabel_solver;
#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as highs_solver;
#[cfg(feature = "solver-highs")]
use good_lp::solvers::WithTimeLimit;
use good_lp::solvers::microlp::microlp as microlp_solver;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, SolverModel, Variable,
};
use tracing::{info, warn};

use crate::formulation::{Formulation, VarKey};

/// Backends compiled into this build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MilpSolverKind {
    /// Pure-Rust simplex with branch and bound.
    #[default]
    Microlp,
    /// Pure-Rust interior point; continuous problems only.
    #[cfg(feature = "solver-clarabel")]
    Clarabel,
    #[cfg(feature = "solver-highs")]
    Highs,
}

const AVAILABLE_SOLVERS: &[&str] = &[
    "microlp",
    #[cfg(feature = "solver-clarabel")]
    "clarabel",
    #[cfg(feature = "solver-highs")]
    "highs",
];

impl MilpSolverKind {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_SOLVERS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MilpSolverKind::Microlp => "microlp",
            #[cfg(feature = "solver-clarabel")]
            MilpSolverKind::Clarabel => "clarabel",
            #[cfg(feature = "solver-highs")]
            MilpSolverKind::Highs => "highs",
        }
    }

    pub fn supports_binary(&self) -> bool {
        match self {
            MilpSolverKind::Microlp => true,
            #[cfg(feature = "solver-clarabel")]
            MilpSolverKind::Clarabel => false,
            #[cfg(feature = "solver-highs")]
            MilpSolverKind::Highs => true,
        }
    }
}

fn unknown_solver_error(label: &str) -> SolverError {
    SolverError::UnknownSolver {
        name: label.to_string(),
        supported: MilpSolverKind::available().join(", "),
    }
}

impl FromStr for MilpSolverKind {
    type Err = SolverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_ascii_lowercase();
        match normalized.as_str() {
            "microlp" | "default" => Ok(MilpSolverKind::Microlp),
            "clarabel" => {
                #[cfg(feature = "solver-clarabel")]
                {
                    Ok(MilpSolverKind::Clarabel)
                }
                #[cfg(not(feature = "solver-clarabel"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            "highs" => {
                #[cfg(feature = "solver-highs")]
                {
                    Ok(MilpSolverKind::Highs)
                }
                #[cfg(not(feature = "solver-highs"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            other => Err(unknown_solver_error(other)),
        }
    }
}

impl std::fmt::Display for MilpSolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverOptions {
    pub backend: MilpSolverKind,
    /// `None` waits for the backend indefinitely.
    pub time_limit: Option<Duration>,
}

impl SolverOptions {
    pub fn from_config(config: &StudyConfig) -> SolverResult<Self> {
        let time_limit = config
            .solver
            .time_limit_secs
            .map(|seconds| {
                Duration::try_from_secs_f64(seconds)
                    .map_err(|_| SolverError::InvalidTimeLimit { seconds })
            })
            .transpose()?;
        Ok(Self {
            backend: config.solver.backend.parse()?,
            time_limit,
        })
    }

    pub fn with_backend(mut self, backend: MilpSolverKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// One immutable solve result keyed by variable identity.
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolutionStatus,
    pub objective: f64,
    pub solve_time: Duration,
    pub backend: &'static str,
    values: HashMap<VarKey, f64>,
}

impl Solution {
    /// Pairs a solver vector with the formulation's variable keys.
    pub fn from_vector(keys: &[VarKey], vector: SolutionVector, backend: &'static str) -> Self {
        Self {
            status: vector.status,
            objective: vector.objective,
            solve_time: Duration::from_millis(vector.solve_time_ms),
            backend,
            values: keys.iter().copied().zip(vector.values).collect(),
        }
    }

    /// Builds a solution from known values, e.g. a hand-computed power flow.
    pub fn from_values(values: HashMap<VarKey, f64>, objective: f64) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            objective,
            solve_time: Duration::ZERO,
            backend: "external",
            values,
        }
    }

    pub fn value(&self, key: &VarKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Solves `formulation` with the configured backend.
pub fn solve(formulation: &Formulation, options: &SolverOptions) -> SolverResult<Solution> {
    let backend = options.backend;
    let program = &formulation.program;
    if program.has_binary_variables() && !backend.supports_binary() {
        return Err(SolverError::UnsupportedVariableType {
            solver: backend.as_str().to_string(),
            var_type: VarType::Binary,
            problem_type: program.problem_type(),
        });
    }

    info!(
        solver = backend.as_str(),
        problem_type = %program.problem_type(),
        variables = program.num_variables(),
        rows = program.num_rows(),
        "solving curtailment problem"
    );

    let owned = program.clone();
    let limit = options.time_limit;
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("curtail-solver".into())
        .spawn(move || {
            // The receiver may have given up after a timeout.
            let _ = tx.send(run_backend(backend, &owned, limit));
        })
        .map_err(|err| SolverError::WorkerFailed(err.to_string()))?;

    let received = match options.time_limit {
        Some(limit) => rx.recv_timeout(limit).map_err(|err| match err {
            RecvTimeoutError::Timeout => {
                warn!(seconds = limit.as_secs_f64(), "solver hit the time limit");
                SolverError::Timeout {
                    seconds: limit.as_secs_f64(),
                }
            }
            RecvTimeoutError::Disconnected => worker_died(),
        }),
        None => rx.recv().map_err(|_| worker_died()),
    };

    let vector = received?.inspect_err(|err| warn!(error = %err, "solve failed"))?;
    info!(
        objective = vector.objective,
        solve_time_ms = vector.solve_time_ms,
        "solve finished"
    );
    Ok(Solution::from_vector(
        &formulation.keys,
        vector,
        backend.as_str(),
    ))
}

fn worker_died() -> SolverError {
    SolverError::WorkerFailed("solver thread exited without a result".to_string())
}

#[cfg_attr(not(feature = "solver-highs"), allow(unused_variables))]
fn run_backend(
    backend: MilpSolverKind,
    program: &LinearProgram,
    time_limit: Option<Duration>,
) -> SolverResult<SolutionVector> {
    let start = Instant::now();

    let mut vars = ProblemVariables::new();
    // Fixed variables become equality rows; interior-point backends do not
    // cope with a bound interval of zero width.
    let mut fixed = Vec::new();
    let handles: Vec<Variable> = program
        .variables
        .iter()
        .enumerate()
        .map(|(idx, def)| {
            let mut definition = variable().name(def.name.clone());
            match (def.lower, def.upper) {
                (Some(lower), Some(upper)) if lower == upper => fixed.push((idx, lower)),
                (lower, upper) => {
                    if let Some(lower) = lower {
                        definition = definition.min(lower);
                    }
                    if let Some(upper) = upper {
                        definition = definition.max(upper);
                    }
                }
            }
            if def.var_type == VarType::Binary {
                definition = definition.integer();
            }
            vars.add(definition)
        })
        .collect();

    let mut rows = program.rows.clone();
    rows.extend(fixed.into_iter().map(|(idx, value)| {
        ConstraintRow::equal(
            format!("fix[{}]", program.variables[idx].name),
            LinearExpr::new().term(idx, 1.0),
            value,
        )
    }));

    let objective = to_expression(&program.objective, &handles);
    let unsolved = vars.minimise(objective);

    let values = match backend {
        MilpSolverKind::Microlp => {
            let model = add_rows(unsolved.using(microlp_solver), &rows, &handles);
            extract(model.solve(), &handles)?
        }
        #[cfg(feature = "solver-clarabel")]
        MilpSolverKind::Clarabel => {
            let model = add_rows(unsolved.using(clarabel_solver), &rows, &handles);
            extract(model.solve(), &handles)?
        }
        #[cfg(feature = "solver-highs")]
        MilpSolverKind::Highs => {
            let mut model = add_rows(unsolved.using(highs_solver), &rows, &handles);
            if let Some(limit) = time_limit {
                model = model.with_time_limit(limit.as_secs_f64());
            }
            extract(model.solve(), &handles)?
        }
    };

    let objective = program.objective_value(&values);
    Ok(SolutionVector::optimal(
        values,
        objective,
        start.elapsed().as_millis() as u64,
    ))
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for &(var, coef) in &expr.terms {
        out += coef * handles[var];
    }
    out
}

fn add_rows<M>(mut model: M, rows: &[ConstraintRow], handles: &[Variable]) -> M
where
    M: SolverModel,
{
    for row in rows {
        let expr = to_expression(&row.expr, handles);
        match (row.lower, row.upper) {
            (Some(lower), Some(upper)) if lower == upper => {
                model = model.with(constraint!(expr == lower));
            }
            (lower, upper) => {
                if let Some(lower) = lower {
                    model = model.with(constraint!(expr.clone() >= lower));
                }
                if let Some(upper) = upper {
                    model = model.with(constraint!(expr <= upper));
                }
            }
        }
    }
    model
}

fn extract<S>(result: Result<S, ResolutionError>, handles: &[Variable]) -> SolverResult<Vec<f64>>
where
    S: good_lp::Solution,
{
    match result {
        Ok(solution) => Ok(handles.iter().map(|var| solution.value(*var)).collect()),
        Err(ResolutionError::Infeasible) => Err(SolverError::Infeasible(
            "no curtailment schedule satisfies the voltage and thermal limits".to_string(),
        )),
        Err(ResolutionError::Unbounded) => Err(SolverError::Unbounded),
        Err(other) => Err(SolverError::NotConverged(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curtail_solver_common::VariableDef;

    fn knapsack_like() -> LinearProgram {
        // minimise s subject to 10 - 6 s <= 8, s binary: forces s = 1
        LinearProgram {
            variables: vec![VariableDef::binary("s"), VariableDef::free("p")],
            objective: LinearExpr::new().term(0, 1.0),
            rows: vec![
                ConstraintRow::equal("demand", LinearExpr::new().term(1, 1.0).term(0, -6.0), -10.0),
                ConstraintRow::ranged("limit", LinearExpr::new().term(1, 1.0), -8.0, 8.0),
            ],
            parameters: Vec::new(),
        }
    }

    #[test]
    fn solver_kind_parses_known_names() {
        assert_eq!("microlp".parse::<MilpSolverKind>().unwrap(), MilpSolverKind::Microlp);
        assert_eq!("MICROLP".parse::<MilpSolverKind>().unwrap(), MilpSolverKind::Microlp);
        let err = "gurobi".parse::<MilpSolverKind>().unwrap_err();
        assert!(err.to_string().contains("microlp"));
    }

    #[test]
    fn time_limit_from_config() {
        let mut config = StudyConfig::default();
        config.solver.time_limit_secs = Some(2.5);
        let options = SolverOptions::from_config(&config).unwrap();
        assert_eq!(options.time_limit, Some(Duration::from_millis(2500)));

        config.solver.time_limit_secs = Some(1e20);
        let err = SolverOptions::from_config(&config).unwrap_err();
        assert!(matches!(err, SolverError::InvalidTimeLimit { seconds } if seconds == 1e20));
    }

    #[test]
    fn microlp_handles_binary_variables() {
        let values = run_backend(MilpSolverKind::Microlp, &knapsack_like(), None).unwrap().values;
        assert!((values[0] - 1.0).abs() < 1e-6);
        assert!((values[1] + 4.0).abs() < 1e-6);
    }

    #[test]
    fn infeasible_programs_are_reported() {
        let mut program = knapsack_like();
        program.rows[1] = ConstraintRow::ranged("limit", LinearExpr::new().term(1, 1.0), -3.0, 3.0);
        let err = run_backend(MilpSolverKind::Microlp, &program, None).unwrap_err();
        assert!(matches!(err, SolverError::Infeasible(_)));
    }

    #[cfg(feature = "solver-clarabel")]
    #[test]
    fn clarabel_solves_the_relaxation() {
        let mut program = knapsack_like();
        program.variables[0].var_type = VarType::Continuous;
        program.rows[1] = ConstraintRow::ranged("limit", LinearExpr::new().term(1, 1.0), -7.0, 7.0);
        let values = run_backend(MilpSolverKind::Clarabel, &program, None).unwrap().values;
        // 10 - 6 s <= 7  =>  s >= 0.5
        assert!((values[0] - 0.5).abs() < 1e-5);
    }
}
