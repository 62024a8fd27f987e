//! End-to-end study: validate, formulate, solve, recover.

use std::time::Instant;

use curtail_core::{NetworkDocument, NetworkModel, StudyConfig};
use serde::Serialize;
use tracing::{info, info_span};

use crate::error::PipelineError;
use crate::formulation::{Formulation, FormulationOptions, ProblemBuilder};
use crate::recovery::{recover, PhasorSnapshot, RecoveryOptions};
use crate::solve::{solve, Solution, SolverOptions};

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimes {
    pub validate_ms: u128,
    pub formulate_ms: u128,
    pub solve_ms: u128,
    pub recover_ms: u128,
}

impl StageTimes {
    pub fn total_ms(&self) -> u128 {
        self.validate_ms + self.formulate_ms + self.solve_ms + self.recover_ms
    }
}

/// Everything a report needs about one study.
#[derive(Debug, Clone)]
pub struct StudyOutcome {
    pub model: NetworkModel,
    pub formulation: Formulation,
    pub solution: Solution,
    pub phasors: Vec<PhasorSnapshot>,
    pub times: StageTimes,
}

/// A configured study, reusable across documents.
#[derive(Debug, Clone)]
pub struct CongestionStudy {
    formulation: FormulationOptions,
    solver: SolverOptions,
    recovery: RecoveryOptions,
}

impl CongestionStudy {
    pub fn new(config: StudyConfig) -> Result<Self, PipelineError> {
        config.check()?;
        let formulation = FormulationOptions::from_config(&config);
        Ok(Self {
            formulation,
            solver: SolverOptions::from_config(&config)?,
            recovery: RecoveryOptions::from(&formulation),
        })
    }

    /// Builds a study from explicit options, bypassing the config file.
    pub fn with_options(formulation: FormulationOptions, solver: SolverOptions) -> Self {
        Self {
            formulation,
            solver,
            recovery: RecoveryOptions::from(&formulation),
        }
    }

    pub fn formulation_options(&self) -> &FormulationOptions {
        &self.formulation
    }

    pub fn solver_options(&self) -> &SolverOptions {
        &self.solver
    }

    pub fn run(&self, document: &NetworkDocument) -> Result<StudyOutcome, PipelineError> {
        let start = Instant::now();
        let model = {
            let _span = info_span!("validate").entered();
            NetworkModel::from_document(document)?
        };
        let validate_ms = start.elapsed().as_millis();
        let mut outcome = self.run_model(model)?;
        outcome.times.validate_ms = validate_ms;
        Ok(outcome)
    }

    /// Runs the stages after validation on an already built model.
    pub fn run_model(&self, model: NetworkModel) -> Result<StudyOutcome, PipelineError> {
        let mut times = StageTimes::default();

        let formulate_start = Instant::now();
        let formulation = {
            let _span = info_span!("formulate").entered();
            ProblemBuilder::new(&model, self.formulation).build()?
        };
        times.formulate_ms = formulate_start.elapsed().as_millis();

        let solve_start = Instant::now();
        let solution = {
            let _span = info_span!("solve", backend = self.solver.backend.as_str()).entered();
            solve(&formulation, &self.solver)?
        };
        times.solve_ms = solve_start.elapsed().as_millis();

        let recover_start = Instant::now();
        let phasors = {
            let _span = info_span!("recover").entered();
            recover(&model, &solution, &self.recovery)?
        };
        times.recover_ms = recover_start.elapsed().as_millis();

        info!(
            objective = solution.objective,
            formulate_ms = times.formulate_ms,
            solve_ms = times.solve_ms,
            recover_ms = times.recover_ms,
            "study complete"
        );

        Ok(StudyOutcome {
            model,
            formulation,
            solution,
            phasors,
            times,
        })
    }
}
