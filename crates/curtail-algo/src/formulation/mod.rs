//! Three-phase LinDistFlow formulation with curtailment decisions.
//!
//! [`ProblemBuilder`] walks a [`NetworkModel`] once and emits a frozen
//! [`Formulation`]: the solver-facing [`LinearProgram`] plus the [`VarKey`]
//! of every variable and the [`RowFamily`] of every row.
//!
//! ## Sign conventions
//!
//! - Injections are positive for generation. A loaded node consumes
//!   `s·guaranteed + (1 − s)·forecasted`, so its injection is the negative of
//!   that. Nodes without a load inject exactly zero.
//! - Branch flows are positive from `from` to `to`.
//! - The upstream grid enters through free supply variables at the slack node.
//!
//! ## Constraint families
//!
//! | Family | Rows per (entity, phase, step) |
//! |--------|--------------------------------|
//! | demand | `p_inj + (g − f)·s = −f`, same for q |
//! | voltage_bounds | `vmin² ≤ u_pp ≤ vmax²` |
//! | slack_reference | `u_pp = v_ref²` at the slack |
//! | thermal | `−L ≤ P ± Q ≤ L` on own-phase flows |
//! | power_balance | `Σ in + inj (+ supply) − Σ out = 0` |
//! | voltage_drop | `u_to − u_from + 2R·P + 2X·Q = 0` per phase pair |
//! | phase_coupling | off-diagonal flow = Γ applied to own-phase flow |
//! | smoothing | `d ≥ ±(s_t − s_{t−1})` |
//!
//! The thermal rows bound `|P| + |Q|`, which never exceeds the limit when
//! `√(P² + Q²)` would not, so the proxy is conservative.
//!
//! Emission order is family first, then entity, phase, time. With the
//! `parallel` feature each entity is expanded on the rayon pool into its own
//! buffer and buffers are concatenated in entity order, so the output is
//! identical to a sequential build.

mod constraints;
pub mod keys;
pub mod rotation;

use std::collections::HashMap;

use curtail_core::{
    CurtailmentKind, LoadProfile, LoadProfileKind, LoadRecord, NetworkModel, Phase, PhaseCoupling,
    StudyConfig,
};
use curtail_solver_common::{ConstraintRow, LinearExpr, LinearProgram, VariableDef};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::FormulationError;
use constraints::RowContext;
pub use keys::{Power, RowFamily, VarKey};
pub use rotation::PhaseRotation;

/// Builder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormulationOptions {
    pub phase_coupling: PhaseCoupling,
    pub load_profile: LoadProfileKind,
    pub curtailment: CurtailmentKind,
    /// Weight on the toggle variables (0 disables smoothing).
    pub smoothing_weight: f64,
    /// Reference magnitude at the slack node (p.u.).
    pub slack_voltage: f64,
    pub rotation: PhaseRotation,
}

impl Default for FormulationOptions {
    fn default() -> Self {
        Self {
            phase_coupling: PhaseCoupling::Full,
            load_profile: LoadProfileKind::Static,
            curtailment: CurtailmentKind::Binary,
            smoothing_weight: 0.0,
            slack_voltage: 1.0,
            rotation: PhaseRotation::symmetric(),
        }
    }
}

impl FormulationOptions {
    pub fn from_config(config: &StudyConfig) -> Self {
        Self {
            phase_coupling: config.formulation.phase_coupling,
            load_profile: config.formulation.load_profile,
            curtailment: config.formulation.curtailment,
            smoothing_weight: config.formulation.smoothing_weight,
            slack_voltage: config.recovery.slack_voltage,
            rotation: PhaseRotation::symmetric(),
        }
    }

    pub fn with_phase_coupling(mut self, coupling: PhaseCoupling) -> Self {
        self.phase_coupling = coupling;
        self
    }

    pub fn with_load_profile(mut self, profile: LoadProfileKind) -> Self {
        self.load_profile = profile;
        self
    }

    pub fn with_curtailment(mut self, curtailment: CurtailmentKind) -> Self {
        self.curtailment = curtailment;
        self
    }

    pub fn with_smoothing_weight(mut self, weight: f64) -> Self {
        self.smoothing_weight = weight;
        self
    }

    pub fn with_slack_voltage(mut self, voltage: f64) -> Self {
        self.slack_voltage = voltage;
        self
    }

    fn check(&self) -> Result<(), FormulationError> {
        if !(self.smoothing_weight >= 0.0 && self.smoothing_weight.is_finite()) {
            return Err(FormulationError::InvalidOption(format!(
                "smoothing weight must be non-negative, got {}",
                self.smoothing_weight
            )));
        }
        if !(self.slack_voltage > 0.0 && self.slack_voltage.is_finite()) {
            return Err(FormulationError::InvalidOption(format!(
                "slack voltage must be positive, got {}",
                self.slack_voltage
            )));
        }
        Ok(())
    }

    fn smoothing_enabled(&self) -> bool {
        self.smoothing_weight > 0.0
    }
}

/// A frozen problem ready for the solver adapter.
#[derive(Debug, Clone, Serialize)]
pub struct Formulation {
    pub options: FormulationOptions,
    pub program: LinearProgram,
    /// Identity of each variable, parallel to `program.variables`.
    pub keys: Vec<VarKey>,
    /// Family of each row, parallel to `program.rows`.
    pub families: Vec<RowFamily>,
    #[serde(skip)]
    index: HashMap<VarKey, usize>,
}

/// Variable and row counts for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulationSummary {
    pub variables: usize,
    pub binary_variables: usize,
    pub rows: usize,
    pub rows_per_family: Vec<(RowFamily, usize)>,
}

impl Formulation {
    pub fn var_index(&self, key: &VarKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn rows_of(&self, family: RowFamily) -> impl Iterator<Item = &ConstraintRow> {
        self.program
            .rows
            .iter()
            .zip(&self.families)
            .filter(move |(_, f)| **f == family)
            .map(|(row, _)| row)
    }

    pub fn summary(&self) -> FormulationSummary {
        let rows_per_family = RowFamily::ORDER
            .iter()
            .map(|family| (*family, self.families.iter().filter(|f| *f == family).count()))
            .filter(|(_, count)| *count > 0)
            .collect();
        FormulationSummary {
            variables: self.program.num_variables(),
            binary_variables: self
                .program
                .variables
                .iter()
                .filter(|v| v.var_type == curtail_solver_common::VarType::Binary)
                .count(),
            rows: self.program.num_rows(),
            rows_per_family,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Default)]
struct VariableTable {
    keys: Vec<VarKey>,
    defs: Vec<VariableDef>,
    index: HashMap<VarKey, usize>,
}

impl VariableTable {
    fn add(&mut self, key: VarKey, def: VariableDef) -> usize {
        let idx = self.keys.len();
        self.keys.push(key);
        self.defs.push(def);
        self.index.insert(key, idx);
        idx
    }
}

/// Per node, the load record for each step (index `step - 1`).
pub(crate) type LoadTable = Vec<Option<Vec<LoadRecord>>>;

pub struct ProblemBuilder<'a> {
    model: &'a NetworkModel,
    options: FormulationOptions,
}

impl<'a> ProblemBuilder<'a> {
    pub fn new(model: &'a NetworkModel, options: FormulationOptions) -> Self {
        Self { model, options }
    }

    pub fn build(&self) -> Result<Formulation, FormulationError> {
        self.options.check()?;
        let loads = self.resolve_loads()?;

        let mut vars = VariableTable::default();
        self.declare_variables(&mut vars, &loads);

        let ctx = RowContext::new(self.model, &self.options, &vars.index, &loads);
        let mut rows = Vec::new();
        let mut families = Vec::new();
        for family in RowFamily::ORDER {
            let block = ctx.rows(family);
            debug!(family = %family, rows = block.len(), "emitted constraint family");
            families.extend(std::iter::repeat(family).take(block.len()));
            rows.extend(block);
        }

        let mut objective = LinearExpr::new();
        for (idx, key) in vars.keys.iter().enumerate() {
            match key {
                VarKey::Status { .. } => objective.push(idx, 1.0),
                VarKey::Toggle { .. } => objective.push(idx, self.options.smoothing_weight),
                _ => {}
            }
        }

        let program = LinearProgram {
            variables: vars.defs,
            objective,
            rows,
            parameters: Vec::new(),
        };
        info!(
            variables = program.num_variables(),
            rows = program.num_rows(),
            problem_type = %program.problem_type(),
            coupling = %self.options.phase_coupling,
            "built curtailment formulation"
        );

        Ok(Formulation {
            options: self.options,
            program,
            keys: vars.keys,
            families,
            index: vars.index,
        })
    }

    /// Expands every load into one record per step, enforcing the
    /// configured profile form.
    fn resolve_loads(&self) -> Result<LoadTable, FormulationError> {
        let horizon = self.model.parameters().time_steps;
        self.model
            .nodes()
            .iter()
            .map(|node| match (&node.load, self.options.load_profile) {
                (None, _) => Ok(None),
                (Some(LoadProfile::Static(record)), LoadProfileKind::Static) => {
                    Ok(Some(vec![*record; horizon]))
                }
                (Some(LoadProfile::TimeSeries(records)), LoadProfileKind::TimeSeries) => {
                    let mut slots: Vec<Vec<LoadRecord>> = vec![Vec::new(); horizon];
                    for (step, record) in records {
                        if let Some(slot) = step.checked_sub(1).and_then(|i| slots.get_mut(i)) {
                            slot.push(*record);
                        }
                    }
                    for (i, slot) in slots.iter().enumerate() {
                        match slot.len() {
                            1 => {}
                            0 => {
                                return Err(FormulationError::MissingLoadRecord {
                                    node: node.id.clone(),
                                    step: i + 1,
                                })
                            }
                            count => {
                                return Err(FormulationError::DuplicateLoadRecord {
                                    node: node.id.clone(),
                                    step: i + 1,
                                    count,
                                })
                            }
                        }
                    }
                    Ok(Some(slots.into_iter().flatten().collect()))
                }
                (Some(LoadProfile::Static(_)), LoadProfileKind::TimeSeries) => {
                    Err(FormulationError::LoadProfileMismatch {
                        node: node.id.clone(),
                        expected: "time_series",
                        found: "static",
                    })
                }
                (Some(LoadProfile::TimeSeries(_)), LoadProfileKind::Static) => {
                    Err(FormulationError::LoadProfileMismatch {
                        node: node.id.clone(),
                        expected: "static",
                        found: "time_series",
                    })
                }
            })
            .collect()
    }

    fn declare_variables(&self, vars: &mut VariableTable, loads: &LoadTable) {
        let model = self.model;
        let steps = model.time_steps();
        let phases = model.phases();
        let pairs = phase_pairs(phases, self.options.phase_coupling);
        let mut add = |key: VarKey, def: fn(String) -> VariableDef| {
            vars.add(key, def(key.label(model)));
        };

        let status_def: fn(String) -> VariableDef = match self.options.curtailment {
            CurtailmentKind::Binary => binary,
            CurtailmentKind::Relaxed => unit_interval,
        };
        let loaded: Vec<usize> = model.loaded_nodes().collect();

        for &node in &loaded {
            for step in steps.clone() {
                add(VarKey::Status { node, step }, status_def);
            }
        }
        if self.options.smoothing_enabled() {
            for &node in &loaded {
                for step in steps.clone().skip(1) {
                    add(VarKey::Toggle { node, step }, unit_interval);
                }
            }
        }

        for (node, load) in loads.iter().enumerate() {
            let def: fn(String) -> VariableDef = if load.is_some() {
                free
            } else {
                fixed_zero
            };
            for &phase in phases {
                for step in steps.clone() {
                    for power in Power::BOTH {
                        add(
                            VarKey::Injection {
                                power,
                                node,
                                phase,
                                step,
                            },
                            def,
                        );
                    }
                }
            }
        }

        for &phase in phases {
            for step in steps.clone() {
                for power in Power::BOTH {
                    add(VarKey::Supply { power, phase, step }, free);
                }
            }
        }

        for branch in 0..model.branches().len() {
            for &(row, col) in &pairs {
                for step in steps.clone() {
                    for power in Power::BOTH {
                        add(
                            VarKey::Flow {
                                power,
                                branch,
                                row,
                                col,
                                step,
                            },
                            free,
                        );
                    }
                }
            }
        }

        for node in 0..model.nodes().len() {
            for &(row, col) in &pairs {
                let def: fn(String) -> VariableDef = if row == col {
                    non_negative
                } else {
                    free
                };
                for step in steps.clone() {
                    add(VarKey::VoltageSq { node, row, col, step }, def);
                }
            }
        }
    }
}

fn binary(name: String) -> VariableDef {
    VariableDef::binary(name)
}

fn free(name: String) -> VariableDef {
    VariableDef::free(name)
}

fn unit_interval(name: String) -> VariableDef {
    VariableDef::bounded(name, 0.0, 1.0)
}

fn fixed_zero(name: String) -> VariableDef {
    VariableDef::bounded(name, 0.0, 0.0)
}

fn non_negative(name: String) -> VariableDef {
    VariableDef::free(name).with_lower(0.0)
}

/// Phase pairs carrying flow and voltage variables, row-major.
pub(crate) fn phase_pairs(phases: &[Phase], coupling: PhaseCoupling) -> Vec<(Phase, Phase)> {
    match coupling {
        PhaseCoupling::DiagonalOnly => phases.iter().map(|&p| (p, p)).collect(),
        PhaseCoupling::Full => phases
            .iter()
            .flat_map(|&row| phases.iter().map(move |&col| (row, col)))
            .collect(),
    }
}

#[cfg(test)]
mod tests;
