//! Read access to a solution by document ids.

use curtail_core::{BranchId, NetworkModel, NodeId, Phase};
use serde::Serialize;

use crate::formulation::{Power, VarKey};
use crate::solve::Solution;

/// Solved quantity to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Status,
    Toggle,
    ActiveInjection,
    ReactiveInjection,
    /// Grid supply at the slack; the entity id is ignored.
    ActiveSupply,
    ReactiveSupply,
    ActiveFlow,
    ReactiveFlow,
    VoltageSquared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseSelector {
    None,
    Phase(Phase),
    Pair(Phase, Phase),
}

impl From<Phase> for PhaseSelector {
    fn from(phase: Phase) -> Self {
        PhaseSelector::Phase(phase)
    }
}

/// A node served at its guaranteed level during one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurtailmentEvent {
    pub node: NodeId,
    pub step: usize,
    /// Status value as solved; fractional under the relaxation.
    pub level: f64,
}

pub struct SolutionView<'a> {
    model: &'a NetworkModel,
    solution: &'a Solution,
}

impl<'a> SolutionView<'a> {
    pub fn new(model: &'a NetworkModel, solution: &'a Solution) -> Self {
        Self { model, solution }
    }

    /// Looks up one value; `None` when the combination does not exist in the
    /// formulation (unknown entity, unloaded status, off-diagonal pair
    /// without coupling, step outside the horizon).
    pub fn value(
        &self,
        quantity: Quantity,
        entity: &str,
        selector: PhaseSelector,
        step: usize,
    ) -> Option<f64> {
        let key = self.key(quantity, entity, selector, step)?;
        self.solution.value(&key)
    }

    fn key(
        &self,
        quantity: Quantity,
        entity: &str,
        selector: PhaseSelector,
        step: usize,
    ) -> Option<VarKey> {
        let node = || self.model.node_position(&NodeId::new(entity));
        let branch = || self.model.branch_position(&BranchId::new(entity));
        let key = match (quantity, selector) {
            (Quantity::Status, PhaseSelector::None) => VarKey::Status { node: node()?, step },
            (Quantity::Toggle, PhaseSelector::None) => VarKey::Toggle { node: node()?, step },
            (Quantity::ActiveInjection, PhaseSelector::Phase(phase)) => VarKey::Injection {
                power: Power::Active,
                node: node()?,
                phase,
                step,
            },
            (Quantity::ReactiveInjection, PhaseSelector::Phase(phase)) => VarKey::Injection {
                power: Power::Reactive,
                node: node()?,
                phase,
                step,
            },
            (Quantity::ActiveSupply, PhaseSelector::Phase(phase)) => VarKey::Supply {
                power: Power::Active,
                phase,
                step,
            },
            (Quantity::ReactiveSupply, PhaseSelector::Phase(phase)) => VarKey::Supply {
                power: Power::Reactive,
                phase,
                step,
            },
            (Quantity::ActiveFlow | Quantity::ReactiveFlow, selector) => {
                let (row, col) = pair(selector)?;
                let power = if quantity == Quantity::ActiveFlow {
                    Power::Active
                } else {
                    Power::Reactive
                };
                VarKey::Flow {
                    power,
                    branch: branch()?,
                    row,
                    col,
                    step,
                }
            }
            (Quantity::VoltageSquared, selector) => {
                let (row, col) = pair(selector)?;
                VarKey::VoltageSq {
                    node: node()?,
                    row,
                    col,
                    step,
                }
            }
            _ => return None,
        };
        Some(key)
    }

    /// Loaded nodes whose status exceeds one half at `step`.
    pub fn curtailed_nodes(&self, step: usize) -> Vec<&'a NodeId> {
        self.model
            .loaded_nodes()
            .filter(|&node| {
                self.solution
                    .value(&VarKey::Status { node, step })
                    .is_some_and(|s| s > 0.5)
            })
            .map(|node| &self.model.nodes()[node].id)
            .collect()
    }

    /// Every (node, step) with a non-zero status, in step then node order.
    pub fn curtailment_events(&self) -> Vec<CurtailmentEvent> {
        let mut events = Vec::new();
        for step in self.model.time_steps() {
            for node in self.model.loaded_nodes() {
                let Some(level) = self.solution.value(&VarKey::Status { node, step }) else {
                    continue;
                };
                if level > 1e-6 {
                    events.push(CurtailmentEvent {
                        node: self.model.nodes()[node].id.clone(),
                        step,
                        level,
                    });
                }
            }
        }
        events
    }

    /// Served active and reactive power, i.e. the negated injection.
    pub fn consumption(&self, node: &str, phase: Phase, step: usize) -> Option<(f64, f64)> {
        let p = self.value(Quantity::ActiveInjection, node, phase.into(), step)?;
        let q = self.value(Quantity::ReactiveInjection, node, phase.into(), step)?;
        Some((-p, -q))
    }

    /// `√u` for the own-phase squared voltage.
    pub fn voltage_magnitude(&self, node: &str, phase: Phase, step: usize) -> Option<f64> {
        self.value(
            Quantity::VoltageSquared,
            node,
            PhaseSelector::Pair(phase, phase),
            step,
        )
        .map(|u| u.max(0.0).sqrt())
    }
}

fn pair(selector: PhaseSelector) -> Option<(Phase, Phase)> {
    match selector {
        PhaseSelector::Phase(phase) => Some((phase, phase)),
        PhaseSelector::Pair(row, col) => Some((row, col)),
        PhaseSelector::None => None,
    }
}
