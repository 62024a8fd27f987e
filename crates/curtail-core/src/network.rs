//! Immutable feeder model produced by the validator.
//!
//! Nodes and branches keep document order. Branch endpoints are resolved to
//! node positions once, and the incoming/outgoing adjacency is precomputed so
//! that downstream passes never search the branch list.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::phase::{Phase, PhaseMatrix, PhaseValues};
use crate::{BranchId, NodeId};

/// Forecast and guaranteed demand for one node over one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadRecord {
    pub p_forecasted: PhaseValues,
    pub q_forecasted: PhaseValues,
    pub p_guaranteed: PhaseValues,
    pub q_guaranteed: PhaseValues,
}

/// How a node's load is given over the horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LoadProfile {
    /// The same record applies to every step.
    Static(LoadRecord),
    /// `(time_step, record)` pairs in document order. Coverage of the horizon
    /// is checked when the problem is built, not here.
    TimeSeries(Vec<(usize, LoadRecord)>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub load: Option<LoadProfile>,
}

impl Node {
    pub fn has_load(&self) -> bool {
        self.load.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Impedance {
    pub r: PhaseMatrix,
    pub x: PhaseMatrix,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub id: BranchId,
    /// Position of the sending node in [`NetworkModel::nodes`].
    pub from: usize,
    /// Position of the receiving node in [`NetworkModel::nodes`].
    pub to: usize,
    pub impedance: Impedance,
    pub thermal_limit: f64,
}

/// Per-unit voltage magnitude band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoltageLimits {
    pub min: f64,
    pub max: f64,
}

impl VoltageLimits {
    /// Bounds on the squared magnitude.
    pub fn squared(&self) -> (f64, f64) {
        (self.min * self.min, self.max * self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameters {
    pub time_steps: usize,
    /// Active phases in canonical order.
    pub phases: Vec<Phase>,
    pub voltage_limits: VoltageLimits,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkModel {
    nodes: Vec<Node>,
    branches: Vec<Branch>,
    parameters: Parameters,
    slack: usize,
    #[serde(skip)]
    node_index: HashMap<NodeId, usize>,
    #[serde(skip)]
    branch_index: HashMap<BranchId, usize>,
    #[serde(skip)]
    outgoing: Vec<Vec<usize>>,
    #[serde(skip)]
    incoming: Vec<Vec<usize>>,
}

impl NetworkModel {
    /// Assembles a model from parts that already passed validation.
    pub(crate) fn assemble(
        nodes: Vec<Node>,
        branches: Vec<Branch>,
        parameters: Parameters,
        slack: usize,
    ) -> Self {
        let node_index = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.clone(), idx))
            .collect();
        let branch_index = branches
            .iter()
            .enumerate()
            .map(|(idx, branch)| (branch.id.clone(), idx))
            .collect();

        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for (idx, branch) in branches.iter().enumerate() {
            outgoing[branch.from].push(idx);
            incoming[branch.to].push(idx);
        }

        Self {
            nodes,
            branches,
            parameters,
            slack,
            node_index,
            branch_index,
            outgoing,
            incoming,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn phases(&self) -> &[Phase] {
        &self.parameters.phases
    }

    /// Steps `1..=T`.
    pub fn time_steps(&self) -> RangeInclusive<usize> {
        1..=self.parameters.time_steps
    }

    /// Position of the slack node.
    pub fn slack(&self) -> usize {
        self.slack
    }

    pub fn slack_node(&self) -> &Node {
        &self.nodes[self.slack]
    }

    pub fn node_position(&self, id: &NodeId) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn branch_position(&self, id: &BranchId) -> Option<usize> {
        self.branch_index.get(id).copied()
    }

    /// Branches leaving `node` (where it is the `from` end), in branch order.
    pub fn outgoing(&self, node: usize) -> &[usize] {
        &self.outgoing[node]
    }

    /// Branches entering `node` (where it is the `to` end), in branch order.
    pub fn incoming(&self, node: usize) -> &[usize] {
        &self.incoming[node]
    }

    /// Positions of nodes carrying a load, in node order.
    pub fn loaded_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.has_load())
            .map(|(idx, _)| idx)
    }
}
