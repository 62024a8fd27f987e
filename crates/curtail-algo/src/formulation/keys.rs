//! Variable and row identities.

use std::fmt;

use curtail_core::{NetworkModel, Phase};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    Active,
    Reactive,
}

impl Power {
    pub const BOTH: [Power; 2] = [Power::Active, Power::Reactive];

    fn prefix(self) -> &'static str {
        match self {
            Power::Active => "p",
            Power::Reactive => "q",
        }
    }
}

/// Identity of one decision variable. Node and branch fields are positions
/// in the [`NetworkModel`]; steps are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VarKey {
    /// Curtailment indicator (1 = served at the guaranteed level).
    Status { node: usize, step: usize },
    /// |status(t) - status(t-1)| bound used by the smoothing term.
    Toggle { node: usize, step: usize },
    /// Own-phase nodal injection; positive is generation.
    Injection {
        power: Power,
        node: usize,
        phase: Phase,
        step: usize,
    },
    /// Power drawn from the upstream grid at the slack node.
    Supply {
        power: Power,
        phase: Phase,
        step: usize,
    },
    /// Branch flow for the (row, col) phase pair, from → to positive.
    Flow {
        power: Power,
        branch: usize,
        row: Phase,
        col: Phase,
        step: usize,
    },
    /// Squared voltage for the (row, col) phase pair.
    VoltageSq {
        node: usize,
        row: Phase,
        col: Phase,
        step: usize,
    },
}

impl VarKey {
    pub fn step(&self) -> usize {
        match *self {
            VarKey::Status { step, .. }
            | VarKey::Toggle { step, .. }
            | VarKey::Injection { step, .. }
            | VarKey::Supply { step, .. }
            | VarKey::Flow { step, .. }
            | VarKey::VoltageSq { step, .. } => step,
        }
    }

    /// Human-readable name using document ids, e.g. `p_flow[1-2,a,b,t1]`.
    pub fn label(&self, model: &NetworkModel) -> String {
        let node = |idx: usize| model.nodes()[idx].id.as_str().to_string();
        let branch = |idx: usize| model.branches()[idx].id.as_str().to_string();
        match *self {
            VarKey::Status { node: n, step } => format!("s[{},t{step}]", node(n)),
            VarKey::Toggle { node: n, step } => format!("d[{},t{step}]", node(n)),
            VarKey::Injection {
                power,
                node: n,
                phase,
                step,
            } => format!("{}_inj[{},{phase},t{step}]", power.prefix(), node(n)),
            VarKey::Supply { power, phase, step } => {
                format!("{}_sup[{phase},t{step}]", power.prefix())
            }
            VarKey::Flow {
                power,
                branch: b,
                row,
                col,
                step,
            } => format!("{}_flow[{},{row},{col},t{step}]", power.prefix(), branch(b)),
            VarKey::VoltageSq {
                node: n,
                row,
                col,
                step,
            } => format!("u[{},{row},{col},t{step}]", node(n)),
        }
    }
}

/// Constraint family, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFamily {
    Demand,
    VoltageBounds,
    SlackReference,
    Thermal,
    PowerBalance,
    VoltageDrop,
    PhaseCoupling,
    Smoothing,
}

impl RowFamily {
    pub const ORDER: [RowFamily; 8] = [
        RowFamily::Demand,
        RowFamily::VoltageBounds,
        RowFamily::SlackReference,
        RowFamily::Thermal,
        RowFamily::PowerBalance,
        RowFamily::VoltageDrop,
        RowFamily::PhaseCoupling,
        RowFamily::Smoothing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RowFamily::Demand => "demand",
            RowFamily::VoltageBounds => "voltage_bounds",
            RowFamily::SlackReference => "slack_reference",
            RowFamily::Thermal => "thermal",
            RowFamily::PowerBalance => "power_balance",
            RowFamily::VoltageDrop => "voltage_drop",
            RowFamily::PhaseCoupling => "phase_coupling",
            RowFamily::Smoothing => "smoothing",
        }
    }
}

impl fmt::Display for RowFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
