use std::collections::HashMap;

use curtail_core::{NetworkModel, Phase, PhaseCoupling};
use curtail_solver_common::{ConstraintRow, LinearExpr};

use super::keys::{Power, RowFamily, VarKey};
use super::{phase_pairs, FormulationOptions, LoadTable};

/// Read-only view shared by every row generator.
pub(super) struct RowContext<'a> {
    model: &'a NetworkModel,
    options: &'a FormulationOptions,
    index: &'a HashMap<VarKey, usize>,
    loads: &'a LoadTable,
    pairs: Vec<(Phase, Phase)>,
}

impl<'a> RowContext<'a> {
    pub(super) fn new(
        model: &'a NetworkModel,
        options: &'a FormulationOptions,
        index: &'a HashMap<VarKey, usize>,
        loads: &'a LoadTable,
    ) -> Self {
        Self {
            model,
            options,
            index,
            loads,
            pairs: phase_pairs(model.phases(), options.phase_coupling),
        }
    }

    pub(super) fn rows(&self, family: RowFamily) -> Vec<ConstraintRow> {
        let nodes = self.model.nodes().len();
        let branches = self.model.branches().len();
        match family {
            RowFamily::Demand => per_entity(nodes, |n| self.demand(n)),
            RowFamily::VoltageBounds => per_entity(nodes, |n| self.voltage_bounds(n)),
            RowFamily::SlackReference => self.slack_reference(),
            RowFamily::Thermal => per_entity(branches, |b| self.thermal(b)),
            RowFamily::PowerBalance => per_entity(nodes, |n| self.power_balance(n)),
            RowFamily::VoltageDrop => per_entity(branches, |b| self.voltage_drop(b)),
            RowFamily::PhaseCoupling => match self.options.phase_coupling {
                PhaseCoupling::Full => per_entity(branches, |b| self.phase_coupling(b)),
                PhaseCoupling::DiagonalOnly => Vec::new(),
            },
            RowFamily::Smoothing if self.options.smoothing_enabled() => {
                per_entity(nodes, |n| self.smoothing(n))
            }
            RowFamily::Smoothing => Vec::new(),
        }
    }

    // Every key looked up here was declared by the builder from the same
    // model and options.
    fn var(&self, key: VarKey) -> usize {
        self.index[&key]
    }

    fn node_id(&self, node: usize) -> &str {
        self.model.nodes()[node].id.as_str()
    }

    fn branch_id(&self, branch: usize) -> &str {
        self.model.branches()[branch].id.as_str()
    }

    fn demand(&self, node: usize) -> Vec<ConstraintRow> {
        let Some(records) = &self.loads[node] else {
            return Vec::new();
        };
        let mut rows = Vec::new();
        for &phase in self.model.phases() {
            for step in self.model.time_steps() {
                let record = &records[step - 1];
                let status = self.var(VarKey::Status { node, step });
                for power in Power::BOTH {
                    let (forecast, guaranteed, tag) = match power {
                        Power::Active => {
                            (record.p_forecasted[phase], record.p_guaranteed[phase], "p")
                        }
                        Power::Reactive => {
                            (record.q_forecasted[phase], record.q_guaranteed[phase], "q")
                        }
                    };
                    let injection = self.var(VarKey::Injection {
                        power,
                        node,
                        phase,
                        step,
                    });
                    // -inj = s·g + (1 - s)·f
                    rows.push(ConstraintRow::equal(
                        format!("demand_{tag}[{},{phase},t{step}]", self.node_id(node)),
                        LinearExpr::new()
                            .term(injection, 1.0)
                            .term(status, guaranteed - forecast),
                        -forecast,
                    ));
                }
            }
        }
        rows
    }

    fn voltage_bounds(&self, node: usize) -> Vec<ConstraintRow> {
        let (lower, upper) = self.model.parameters().voltage_limits.squared();
        let mut rows = Vec::new();
        for &phase in self.model.phases() {
            for step in self.model.time_steps() {
                let u = self.var(VarKey::VoltageSq {
                    node,
                    row: phase,
                    col: phase,
                    step,
                });
                rows.push(ConstraintRow::ranged(
                    format!("vbound[{},{phase},t{step}]", self.node_id(node)),
                    LinearExpr::new().term(u, 1.0),
                    lower,
                    upper,
                ));
            }
        }
        rows
    }

    fn slack_reference(&self) -> Vec<ConstraintRow> {
        let node = self.model.slack();
        let reference = self.options.slack_voltage * self.options.slack_voltage;
        let mut rows = Vec::new();
        for &phase in self.model.phases() {
            for step in self.model.time_steps() {
                let u = self.var(VarKey::VoltageSq {
                    node,
                    row: phase,
                    col: phase,
                    step,
                });
                rows.push(ConstraintRow::equal(
                    format!("vref[{},{phase},t{step}]", self.node_id(node)),
                    LinearExpr::new().term(u, 1.0),
                    reference,
                ));
            }
        }
        rows
    }

    fn thermal(&self, branch: usize) -> Vec<ConstraintRow> {
        let limit = self.model.branches()[branch].thermal_limit;
        let mut rows = Vec::new();
        for &phase in self.model.phases() {
            for step in self.model.time_steps() {
                let p = self.var(flow(Power::Active, branch, phase, phase, step));
                let q = self.var(flow(Power::Reactive, branch, phase, phase, step));
                for (tag, sign) in [("sum", 1.0), ("diff", -1.0)] {
                    rows.push(ConstraintRow::ranged(
                        format!("thermal_{tag}[{},{phase},t{step}]", self.branch_id(branch)),
                        LinearExpr::new().term(p, 1.0).term(q, sign),
                        -limit,
                        limit,
                    ));
                }
            }
        }
        rows
    }

    fn power_balance(&self, node: usize) -> Vec<ConstraintRow> {
        let is_slack = node == self.model.slack();
        let mut rows = Vec::new();
        for &phase in self.model.phases() {
            for step in self.model.time_steps() {
                for power in Power::BOTH {
                    let mut expr = LinearExpr::new();
                    for &b in self.model.incoming(node) {
                        expr.push(self.var(flow(power, b, phase, phase, step)), 1.0);
                    }
                    expr.push(
                        self.var(VarKey::Injection {
                            power,
                            node,
                            phase,
                            step,
                        }),
                        1.0,
                    );
                    if is_slack {
                        expr.push(self.var(VarKey::Supply { power, phase, step }), 1.0);
                    }
                    for &b in self.model.outgoing(node) {
                        expr.push(self.var(flow(power, b, phase, phase, step)), -1.0);
                    }
                    let tag = match power {
                        Power::Active => "p",
                        Power::Reactive => "q",
                    };
                    rows.push(ConstraintRow::equal(
                        format!("kcl_{tag}[{},{phase},t{step}]", self.node_id(node)),
                        expr,
                        0.0,
                    ));
                }
            }
        }
        rows
    }

    fn voltage_drop(&self, branch: usize) -> Vec<ConstraintRow> {
        let line = &self.model.branches()[branch];
        let mut rows = Vec::new();
        for &(row, col) in &self.pairs {
            let r = line.impedance.r.get(row, col);
            let x = line.impedance.x.get(row, col);
            for step in self.model.time_steps() {
                let mut expr = LinearExpr::new()
                    .term(self.var(voltage(line.to, row, col, step)), 1.0)
                    .term(self.var(voltage(line.from, row, col, step)), -1.0);
                if r != 0.0 {
                    expr.push(self.var(flow(Power::Active, branch, row, col, step)), 2.0 * r);
                }
                if x != 0.0 {
                    expr.push(self.var(flow(Power::Reactive, branch, row, col, step)), 2.0 * x);
                }
                rows.push(ConstraintRow::equal(
                    format!("vdrop[{},{row},{col},t{step}]", line.id),
                    expr,
                    0.0,
                ));
            }
        }
        rows
    }

    fn phase_coupling(&self, branch: usize) -> Vec<ConstraintRow> {
        let gamma = &self.options.rotation;
        let mut rows = Vec::new();
        for &(row, col) in self.pairs.iter().filter(|(r, c)| r != c) {
            let (re, im) = (gamma.re(row, col), gamma.im(row, col));
            for step in self.model.time_steps() {
                let p_own = self.var(flow(Power::Active, branch, row, row, step));
                let q_own = self.var(flow(Power::Reactive, branch, row, row, step));
                let p_pair = self.var(flow(Power::Active, branch, row, col, step));
                let q_pair = self.var(flow(Power::Reactive, branch, row, col, step));
                // P_rc = Re(Γ)·P_rr − Im(Γ)·Q_rr
                rows.push(ConstraintRow::equal(
                    format!("couple_p[{},{row},{col},t{step}]", self.branch_id(branch)),
                    LinearExpr::new()
                        .term(p_pair, 1.0)
                        .term(p_own, -re)
                        .term(q_own, im),
                    0.0,
                ));
                // Q_rc = Re(Γ)·Q_rr + Im(Γ)·P_rr
                rows.push(ConstraintRow::equal(
                    format!("couple_q[{},{row},{col},t{step}]", self.branch_id(branch)),
                    LinearExpr::new()
                        .term(q_pair, 1.0)
                        .term(q_own, -re)
                        .term(p_own, -im),
                    0.0,
                ));
            }
        }
        rows
    }

    fn smoothing(&self, node: usize) -> Vec<ConstraintRow> {
        if self.loads[node].is_none() {
            return Vec::new();
        }
        let mut rows = Vec::new();
        for step in self.model.time_steps().skip(1) {
            let toggle = self.var(VarKey::Toggle { node, step });
            let current = self.var(VarKey::Status { node, step });
            let previous = self.var(VarKey::Status {
                node,
                step: step - 1,
            });
            for (tag, sign) in [("up", 1.0), ("down", -1.0)] {
                rows.push(ConstraintRow::at_least(
                    format!("smooth_{tag}[{},t{step}]", self.node_id(node)),
                    LinearExpr::new()
                        .term(toggle, 1.0)
                        .term(current, -sign)
                        .term(previous, sign),
                    0.0,
                ));
            }
        }
        rows
    }
}

fn flow(power: Power, branch: usize, row: Phase, col: Phase, step: usize) -> VarKey {
    VarKey::Flow {
        power,
        branch,
        row,
        col,
        step,
    }
}

fn voltage(node: usize, row: Phase, col: Phase, step: usize) -> VarKey {
    VarKey::VoltageSq {
        node,
        row,
        col,
        step,
    }
}

/// Expands `count` entities and concatenates their rows in entity order.
#[cfg(feature = "parallel")]
fn per_entity<F>(count: usize, rows_for: F) -> Vec<ConstraintRow>
where
    F: Fn(usize) -> Vec<ConstraintRow> + Sync + Send,
{
    use rayon::prelude::*;

    let buffers: Vec<Vec<ConstraintRow>> = (0..count).into_par_iter().map(rows_for).collect();
    buffers.into_iter().flatten().collect()
}

/// Expands `count` entities and concatenates their rows in entity order.
#[cfg(not(feature = "parallel"))]
fn per_entity<F>(count: usize, rows_for: F) -> Vec<ConstraintRow>
where
    F: Fn(usize) -> Vec<ConstraintRow>,
{
    (0..count).flat_map(rows_for).collect()
}
