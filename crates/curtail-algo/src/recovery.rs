//! Phasor recovery by forward sweep from the slack node.
//!
//! The optimization works on squared magnitudes and linearized flows. This
//! pass turns the solved branch flows back into complex node voltages and
//! branch currents so that the linearization error can be inspected.

use std::collections::VecDeque;
use std::f64::consts::PI;

use curtail_core::{NetworkModel, Phase, PhaseCoupling};
use num_complex::Complex64;
use tracing::{debug, info};

use crate::error::RecoveryError;
use crate::formulation::{FormulationOptions, Power, VarKey};
use crate::solve::Solution;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryOptions {
    /// Slack voltage magnitude (p.u.).
    pub slack_voltage: f64,
    /// Must match the formulation that produced the solution.
    pub phase_coupling: PhaseCoupling,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            slack_voltage: 1.0,
            phase_coupling: PhaseCoupling::Full,
        }
    }
}

impl From<&FormulationOptions> for RecoveryOptions {
    fn from(options: &FormulationOptions) -> Self {
        Self {
            slack_voltage: options.slack_voltage,
            phase_coupling: options.phase_coupling,
        }
    }
}

/// Recovered phasors for one time step. Inactive phases stay at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PhasorSnapshot {
    pub step: usize,
    /// Node voltages, indexed like [`NetworkModel::nodes`].
    pub voltages: Vec<[Complex64; 3]>,
    /// Branch currents, indexed like [`NetworkModel::branches`].
    pub currents: Vec<[Complex64; 3]>,
    /// Largest `| |V|² − u |` over all nodes and active phases.
    pub max_voltage_gap: f64,
}

impl PhasorSnapshot {
    pub fn voltage(&self, node: usize, phase: Phase) -> Complex64 {
        self.voltages[node][phase.index()]
    }

    pub fn current(&self, branch: usize, phase: Phase) -> Complex64 {
        self.currents[branch][phase.index()]
    }
}

/// Angle of each phase at the slack: 0°, −120°, +120°.
fn slack_angles() -> [f64; 3] {
    [0.0, -2.0 * PI / 3.0, 2.0 * PI / 3.0]
}

/// Recovers voltages and currents for every step of the horizon.
pub fn recover(
    model: &NetworkModel,
    solution: &Solution,
    options: &RecoveryOptions,
) -> Result<Vec<PhasorSnapshot>, RecoveryError> {
    let snapshots = model
        .time_steps()
        .map(|step| sweep(model, solution, options, step))
        .collect::<Result<Vec<_>, _>>()?;
    let worst = snapshots
        .iter()
        .map(|s| s.max_voltage_gap)
        .fold(0.0_f64, f64::max);
    info!(
        steps = snapshots.len(),
        max_voltage_gap = worst,
        "recovered voltage phasors"
    );
    Ok(snapshots)
}

fn sweep(
    model: &NetworkModel,
    solution: &Solution,
    options: &RecoveryOptions,
    step: usize,
) -> Result<PhasorSnapshot, RecoveryError> {
    let phases = model.phases();
    let node_count = model.nodes().len();
    let zero = [Complex64::new(0.0, 0.0); 3];
    let mut voltages = vec![zero; node_count];
    let mut currents = vec![zero; model.branches().len()];
    let mut visited = vec![false; node_count];

    let slack = model.slack();
    let angles = slack_angles();
    for &phase in phases {
        voltages[slack][phase.index()] =
            Complex64::from_polar(options.slack_voltage, angles[phase.index()]);
    }
    visited[slack] = true;

    let mut queue = VecDeque::new();
    queue.push_back(slack);
    while let Some(node) = queue.pop_front() {
        for &b in model.outgoing(node) {
            let branch = &model.branches()[b];
            if visited[branch.to] {
                continue;
            }
            let v_from = voltages[branch.from];
            let flows = complex_flows(solution, b, step, phases, options.phase_coupling);

            let mut current = zero;
            for &q in phases {
                current[q.index()] = match options.phase_coupling {
                    PhaseCoupling::DiagonalOnly => {
                        divide_conj(flows[q.index()][q.index()], v_from[q.index()])
                    }
                    PhaseCoupling::Full => {
                        let total: Complex64 = phases
                            .iter()
                            .map(|p| divide_conj(flows[p.index()][q.index()], v_from[p.index()]))
                            .sum();
                        total / phases.len() as f64
                    }
                };
            }

            let mut v_to = zero;
            for &p in phases {
                let mut drop = Complex64::new(0.0, 0.0);
                for &q in phases {
                    if options.phase_coupling == PhaseCoupling::DiagonalOnly && p != q {
                        continue;
                    }
                    let z = Complex64::new(
                        branch.impedance.r.get(p, q),
                        branch.impedance.x.get(p, q),
                    );
                    drop += z * current[q.index()];
                }
                v_to[p.index()] = v_from[p.index()] - drop;
            }

            currents[b] = current;
            voltages[branch.to] = v_to;
            visited[branch.to] = true;
            queue.push_back(branch.to);
        }
    }

    let unreached: Vec<_> = visited
        .iter()
        .enumerate()
        .filter(|(_, seen)| !**seen)
        .map(|(idx, _)| model.nodes()[idx].id.clone())
        .collect();
    if !unreached.is_empty() {
        return Err(RecoveryError::Disconnected {
            slack: model.slack_node().id.clone(),
            step,
            unreached,
        });
    }

    let mut max_voltage_gap = 0.0_f64;
    for (node, phasors) in voltages.iter().enumerate() {
        for &phase in phases {
            let solved = solution
                .value(&VarKey::VoltageSq {
                    node,
                    row: phase,
                    col: phase,
                    step,
                })
                .unwrap_or(0.0);
            let gap = (phasors[phase.index()].norm_sqr() - solved).abs();
            max_voltage_gap = max_voltage_gap.max(gap);
        }
    }
    debug!(step, max_voltage_gap, "forward sweep complete");

    Ok(PhasorSnapshot {
        step,
        voltages,
        currents,
        max_voltage_gap,
    })
}

/// Complex flow matrix `P + jQ` for one branch. Pairs outside the
/// formulation, and values the solution lacks, read as zero.
fn complex_flows(
    solution: &Solution,
    branch: usize,
    step: usize,
    phases: &[Phase],
    coupling: PhaseCoupling,
) -> [[Complex64; 3]; 3] {
    let mut flows = [[Complex64::new(0.0, 0.0); 3]; 3];
    for &row in phases {
        for &col in phases {
            if coupling == PhaseCoupling::DiagonalOnly && row != col {
                continue;
            }
            let read = |power| {
                solution
                    .value(&VarKey::Flow {
                        power,
                        branch,
                        row,
                        col,
                        step,
                    })
                    .unwrap_or(0.0)
            };
            flows[row.index()][col.index()] =
                Complex64::new(read(Power::Active), read(Power::Reactive));
        }
    }
    flows
}

/// `conj(s / v)`, or zero when the voltage has collapsed.
fn divide_conj(s: Complex64, v: Complex64) -> Complex64 {
    if v.norm_sqr() == 0.0 {
        Complex64::new(0.0, 0.0)
    } else {
        (s / v).conj()
    }
}
