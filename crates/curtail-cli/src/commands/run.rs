use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use curtail_algo::{
    CongestionStudy, CurtailmentEvent, Quantity, SolutionView, StageTimes, StudyOutcome,
};
use curtail_cli::{RunFormat, StudyArgs};
use serde::Serialize;
use tabwriter::TabWriter;

use super::study::{load_document, resolve_config};

#[derive(Debug, Serialize)]
struct RunReport {
    status: String,
    backend: &'static str,
    objective: f64,
    times: StageTimes,
    curtailments: Vec<CurtailmentEvent>,
    voltages: Vec<VoltageRow>,
    flows: Vec<FlowRow>,
}

#[derive(Debug, Serialize)]
struct VoltageRow {
    step: usize,
    node: String,
    phase: &'static str,
    /// `√u` from the linear model.
    solved: Option<f64>,
    /// Magnitude from the forward sweep.
    recovered: f64,
    angle_deg: f64,
}

#[derive(Debug, Serialize)]
struct FlowRow {
    step: usize,
    branch: String,
    phase: &'static str,
    p: Option<f64>,
    q: Option<f64>,
}

pub fn handle(
    file: &Path,
    study: &StudyArgs,
    solver: Option<&str>,
    time_limit: Option<f64>,
    format: RunFormat,
) -> Result<()> {
    let mut config = resolve_config(study)?;
    if let Some(solver) = solver {
        config.solver.backend = solver.to_string();
    }
    if let Some(limit) = time_limit {
        config.solver.time_limit_secs = Some(limit);
    }

    let document = load_document(file)?;
    let outcome = CongestionStudy::new(config)
        .context("configuring study")?
        .run(&document)
        .with_context(|| format!("running study on {}", file.display()))?;
    let report = build_report(&outcome);

    match format {
        RunFormat::Plain => print_plain(&report),
        RunFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &report)
                .map_err(|err| anyhow::anyhow!("serializing run report to JSON: {err}"))?;
            println!();
            Ok(())
        }
    }
}

fn build_report(outcome: &StudyOutcome) -> RunReport {
    let model = &outcome.model;
    let view = SolutionView::new(model, &outcome.solution);

    let mut voltages = Vec::new();
    let mut flows = Vec::new();
    for snapshot in &outcome.phasors {
        let step = snapshot.step;
        for (idx, node) in model.nodes().iter().enumerate() {
            for &phase in model.phases() {
                let phasor = snapshot.voltage(idx, phase);
                voltages.push(VoltageRow {
                    step,
                    node: node.id.to_string(),
                    phase: phase.label(),
                    solved: view.voltage_magnitude(node.id.as_str(), phase, step),
                    recovered: phasor.norm(),
                    angle_deg: phasor.arg().to_degrees(),
                });
            }
        }
        for branch in model.branches() {
            for &phase in model.phases() {
                let id = branch.id.as_str();
                flows.push(FlowRow {
                    step,
                    branch: id.to_string(),
                    phase: phase.label(),
                    p: view.value(Quantity::ActiveFlow, id, phase.into(), step),
                    q: view.value(Quantity::ReactiveFlow, id, phase.into(), step),
                });
            }
        }
    }

    RunReport {
        status: outcome.solution.status.to_string(),
        backend: outcome.solution.backend,
        objective: outcome.solution.objective,
        times: outcome.times,
        curtailments: view.curtailment_events(),
        voltages,
        flows,
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn print_plain(report: &RunReport) -> Result<()> {
    println!(
        "Objective: {:.4} ({} via {}, {} ms)",
        report.objective,
        report.status,
        report.backend,
        report.times.total_ms()
    );

    println!();
    if report.curtailments.is_empty() {
        println!("No curtailment required");
    } else {
        let mut writer = TabWriter::new(io::stdout()).padding(2);
        writeln!(writer, "STEP\tNODE\tSTATUS")?;
        for event in &report.curtailments {
            writeln!(writer, "{}\t{}\t{:.3}", event.step, event.node, event.level)?;
        }
        writer.flush()?;
    }

    println!();
    let mut writer = TabWriter::new(io::stdout()).padding(2);
    writeln!(writer, "STEP\tNODE\tPHASE\t|V| SOLVED\t|V| RECOVERED\tANGLE")?;
    for row in &report.voltages {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{:.4}\t{:.2}",
            row.step,
            row.node,
            row.phase,
            fmt_opt(row.solved),
            row.recovered,
            row.angle_deg
        )?;
    }
    writer.flush()?;

    println!();
    let mut writer = TabWriter::new(io::stdout()).padding(2);
    writeln!(writer, "STEP\tBRANCH\tPHASE\tP\tQ")?;
    for row in &report.flows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            row.step,
            row.branch,
            row.phase,
            fmt_opt(row.p),
            fmt_opt(row.q)
        )?;
    }
    writer.flush()?;
    Ok(())
}
