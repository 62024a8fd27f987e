use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use curtail_core::{LoadProfileKind, PhaseCoupling};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Curtailment scheduling for congested radial feeders", long_about = None)]
pub struct Cli {
    /// Set the logging level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a network document and list every problem found
    Validate {
        /// Network document (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Build the optimization problem without solving it
    Formulate {
        /// Network document (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Write the formulation JSON here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        #[command(flatten)]
        study: StudyArgs,
    },
    /// Validate, formulate, solve and recover phasors
    Run {
        /// Network document (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[command(flatten)]
        study: StudyArgs,
        /// Solver backend (microlp, clarabel, highs)
        #[arg(long)]
        solver: Option<String>,
        /// Wall-clock limit for the solve in seconds
        #[arg(long)]
        time_limit: Option<f64>,
        /// Output format for the report
        #[arg(long, value_enum, default_value_t = RunFormat::Plain)]
        format: RunFormat,
    },
}

/// Flags that override the study configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct StudyArgs {
    /// Study configuration (TOML)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Phase coupling: full or diagonal_only
    #[arg(long)]
    pub coupling: Option<PhaseCoupling>,
    /// Load profile form: static or time_series
    #[arg(long)]
    pub load_profile: Option<LoadProfileKind>,
    /// Solve the continuous relaxation instead of the MILP
    #[arg(long)]
    pub relaxed: bool,
    /// Penalty on status changes between consecutive steps
    #[arg(long)]
    pub smoothing_weight: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RunFormat {
    Plain,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn run_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "curtail-cli",
            "run",
            "feeder.json",
            "--coupling",
            "diagonal",
            "--load-profile",
            "time-series",
            "--relaxed",
            "--solver",
            "microlp",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Run {
            study,
            solver,
            format,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(study.coupling, Some(PhaseCoupling::DiagonalOnly));
        assert_eq!(study.load_profile, Some(LoadProfileKind::TimeSeries));
        assert!(study.relaxed);
        assert_eq!(solver.as_deref(), Some("microlp"));
        assert_eq!(format, RunFormat::Json);
    }

    #[test]
    fn unknown_coupling_is_rejected() {
        let err = Cli::try_parse_from(["curtail-cli", "formulate", "f.json", "--coupling", "x"])
            .unwrap_err();
        assert!(err.to_string().contains("diagonal_only"));
    }
}
