use std::io;
use std::process::ExitCode;

use clap::Parser;
use curtail_cli::{Cli, Commands};
use tracing::error;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Validate { file } => commands::validate::handle(file),
        Commands::Formulate { file, out, study } => {
            commands::formulate::handle(file, out.as_deref(), study)
        }
        Commands::Run {
            file,
            study,
            solver,
            time_limit,
            format,
        } => commands::run::handle(file, study, solver.as_deref(), *time_limit, *format),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(cli.log_level).into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {err}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
