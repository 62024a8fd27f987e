use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use curtail_algo::{FormulationOptions, ProblemBuilder};
use curtail_cli::StudyArgs;
use tabwriter::TabWriter;
use tracing::info;

use super::study::{load_model, resolve_config};

pub fn handle(file: &Path, out: Option<&Path>, study: &StudyArgs) -> Result<()> {
    let config = resolve_config(study)?;
    let model = load_model(file)?;
    let options = FormulationOptions::from_config(&config);
    let formulation = ProblemBuilder::new(&model, options)
        .build()
        .with_context(|| format!("formulating {}", file.display()))?;
    let json = formulation
        .to_json_pretty()
        .context("serializing formulation to JSON")?;

    let Some(out) = out else {
        println!("{json}");
        return Ok(());
    };

    fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
    info!("Formulation written to {}", out.display());

    let summary = formulation.summary();
    let mut writer = TabWriter::new(io::stdout()).padding(2);
    writeln!(writer, "Variables\t{}", summary.variables)?;
    writeln!(writer, "Binary variables\t{}", summary.binary_variables)?;
    writeln!(writer, "Rows\t{}", summary.rows)?;
    for (family, rows) in &summary.rows_per_family {
        writeln!(writer, "  {family}\t{rows}")?;
    }
    writer.flush()?;
    Ok(())
}
