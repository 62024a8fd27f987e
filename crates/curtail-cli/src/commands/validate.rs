use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Result};
use curtail_core::NetworkModel;
use tabwriter::TabWriter;

use super::study::load_document;

pub fn handle(file: &Path) -> Result<()> {
    let document = load_document(file)?;
    match NetworkModel::from_document(&document) {
        Ok(model) => {
            println!(
                "{} is valid: {} nodes, {} branches, {} phases, {} time steps, slack node {}",
                file.display(),
                model.nodes().len(),
                model.branches().len(),
                model.phases().len(),
                model.parameters().time_steps,
                model.slack_node().id
            );
            Ok(())
        }
        Err(err) => {
            let mut writer = TabWriter::new(io::stdout());
            writeln!(writer, "RULE\tENTITY\tMESSAGE")?;
            for issue in &err.issues {
                writeln!(
                    writer,
                    "{}\t{}\t{}",
                    issue.rule,
                    issue.entity.as_deref().unwrap_or("-"),
                    issue.message
                )?;
            }
            writer.flush()?;
            bail!("{} failed validation with {} issue(s)", file.display(), err.issues.len())
        }
    }
}
