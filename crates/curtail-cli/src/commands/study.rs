use std::path::Path;

use anyhow::{Context, Result};
use curtail_cli::StudyArgs;
use curtail_core::{CurtailmentKind, NetworkDocument, NetworkModel, StudyConfig};
use tracing::info;

/// Config file (if any) with command-line overrides applied on top.
pub fn resolve_config(args: &StudyArgs) -> Result<StudyConfig> {
    let mut config = match &args.config {
        Some(path) => StudyConfig::load_from(path)
            .with_context(|| format!("loading study config {}", path.display()))?,
        None => StudyConfig::default(),
    };
    if let Some(coupling) = args.coupling {
        config.formulation.phase_coupling = coupling;
    }
    if let Some(profile) = args.load_profile {
        config.formulation.load_profile = profile;
    }
    if args.relaxed {
        config.formulation.curtailment = CurtailmentKind::Relaxed;
    }
    if let Some(weight) = args.smoothing_weight {
        config.formulation.smoothing_weight = weight;
    }
    config.check().context("checking study options")?;
    Ok(config)
}

pub fn load_document(path: &Path) -> Result<NetworkDocument> {
    info!("Loading network document {}", path.display());
    NetworkDocument::from_path(path).with_context(|| format!("reading {}", path.display()))
}

pub fn load_model(path: &Path) -> Result<NetworkModel> {
    let document = load_document(path)?;
    NetworkModel::from_document(&document).with_context(|| format!("validating {}", path.display()))
}
