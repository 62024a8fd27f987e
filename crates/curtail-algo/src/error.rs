//! Error types for the build, solve and recovery stages.

use curtail_core::{CoreError, NodeId, ValidationError};
use curtail_solver_common::SolverError;
use thiserror::Error;

/// The network model and the formulation options disagree.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulationError {
    /// A loaded node has no record for a step of the horizon.
    #[error("node {node} has no load record for time step {step}")]
    MissingLoadRecord { node: NodeId, step: usize },

    /// A loaded node has more than one record for a step.
    #[error("node {node} has {count} load records for time step {step}; expected exactly one")]
    DuplicateLoadRecord {
        node: NodeId,
        step: usize,
        count: usize,
    },

    /// The document's load form does not match the configured profile.
    #[error("node {node} has a {found} load but the study expects {expected} loads")]
    LoadProfileMismatch {
        node: NodeId,
        expected: &'static str,
        found: &'static str,
    },

    /// An option value the builder cannot use.
    #[error("invalid formulation option: {0}")]
    InvalidOption(String),
}

/// The phasor sweep could not reach every node from the slack.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecoveryError {
    #[error("network is disconnected: {} node(s) unreachable from slack node {slack} at time step {step}: {}", .unreached.len(), join_ids(.unreached))]
    Disconnected {
        slack: NodeId,
        step: usize,
        unreached: Vec<NodeId>,
    },
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter().map(NodeId::to_string).collect::<Vec<_>>().join(", ")
}

/// Any failure along validate → build → solve → recover.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid study configuration: {0}")]
    Config(#[from] CoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Formulation(#[from] FormulationError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),
}

impl PipelineError {
    /// Short stage label for reports.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Validation(_) => "validation",
            PipelineError::Formulation(_) => "formulation",
            PipelineError::Solver(_) => "solve",
            PipelineError::Recovery(_) => "recovery",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_lists_unreached_nodes() {
        let err = RecoveryError::Disconnected {
            slack: NodeId::new("1"),
            step: 2,
            unreached: vec![NodeId::new("4"), NodeId::new("5")],
        };
        let text = err.to_string();
        assert!(text.contains("2 node(s)"));
        assert!(text.contains("4, 5"));
    }

    #[test]
    fn pipeline_error_keeps_the_stage() {
        let err: PipelineError = SolverError::Unbounded.into();
        assert_eq!(err.stage(), "solve");
        let err: PipelineError = FormulationError::MissingLoadRecord {
            node: NodeId::new("3"),
            step: 2,
        }
        .into();
        assert_eq!(err.stage(), "formulation");
        assert!(err.to_string().contains("time step 2"));
    }
}
