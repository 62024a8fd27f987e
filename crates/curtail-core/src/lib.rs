//! # curtail-core: Feeder model for curtailment studies
//!
//! Provides the data structures shared by every stage of a three-phase
//! congestion-mitigation study on a radial distribution feeder.
//!
//! ## Pipeline position
//!
//! ```text
//! NetworkDocument ──validate──> NetworkModel ──> curtail-algo (build, solve, recover)
//! ```
//!
//! - [`NetworkDocument`] mirrors the JSON layout one-to-one. Every field is
//!   optional so that malformed input still parses.
//! - [`NetworkModel::from_document`] runs the validator and, if nothing is
//!   wrong, produces an immutable [`NetworkModel`] with resolved branch
//!   endpoints and a slack node.
//! - [`StudyConfig`] carries formulation, solver and recovery options.
//!
//! ## Quick Start
//!
//! ```rust
//! use curtail_core::{NetworkDocument, NetworkModel};
//!
//! let doc = NetworkDocument::from_json_str(r#"{
//!     "network": {
//!         "nodes": [ { "id": 1 }, { "id": 2, "load": {
//!             "P_forecasted": 10.0, "Q_forecasted": 2.0,
//!             "P_guaranteed": 4.0, "Q_guaranteed": 0.5 } } ],
//!         "branches": [ { "id": "1-2", "from": 1, "to": 2, "thermal_limit": 20.0,
//!             "impedance": { "R": [[0.01,0,0],[0,0.01,0],[0,0,0.01]],
//!                            "X": [[0.02,0,0],[0,0.02,0],[0,0,0.02]] } } ],
//!         "parameters": { "time_steps": 2, "voltage_limits": { "min": 0.95, "max": 1.05 } }
//!     }
//! }"#).unwrap();
//!
//! let model = NetworkModel::from_document(&doc).unwrap();
//! assert_eq!(model.slack_node().id.as_str(), "1");
//! ```
//!
//! ## ID System
//!
//! Nodes and branches are keyed by [`NodeId`] and [`BranchId`], string
//! newtypes. Documents may use integers or strings; integers are normalized
//! to their decimal form so `1` and `"1"` name the same node.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub mod config;
pub mod document;
pub mod error;
pub mod network;
pub mod phase;
pub mod validation;

pub use config::{
    CurtailmentKind, FormulationConfig, LoadProfileKind, PhaseCoupling, RecoveryConfig,
    SolverConfig, StudyConfig,
};
pub use document::NetworkDocument;
pub use error::{CoreError, CoreResult};
pub use network::{
    Branch, Impedance, LoadProfile, LoadRecord, NetworkModel, Node, Parameters, VoltageLimits,
};
pub use phase::{Phase, PhaseMatrix, PhaseValues};
pub use validation::{validate, Rule, ValidationError, ValidationIssue};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BranchId(String);

impl NodeId {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        NodeId(value.into())
    }
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl BranchId {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        BranchId(value.into())
    }
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ids arrive as JSON integers or strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Int(value) => value.to_string(),
            RawId::Text(value) => value,
        }
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| NodeId(raw.into_string()))
    }
}

impl<'de> Deserialize<'de> for BranchId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| BranchId(raw.into_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_string_ids_match() {
        let a: NodeId = serde_json::from_str("7").unwrap();
        let b: NodeId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, NodeId::new("7"));
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"7\"");
    }

    #[test]
    fn fractional_ids_are_rejected() {
        assert!(serde_json::from_str::<BranchId>("1.5").is_err());
    }
}
