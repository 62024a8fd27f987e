//! Serde schema for feeder documents as they arrive on disk.
//!
//! Every field is optional so that a malformed document still parses and the
//! validator can report everything that is wrong with it in one pass.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::phase::Phase;
use crate::{BranchId, NodeId};

/// Top-level wrapper: `{ "network": { ... } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkDocument {
    pub network: Option<RawNetwork>,
}

impl NetworkDocument {
    pub fn from_json_str(contents: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_value(value: serde_json::Value) -> CoreResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Reads and parses a JSON document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNetwork {
    pub nodes: Option<Vec<RawNode>>,
    pub branches: Option<Vec<RawBranch>>,
    pub parameters: Option<RawParameters>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNode {
    pub id: Option<NodeId>,
    pub load: Option<RawLoad>,
}

/// A load is either one record for the whole horizon or one record per step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLoad {
    Profile(Vec<RawLoadRecord>),
    Static(RawLoadRecord),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLoadRecord {
    /// 1-based step this record applies to (time-series form only).
    pub time_step: Option<i64>,
    #[serde(rename = "P_forecasted")]
    pub p_forecasted: Option<PhaseQuantity>,
    #[serde(rename = "Q_forecasted")]
    pub q_forecasted: Option<PhaseQuantity>,
    #[serde(rename = "P_guaranteed")]
    pub p_guaranteed: Option<PhaseQuantity>,
    #[serde(rename = "Q_guaranteed")]
    pub q_guaranteed: Option<PhaseQuantity>,
}

/// A per-phase quantity given either as one scalar for all phases or as
/// an `{a, b, c}` object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhaseQuantity {
    Uniform(f64),
    PerPhase(PhaseEntries),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseEntries {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub c: Option<f64>,
}

impl PhaseQuantity {
    pub fn get(&self, phase: Phase) -> Option<f64> {
        match self {
            PhaseQuantity::Uniform(value) => Some(*value),
            PhaseQuantity::PerPhase(entries) => match phase {
                Phase::A => entries.a,
                Phase::B => entries.b,
                Phase::C => entries.c,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBranch {
    pub id: Option<BranchId>,
    pub from: Option<NodeId>,
    pub to: Option<NodeId>,
    pub impedance: Option<RawImpedance>,
    pub thermal_limit: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawImpedance {
    #[serde(rename = "R")]
    pub r: Option<Vec<Vec<f64>>>,
    #[serde(rename = "X")]
    pub x: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawParameters {
    pub time_steps: Option<i64>,
    /// Active phase labels; all three when absent.
    pub phases: Option<Vec<String>>,
    pub voltage_limits: Option<RawVoltageLimits>,
    /// Reference node; inferred from topology when absent.
    pub slack_node: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawVoltageLimits {
    pub min: Option<f64>,
    pub max: Option<f64>,
}
