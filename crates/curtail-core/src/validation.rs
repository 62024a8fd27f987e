//! Structural and physical checks that turn a [`NetworkDocument`] into a
//! [`NetworkModel`].
//!
//! Checks run in a fixed order and every violation is collected:
//!
//! 1. Presence of `network`, `nodes`, `branches`, `parameters`
//! 2. Parameters (horizon, phases, voltage band)
//! 3. Nodes and their load records (`guaranteed < forecasted` on every active phase)
//! 4. Branches (impedance shape, non-negative resistance, endpoints, thermal limit)
//! 5. Topology (slack node, no cycles)
//!
//! Connectivity from the slack node is not checked here; the phasor sweep
//! reports unreachable nodes after solving.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::algo::is_cyclic_undirected;
use petgraph::graph::UnGraph;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::{
    NetworkDocument, PhaseQuantity, RawBranch, RawLoad, RawLoadRecord, RawNode, RawParameters,
};
use crate::network::{
    Branch, Impedance, LoadProfile, LoadRecord, NetworkModel, Node, Parameters, VoltageLimits,
};
use crate::phase::{Phase, PhaseMatrix, PhaseValues};
use crate::NodeId;

/// The invariant an issue violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    MissingSection,
    MissingField,
    InvalidParameter,
    DuplicateId,
    GuaranteedNotBelowForecast,
    TimeStepOutOfRange,
    ImpedanceShape,
    NegativeResistance,
    UnknownNode,
    InvalidThermalLimit,
    SlackUndetermined,
    NotRadial,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::MissingSection => "missing_section",
            Rule::MissingField => "missing_field",
            Rule::InvalidParameter => "invalid_parameter",
            Rule::DuplicateId => "duplicate_id",
            Rule::GuaranteedNotBelowForecast => "guaranteed_not_below_forecast",
            Rule::TimeStepOutOfRange => "time_step_out_of_range",
            Rule::ImpedanceShape => "impedance_shape",
            Rule::NegativeResistance => "negative_resistance",
            Rule::UnknownNode => "unknown_node",
            Rule::InvalidThermalLimit => "invalid_thermal_limit",
            Rule::SlackUndetermined => "slack_undetermined",
            Rule::NotRadial => "not_radial",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single violated invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub rule: Rule,
    /// Offending entity (e.g. "node 3", "branch 2-3"), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

/// Every issue found in a document. Never empty.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("network validation failed with {} issue(s): {}", .issues.len(), summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn has_rule(&self, rule: Rule) -> bool {
        self.issues.iter().any(|issue| issue.rule == rule)
    }

    pub fn issues_for(&self, rule: Rule) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.rule == rule)
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks a document without keeping the model.
pub fn validate(document: &NetworkDocument) -> Result<(), ValidationError> {
    NetworkModel::from_document(document).map(|_| ())
}

impl NetworkModel {
    /// Validates `document` and builds the immutable model in one pass.
    pub fn from_document(document: &NetworkDocument) -> Result<NetworkModel, ValidationError> {
        let mut v = Validator::default();

        let Some(network) = document.network.as_ref() else {
            v.push(
                Rule::MissingSection,
                None,
                "document has no `network` section",
            );
            return Err(v.into_error());
        };
        if network.nodes.is_none() {
            v.push(Rule::MissingSection, None, "network has no `nodes` section");
        }
        if network.branches.is_none() {
            v.push(Rule::MissingSection, None, "network has no `branches` section");
        }
        if network.parameters.is_none() {
            v.push(
                Rule::MissingSection,
                None,
                "network has no `parameters` section",
            );
        }

        let params = network
            .parameters
            .as_ref()
            .map(|raw| v.check_parameters(raw))
            .unwrap_or_default();

        let nodes = v.check_nodes(
            network.nodes.as_deref().unwrap_or_default(),
            &params.phases,
            params.time_steps,
        );
        let node_index: HashMap<&NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (&node.id, idx))
            .collect();

        let branches = v.check_branches(network.branches.as_deref().unwrap_or_default(), &node_index);

        let slack = if nodes.is_empty() {
            None
        } else {
            v.check_topology(&nodes, &branches, &node_index, params.slack.as_ref())
        };

        if !v.issues.is_empty() {
            return Err(v.into_error());
        }

        let (Some(time_steps), Some(voltage_limits), Some(slack)) =
            (params.time_steps, params.voltage_limits, slack)
        else {
            v.push(
                Rule::MissingSection,
                None,
                "network has no nodes to build a model from",
            );
            return Err(v.into_error());
        };

        info!(
            nodes = nodes.len(),
            branches = branches.len(),
            time_steps,
            "validated network"
        );

        Ok(NetworkModel::assemble(
            nodes,
            branches,
            Parameters {
                time_steps,
                phases: params.phases,
                voltage_limits,
            },
            slack,
        ))
    }
}

#[derive(Debug)]
struct CheckedParameters {
    time_steps: Option<usize>,
    phases: Vec<Phase>,
    voltage_limits: Option<VoltageLimits>,
    slack: Option<NodeId>,
}

impl Default for CheckedParameters {
    fn default() -> Self {
        Self {
            time_steps: None,
            phases: Phase::ALL.to_vec(),
            voltage_limits: None,
            slack: None,
        }
    }
}

#[derive(Debug, Default)]
struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    fn push(&mut self, rule: Rule, entity: Option<&str>, message: impl Into<String>) {
        let issue = ValidationIssue {
            rule,
            entity: entity.map(str::to_string),
            message: message.into(),
        };
        debug!(rule = %issue.rule, entity = ?issue.entity, "{}", issue.message);
        self.issues.push(issue);
    }

    fn into_error(self) -> ValidationError {
        ValidationError {
            issues: self.issues,
        }
    }

    fn check_parameters(&mut self, raw: &RawParameters) -> CheckedParameters {
        let entity = Some("parameters");
        let mut checked = CheckedParameters {
            slack: raw.slack_node.clone(),
            ..CheckedParameters::default()
        };

        match raw.time_steps {
            None => self.push(Rule::MissingField, entity, "`time_steps` is missing"),
            Some(t) if t < 1 => self.push(
                Rule::InvalidParameter,
                entity,
                format!("`time_steps` must be at least 1, got {t}"),
            ),
            Some(t) => checked.time_steps = Some(t as usize),
        }

        if let Some(labels) = &raw.phases {
            let mut phases = Vec::with_capacity(labels.len());
            for label in labels {
                match label.parse::<Phase>() {
                    Ok(phase) if phases.contains(&phase) => self.push(
                        Rule::InvalidParameter,
                        entity,
                        format!("phase '{phase}' listed more than once"),
                    ),
                    Ok(phase) => phases.push(phase),
                    Err(err) => self.push(Rule::InvalidParameter, entity, err),
                }
            }
            if labels.is_empty() {
                self.push(Rule::InvalidParameter, entity, "`phases` must not be empty");
            }
            if !phases.is_empty() {
                phases.sort();
                checked.phases = phases;
            }
        }

        match &raw.voltage_limits {
            None => self.push(Rule::MissingField, entity, "`voltage_limits` is missing"),
            Some(limits) => match (limits.min, limits.max) {
                (Some(min), Some(max)) => {
                    if !(min > 0.0 && min < max && max.is_finite()) {
                        self.push(
                            Rule::InvalidParameter,
                            entity,
                            format!("voltage limits must satisfy 0 < min < max, got [{min}, {max}]"),
                        );
                    } else {
                        checked.voltage_limits = Some(VoltageLimits { min, max });
                    }
                }
                (min, max) => {
                    if min.is_none() {
                        self.push(Rule::MissingField, entity, "`voltage_limits.min` is missing");
                    }
                    if max.is_none() {
                        self.push(Rule::MissingField, entity, "`voltage_limits.max` is missing");
                    }
                }
            },
        }

        checked
    }

    fn check_nodes(
        &mut self,
        raw_nodes: &[RawNode],
        phases: &[Phase],
        time_steps: Option<usize>,
    ) -> Vec<Node> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(raw_nodes.len());

        for (position, raw) in raw_nodes.iter().enumerate() {
            let Some(id) = raw.id.clone() else {
                let label = format!("node #{}", position + 1);
                self.push(Rule::MissingField, Some(&label), "node has no `id`");
                continue;
            };
            let entity = format!("node {id}");
            if !seen.insert(id.clone()) {
                self.push(Rule::DuplicateId, Some(&entity), "node id appears more than once");
                continue;
            }

            let load = match &raw.load {
                None => None,
                Some(RawLoad::Static(record)) => self
                    .check_load_record(record, &entity, phases)
                    .map(LoadProfile::Static),
                Some(RawLoad::Profile(records)) => {
                    self.check_profile(records, &entity, phases, time_steps)
                }
            };
            // A node whose load failed its checks is dropped; the issues
            // already recorded make the whole document fail.
            if raw.load.is_some() && load.is_none() {
                continue;
            }
            nodes.push(Node { id, load });
        }

        nodes
    }

    fn check_profile(
        &mut self,
        records: &[RawLoadRecord],
        entity: &str,
        phases: &[Phase],
        time_steps: Option<usize>,
    ) -> Option<LoadProfile> {
        if records.is_empty() {
            self.push(
                Rule::MissingField,
                Some(entity),
                "time-series load has no records",
            );
            return None;
        }

        let mut profile = Vec::with_capacity(records.len());
        let mut ok = true;
        for record in records {
            let step = match record.time_step {
                None => {
                    self.push(
                        Rule::MissingField,
                        Some(entity),
                        "time-series load record has no `time_step`",
                    );
                    None
                }
                Some(step) if step < 1 || time_steps.is_some_and(|t| step as usize > t) => {
                    self.push(
                        Rule::TimeStepOutOfRange,
                        Some(entity),
                        format!(
                            "time_step {step} is outside the horizon 1..={}",
                            time_steps.unwrap_or_default()
                        ),
                    );
                    None
                }
                Some(step) => Some(step as usize),
            };
            let checked = self.check_load_record(record, entity, phases);
            match (step, checked) {
                (Some(step), Some(checked)) => profile.push((step, checked)),
                _ => ok = false,
            }
        }

        ok.then_some(LoadProfile::TimeSeries(profile))
    }

    fn check_load_record(
        &mut self,
        record: &RawLoadRecord,
        entity: &str,
        phases: &[Phase],
    ) -> Option<LoadRecord> {
        let step_suffix = record
            .time_step
            .map(|t| format!(" at time_step {t}"))
            .unwrap_or_default();

        let fields = [
            ("P_forecasted", record.p_forecasted),
            ("Q_forecasted", record.q_forecasted),
            ("P_guaranteed", record.p_guaranteed),
            ("Q_guaranteed", record.q_guaranteed),
        ];
        let mut values = [PhaseValues::default(); 4];
        let mut complete = true;
        for (slot, (name, quantity)) in fields.iter().enumerate() {
            match quantity {
                None => {
                    self.push(
                        Rule::MissingField,
                        Some(entity),
                        format!("load record is missing `{name}`{step_suffix}"),
                    );
                    complete = false;
                }
                Some(quantity) => {
                    complete &= self.collect_phases(quantity, name, entity, phases, &mut values[slot]);
                }
            }
        }
        if !complete {
            return None;
        }

        let [p_forecasted, q_forecasted, p_guaranteed, q_guaranteed] = values;
        let mut ordered = true;
        for &phase in phases {
            for (kind, guaranteed, forecasted) in [
                ("P", p_guaranteed[phase], p_forecasted[phase]),
                ("Q", q_guaranteed[phase], q_forecasted[phase]),
            ] {
                // Written so that NaN also fails.
                if !(guaranteed < forecasted) {
                    self.push(
                        Rule::GuaranteedNotBelowForecast,
                        Some(entity),
                        format!(
                            "{kind}_guaranteed ({guaranteed}) must be below {kind}_forecasted ({forecasted}) on phase {phase}{step_suffix}"
                        ),
                    );
                    ordered = false;
                }
            }
        }

        ordered.then_some(LoadRecord {
            p_forecasted,
            q_forecasted,
            p_guaranteed,
            q_guaranteed,
        })
    }

    fn collect_phases(
        &mut self,
        quantity: &PhaseQuantity,
        name: &str,
        entity: &str,
        phases: &[Phase],
        out: &mut PhaseValues,
    ) -> bool {
        let mut complete = true;
        for &phase in phases {
            match quantity.get(phase) {
                Some(value) => out[phase] = value,
                None => {
                    self.push(
                        Rule::MissingField,
                        Some(entity),
                        format!("`{name}` has no value for phase {phase}"),
                    );
                    complete = false;
                }
            }
        }
        complete
    }

    fn check_branches(
        &mut self,
        raw_branches: &[RawBranch],
        node_index: &HashMap<&NodeId, usize>,
    ) -> Vec<Branch> {
        let mut seen = HashSet::new();
        let mut branches = Vec::with_capacity(raw_branches.len());

        for (position, raw) in raw_branches.iter().enumerate() {
            let entity = match &raw.id {
                Some(id) => format!("branch {id}"),
                None => format!("branch #{}", position + 1),
            };
            let mut ok = true;

            match &raw.id {
                None => {
                    self.push(Rule::MissingField, Some(&entity), "branch has no `id`");
                    ok = false;
                }
                Some(id) if !seen.insert(id.clone()) => {
                    self.push(
                        Rule::DuplicateId,
                        Some(&entity),
                        "branch id appears more than once",
                    );
                    ok = false;
                }
                Some(_) => {}
            }

            let impedance = self.check_impedance(raw, &entity);
            ok &= impedance.is_some();

            let from = self.resolve_endpoint(raw.from.as_ref(), "from", &entity, node_index);
            let to = self.resolve_endpoint(raw.to.as_ref(), "to", &entity, node_index);

            let thermal_limit = match raw.thermal_limit {
                None => {
                    self.push(
                        Rule::MissingField,
                        Some(&entity),
                        "branch has no `thermal_limit`",
                    );
                    None
                }
                Some(limit) if !(limit > 0.0 && limit.is_finite()) => {
                    self.push(
                        Rule::InvalidThermalLimit,
                        Some(&entity),
                        format!("thermal limit must be positive and finite, got {limit}"),
                    );
                    None
                }
                Some(limit) => Some(limit),
            };

            if let (true, Some(id), Some(impedance), Some(from), Some(to), Some(thermal_limit)) =
                (ok, raw.id.clone(), impedance, from, to, thermal_limit)
            {
                branches.push(Branch {
                    id,
                    from,
                    to,
                    impedance,
                    thermal_limit,
                });
            }
        }

        branches
    }

    fn check_impedance(&mut self, raw: &RawBranch, entity: &str) -> Option<Impedance> {
        let Some(impedance) = &raw.impedance else {
            self.push(Rule::MissingField, Some(entity), "branch has no `impedance`");
            return None;
        };

        let r = self.check_matrix(impedance.r.as_deref(), "R", entity);
        let x = self.check_matrix(impedance.x.as_deref(), "X", entity);

        if let Some(r) = &r {
            let mut negative = false;
            for (row, col, value) in r.entries() {
                if value < 0.0 {
                    self.push(
                        Rule::NegativeResistance,
                        Some(entity),
                        format!("R[{row}][{col}] = {value} is negative"),
                    );
                    negative = true;
                }
            }
            if negative {
                return None;
            }
        }

        Some(Impedance { r: r?, x: x? })
    }

    fn check_matrix(&mut self, rows: Option<&[Vec<f64>]>, name: &str, entity: &str) -> Option<PhaseMatrix> {
        let Some(rows) = rows else {
            self.push(
                Rule::MissingField,
                Some(entity),
                format!("impedance has no `{name}` matrix"),
            );
            return None;
        };
        let matrix = PhaseMatrix::from_rows(rows);
        if matrix.is_none() {
            let shape: Vec<String> = rows.iter().map(|row| row.len().to_string()).collect();
            self.push(
                Rule::ImpedanceShape,
                Some(entity),
                format!(
                    "`{name}` must be 3x3, got {} row(s) of length [{}]",
                    rows.len(),
                    shape.join(", ")
                ),
            );
        }
        matrix
    }

    fn resolve_endpoint(
        &mut self,
        endpoint: Option<&NodeId>,
        field: &str,
        entity: &str,
        node_index: &HashMap<&NodeId, usize>,
    ) -> Option<usize> {
        let Some(id) = endpoint else {
            self.push(
                Rule::MissingField,
                Some(entity),
                format!("branch has no `{field}` node"),
            );
            return None;
        };
        let position = node_index.get(id).copied();
        if position.is_none() {
            self.push(
                Rule::UnknownNode,
                Some(entity),
                format!("`{field}` references unknown node {id}"),
            );
        }
        position
    }

    fn check_topology(
        &mut self,
        nodes: &[Node],
        branches: &[Branch],
        node_index: &HashMap<&NodeId, usize>,
        requested_slack: Option<&NodeId>,
    ) -> Option<usize> {
        let mut graph = UnGraph::<(), ()>::with_capacity(nodes.len(), branches.len());
        let handles: Vec<_> = nodes.iter().map(|_| graph.add_node(())).collect();
        for branch in branches {
            graph.add_edge(handles[branch.from], handles[branch.to], ());
        }
        if is_cyclic_undirected(&graph) {
            self.push(
                Rule::NotRadial,
                None,
                "branch graph contains a cycle; only radial feeders are supported",
            );
        }

        if let Some(id) = requested_slack {
            let position = node_index.get(id).copied();
            if position.is_none() {
                self.push(
                    Rule::UnknownNode,
                    Some("parameters"),
                    format!("`slack_node` references unknown node {id}"),
                );
            }
            return position;
        }

        // Without an explicit slack, the root is the only node never fed by a branch.
        let mut fed = vec![false; nodes.len()];
        for branch in branches {
            fed[branch.to] = true;
        }
        let roots: Vec<usize> = (0..nodes.len()).filter(|&idx| !fed[idx]).collect();
        match roots.as_slice() {
            [root] => Some(*root),
            [] => {
                self.push(
                    Rule::SlackUndetermined,
                    None,
                    "every node is the `to` end of some branch; set `parameters.slack_node`",
                );
                None
            }
            many => {
                let ids: Vec<String> = many.iter().map(|&idx| nodes[idx].id.to_string()).collect();
                self.push(
                    Rule::SlackUndetermined,
                    None,
                    format!(
                        "nodes [{}] are never fed by a branch; set `parameters.slack_node`",
                        ids.join(", ")
                    ),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn identity() -> Value {
        json!([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    fn feeder() -> Value {
        json!({
            "network": {
                "nodes": [
                    { "id": "1" },
                    { "id": "2" },
                    { "id": "3", "load": {
                        "P_forecasted": 10.0, "Q_forecasted": 2.0,
                        "P_guaranteed": 4.0, "Q_guaranteed": 0.5
                    } }
                ],
                "branches": [
                    { "id": "1-2", "from": "1", "to": "2",
                      "impedance": { "R": identity(), "X": identity() }, "thermal_limit": 15.0 },
                    { "id": "2-3", "from": "2", "to": "3",
                      "impedance": { "R": identity(), "X": identity() }, "thermal_limit": 15.0 }
                ],
                "parameters": { "time_steps": 2, "voltage_limits": { "min": 0.9, "max": 1.1 } }
            }
        })
    }

    fn check(value: Value) -> Result<NetworkModel, ValidationError> {
        NetworkModel::from_document(&NetworkDocument::from_value(value).unwrap())
    }

    #[test]
    fn valid_feeder_builds_a_model() {
        let model = check(feeder()).unwrap();
        assert_eq!(model.nodes().len(), 3);
        assert_eq!(model.branches().len(), 2);
        assert_eq!(model.slack(), 0);
        assert_eq!(model.phases(), &Phase::ALL);
        assert_eq!(model.outgoing(1), &[1]);
        assert_eq!(model.incoming(1), &[0]);
        assert_eq!(model.loaded_nodes().collect::<Vec<_>>(), vec![2]);
        assert_eq!(model.time_steps(), 1..=2);
    }

    #[test]
    fn missing_network_is_reported() {
        let err = check(json!({})).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(err.has_rule(Rule::MissingSection));

        let err = check(json!({ "network": {} })).unwrap_err();
        assert_eq!(err.issues_for(Rule::MissingSection).count(), 3);
    }

    #[test]
    fn guaranteed_must_be_strictly_below_forecast() {
        let mut doc = feeder();
        doc["network"]["nodes"][2]["load"]["P_guaranteed"] = json!(10.0);
        doc["network"]["nodes"][2]["load"]["Q_guaranteed"] = json!({ "a": 0.1, "b": 3.0, "c": 0.1 });
        let err = check(doc).unwrap_err();
        let issues: Vec<_> = err.issues_for(Rule::GuaranteedNotBelowForecast).collect();
        // three phases for P, one for Q
        assert_eq!(issues.len(), 4);
        assert!(issues.iter().all(|i| i.entity.as_deref() == Some("node 3")));
    }

    #[test]
    fn negative_resistance_is_rejected() {
        let mut doc = feeder();
        doc["network"]["branches"][1]["impedance"]["R"][0][1] = json!(-0.01);
        let err = check(doc).unwrap_err();
        let issue = err.issues_for(Rule::NegativeResistance).next().unwrap();
        assert_eq!(issue.entity.as_deref(), Some("branch 2-3"));
        assert!(issue.message.contains("R[a][b]"));
    }

    #[test]
    fn missing_endpoints_are_rejected() {
        let mut doc = feeder();
        doc["network"]["branches"][0].as_object_mut().unwrap().remove("from");
        doc["network"]["branches"][1].as_object_mut().unwrap().remove("to");
        let err = check(doc).unwrap_err();
        let messages: Vec<_> = err
            .issues_for(Rule::MissingField)
            .map(|i| i.message.clone())
            .collect();
        assert!(messages.iter().any(|m| m.contains("`from`")));
        assert!(messages.iter().any(|m| m.contains("`to`")));
    }

    #[test]
    fn every_violation_is_batched() {
        let mut doc = feeder();
        doc["network"]["nodes"][2]["load"]["P_guaranteed"] = json!(12.0);
        doc["network"]["branches"][0]["impedance"]["X"] = json!([[1.0, 0.0], [0.0, 1.0]]);
        doc["network"]["branches"][1]["to"] = json!("9");
        let err = check(doc).unwrap_err();
        assert!(err.has_rule(Rule::GuaranteedNotBelowForecast));
        assert!(err.has_rule(Rule::ImpedanceShape));
        assert!(err.has_rule(Rule::UnknownNode));
        assert!(err.to_string().contains("issue(s)"));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut doc = feeder();
        doc["network"]["branches"].as_array_mut().unwrap().push(json!({
            "id": "3-1", "from": "3", "to": "1",
            "impedance": { "R": identity(), "X": identity() }, "thermal_limit": 15.0
        }));
        doc["network"]["parameters"]["slack_node"] = json!("1");
        let err = check(doc).unwrap_err();
        assert!(err.has_rule(Rule::NotRadial));
    }

    #[test]
    fn ambiguous_slack_requires_explicit_parameter() {
        let mut doc = feeder();
        doc["network"]["branches"].as_array_mut().unwrap().pop();
        let err = check(doc.clone()).unwrap_err();
        assert!(err.has_rule(Rule::SlackUndetermined));

        doc["network"]["parameters"]["slack_node"] = json!("1");
        let model = check(doc).unwrap();
        assert_eq!(model.slack_node().id.as_str(), "1");
    }

    #[test]
    fn profile_steps_must_lie_in_the_horizon() {
        let mut doc = feeder();
        doc["network"]["nodes"][2]["load"] = json!([
            { "time_step": 1, "P_forecasted": 10.0, "Q_forecasted": 2.0, "P_guaranteed": 4.0, "Q_guaranteed": 0.5 },
            { "time_step": 3, "P_forecasted": 10.0, "Q_forecasted": 2.0, "P_guaranteed": 4.0, "Q_guaranteed": 0.5 }
        ]);
        let err = check(doc).unwrap_err();
        assert!(err.has_rule(Rule::TimeStepOutOfRange));
    }

    #[test]
    fn inactive_phases_are_not_checked() {
        let mut doc = feeder();
        doc["network"]["parameters"]["phases"] = json!(["a"]);
        doc["network"]["nodes"][2]["load"]["P_guaranteed"] = json!({ "a": 4.0, "b": 99.0 });
        let model = check(doc).unwrap();
        assert_eq!(model.phases(), &[Phase::A]);
    }

    #[test]
    fn invalid_parameters_are_reported() {
        let mut doc = feeder();
        doc["network"]["parameters"] = json!({
            "time_steps": 0,
            "phases": ["a", "a", "z"],
            "voltage_limits": { "min": 1.1, "max": 0.9 }
        });
        let err = check(doc).unwrap_err();
        assert_eq!(err.issues_for(Rule::InvalidParameter).count(), 4);
    }
}
