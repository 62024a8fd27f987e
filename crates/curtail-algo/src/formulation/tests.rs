use super::*;
use curtail_core::NetworkDocument;
use curtail_solver_common::VarType;
use serde_json::{json, Value};

fn diag(value: f64) -> Value {
    json!([[value, 0.0, 0.0], [0.0, value, 0.0], [0.0, 0.0, value]])
}

fn feeder_doc() -> Value {
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
                  "impedance": { "R": diag(0.001), "X": diag(0.002) }, "thermal_limit": 15.0 },
                { "id": "2-3", "from": "2", "to": "3",
                  "impedance": { "R": diag(0.001), "X": diag(0.002) }, "thermal_limit": 15.0 }
            ],
            "parameters": { "time_steps": 2, "voltage_limits": { "min": 0.9, "max": 1.1 } }
        }
    })
}

fn model_from(value: Value) -> NetworkModel {
    NetworkModel::from_document(&NetworkDocument::from_value(value).unwrap()).unwrap()
}

fn diagonal() -> FormulationOptions {
    FormulationOptions::default().with_phase_coupling(PhaseCoupling::DiagonalOnly)
}

fn row<'a>(formulation: &'a Formulation, name: &str) -> &'a ConstraintRow {
    formulation
        .program
        .rows
        .iter()
        .find(|row| row.name == name)
        .unwrap_or_else(|| panic!("row {name} not emitted"))
}

fn coef(row: &ConstraintRow, var: usize) -> f64 {
    row.expr
        .terms
        .iter()
        .filter(|(idx, _)| *idx == var)
        .map(|(_, c)| c)
        .sum()
}

#[test]
fn diagonal_formulation_sizes() {
    let model = model_from(feeder_doc());
    let formulation = ProblemBuilder::new(&model, diagonal()).build().unwrap();
    let summary = formulation.summary();

    // status 2 + injections 36 + supply 12 + flows 24 + voltages 18
    assert_eq!(summary.variables, 92);
    assert_eq!(summary.binary_variables, 2);
    assert_eq!(summary.rows, 108);
    assert_eq!(
        summary.rows_per_family,
        vec![
            (RowFamily::Demand, 12),
            (RowFamily::VoltageBounds, 18),
            (RowFamily::SlackReference, 6),
            (RowFamily::Thermal, 24),
            (RowFamily::PowerBalance, 36),
            (RowFamily::VoltageDrop, 12),
        ]
    );
}

#[test]
fn full_coupling_adds_off_diagonal_pairs() {
    let model = model_from(feeder_doc());
    let formulation = ProblemBuilder::new(&model, FormulationOptions::default())
        .build()
        .unwrap();
    let summary = formulation.summary();
    assert_eq!(summary.variables, 2 + 36 + 12 + 72 + 54);
    assert_eq!(formulation.rows_of(RowFamily::VoltageDrop).count(), 36);
    assert_eq!(formulation.rows_of(RowFamily::PhaseCoupling).count(), 48);

    let off_diagonal = VarKey::VoltageSq {
        node: 1,
        row: Phase::A,
        col: Phase::B,
        step: 1,
    };
    let idx = formulation.var_index(&off_diagonal).unwrap();
    assert_eq!(formulation.program.variables[idx].lower, None);
}

#[test]
fn formulation_is_deterministic() {
    let model = model_from(feeder_doc());
    let options = FormulationOptions::default().with_smoothing_weight(0.5);
    let first = ProblemBuilder::new(&model, options).build().unwrap();
    let second = ProblemBuilder::new(&model_from(feeder_doc()), options)
        .build()
        .unwrap();
    assert_eq!(first.keys, second.keys);
    assert_eq!(first.to_json_pretty().unwrap(), second.to_json_pretty().unwrap());
}

#[test]
fn demand_row_linearizes_the_curtailment_choice() {
    let model = model_from(feeder_doc());
    let formulation = ProblemBuilder::new(&model, diagonal()).build().unwrap();
    let demand = row(&formulation, "demand_p[3,a,t1]");

    let status = formulation
        .var_index(&VarKey::Status { node: 2, step: 1 })
        .unwrap();
    let injection = formulation
        .var_index(&VarKey::Injection {
            power: Power::Active,
            node: 2,
            phase: Phase::A,
            step: 1,
        })
        .unwrap();
    assert_eq!(coef(demand, injection), 1.0);
    assert_eq!(coef(demand, status), -6.0);
    assert_eq!(demand.lower, Some(-10.0));
    assert!(demand.is_equality());

    // s = 1 gives -4, s = 0 gives -10
    let mut values = vec![0.0; formulation.program.num_variables()];
    values[status] = 1.0;
    values[injection] = -4.0;
    assert_eq!(demand.violation(&values), 0.0);
    values[status] = 0.0;
    values[injection] = -10.0;
    assert_eq!(demand.violation(&values), 0.0);
}

#[test]
fn unloaded_nodes_inject_nothing() {
    let model = model_from(feeder_doc());
    let formulation = ProblemBuilder::new(&model, diagonal()).build().unwrap();
    let idx = formulation
        .var_index(&VarKey::Injection {
            power: Power::Reactive,
            node: 1,
            phase: Phase::C,
            step: 2,
        })
        .unwrap();
    let def = &formulation.program.variables[idx];
    assert_eq!((def.lower, def.upper), (Some(0.0), Some(0.0)));
    assert!(formulation
        .var_index(&VarKey::Status { node: 1, step: 1 })
        .is_none());
}

#[test]
fn power_balance_includes_supply_at_the_slack_only() {
    let model = model_from(feeder_doc());
    let formulation = ProblemBuilder::new(&model, diagonal()).build().unwrap();
    let supply = formulation
        .var_index(&VarKey::Supply {
            power: Power::Active,
            phase: Phase::B,
            step: 2,
        })
        .unwrap();
    assert_eq!(coef(row(&formulation, "kcl_p[1,b,t2]"), supply), 1.0);
    assert_eq!(coef(row(&formulation, "kcl_p[2,b,t2]"), supply), 0.0);

    let inflow = formulation
        .var_index(&VarKey::Flow {
            power: Power::Active,
            branch: 0,
            row: Phase::B,
            col: Phase::B,
            step: 2,
        })
        .unwrap();
    assert_eq!(coef(row(&formulation, "kcl_p[2,b,t2]"), inflow), 1.0);
    assert_eq!(coef(row(&formulation, "kcl_p[1,b,t2]"), inflow), -1.0);
}

#[test]
fn voltage_drop_uses_matching_impedance_entries() {
    let mut doc = feeder_doc();
    doc["network"]["branches"][0]["impedance"]["R"][0][1] = json!(0.0005);
    let model = model_from(doc);
    let formulation = ProblemBuilder::new(&model, FormulationOptions::default())
        .build()
        .unwrap();
    let drop = row(&formulation, "vdrop[1-2,a,b,t1]");
    let p_ab = formulation
        .var_index(&VarKey::Flow {
            power: Power::Active,
            branch: 0,
            row: Phase::A,
            col: Phase::B,
            step: 1,
        })
        .unwrap();
    assert!((coef(drop, p_ab) - 0.001).abs() < 1e-15);

    let own = row(&formulation, "vdrop[1-2,a,a,t1]");
    let u_to = formulation
        .var_index(&VarKey::VoltageSq {
            node: 1,
            row: Phase::A,
            col: Phase::A,
            step: 1,
        })
        .unwrap();
    assert_eq!(coef(own, u_to), 1.0);
}

#[test]
fn coupling_rows_apply_the_rotation() {
    let model = model_from(feeder_doc());
    let formulation = ProblemBuilder::new(&model, FormulationOptions::default())
        .build()
        .unwrap();
    let gamma = PhaseRotation::symmetric();
    let couple = row(&formulation, "couple_p[2-3,b,c,t2]");
    let key = |power, row, col| VarKey::Flow {
        power,
        branch: 1,
        row,
        col,
        step: 2,
    };
    let p_own = formulation.var_index(&key(Power::Active, Phase::B, Phase::B)).unwrap();
    let q_own = formulation.var_index(&key(Power::Reactive, Phase::B, Phase::B)).unwrap();
    assert!((coef(couple, p_own) + gamma.re(Phase::B, Phase::C)).abs() < 1e-12);
    assert!((coef(couple, q_own) - gamma.im(Phase::B, Phase::C)).abs() < 1e-12);
}

#[test]
fn relaxed_curtailment_only_changes_the_type_tag() {
    let model = model_from(feeder_doc());
    let binary = ProblemBuilder::new(&model, diagonal()).build().unwrap();
    let relaxed = ProblemBuilder::new(
        &model,
        diagonal().with_curtailment(CurtailmentKind::Relaxed),
    )
    .build()
    .unwrap();

    assert_eq!(binary.program.rows, relaxed.program.rows);
    assert_eq!(binary.program.problem_type(), curtail_solver_common::ProblemType::Mip);
    assert_eq!(relaxed.program.problem_type(), curtail_solver_common::ProblemType::Lp);
    let idx = relaxed
        .var_index(&VarKey::Status { node: 2, step: 2 })
        .unwrap();
    assert_eq!(relaxed.program.variables[idx].var_type, VarType::Continuous);
    assert_eq!(relaxed.program.variables[idx].upper, Some(1.0));
}

#[test]
fn smoothing_adds_weighted_toggles() {
    let model = model_from(feeder_doc());
    let formulation = ProblemBuilder::new(&model, diagonal().with_smoothing_weight(0.25))
        .build()
        .unwrap();
    let toggle = formulation
        .var_index(&VarKey::Toggle { node: 2, step: 2 })
        .unwrap();
    assert!(formulation
        .var_index(&VarKey::Toggle { node: 2, step: 1 })
        .is_none());
    assert_eq!(formulation.rows_of(RowFamily::Smoothing).count(), 2);
    assert!(formulation
        .program
        .objective
        .terms
        .contains(&(toggle, 0.25)));

    // switching on between steps forces the toggle to 1
    let s1 = formulation.var_index(&VarKey::Status { node: 2, step: 1 }).unwrap();
    let s2 = formulation.var_index(&VarKey::Status { node: 2, step: 2 }).unwrap();
    let mut values = vec![0.0; formulation.program.num_variables()];
    values[s2] = 1.0;
    values[s1] = 0.0;
    let up = row(&formulation, "smooth_up[3,t2]");
    assert_eq!(up.violation(&values), 1.0);
    values[toggle] = 1.0;
    assert_eq!(up.violation(&values), 0.0);
}

#[test]
fn negative_smoothing_weight_is_rejected() {
    let model = model_from(feeder_doc());
    let err = ProblemBuilder::new(&model, diagonal().with_smoothing_weight(-1.0))
        .build()
        .unwrap_err();
    assert!(matches!(err, FormulationError::InvalidOption(_)));
}

fn record(step: i64, p: f64) -> Value {
    json!({ "time_step": step, "P_forecasted": p, "Q_forecasted": 2.0,
            "P_guaranteed": 1.0, "Q_guaranteed": 0.5 })
}

#[test]
fn time_series_requires_one_record_per_step() {
    let options = diagonal().with_load_profile(LoadProfileKind::TimeSeries);

    let mut doc = feeder_doc();
    doc["network"]["nodes"][2]["load"] = json!([record(1, 10.0)]);
    let err = ProblemBuilder::new(&model_from(doc), options)
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        FormulationError::MissingLoadRecord {
            node: curtail_core::NodeId::new("3"),
            step: 2
        }
    );

    let mut doc = feeder_doc();
    doc["network"]["nodes"][2]["load"] = json!([record(1, 10.0), record(1, 9.0), record(2, 5.0)]);
    let err = ProblemBuilder::new(&model_from(doc), options)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        FormulationError::DuplicateLoadRecord { step: 1, count: 2, .. }
    ));

    let mut doc = feeder_doc();
    doc["network"]["nodes"][2]["load"] = json!([record(2, 5.0), record(1, 10.0)]);
    let formulation = ProblemBuilder::new(&model_from(doc), options)
        .build()
        .unwrap();
    assert_eq!(row(&formulation, "demand_p[3,a,t2]").lower, Some(-5.0));
    assert_eq!(row(&formulation, "demand_p[3,a,t1]").lower, Some(-10.0));
}

#[test]
fn load_form_must_match_the_profile_option() {
    let model = model_from(feeder_doc());
    let err = ProblemBuilder::new(
        &model,
        diagonal().with_load_profile(LoadProfileKind::TimeSeries),
    )
    .build()
    .unwrap_err();
    assert!(matches!(
        err,
        FormulationError::LoadProfileMismatch {
            expected: "time_series",
            found: "static",
            ..
        }
    ));
}

#[test]
fn single_phase_studies_only_touch_active_phases() {
    let mut doc = feeder_doc();
    doc["network"]["parameters"]["phases"] = json!(["b"]);
    let model = model_from(doc);
    let formulation = ProblemBuilder::new(&model, FormulationOptions::default())
        .build()
        .unwrap();
    assert!(formulation.rows_of(RowFamily::PhaseCoupling).next().is_none());
    assert!(formulation
        .keys
        .iter()
        .all(|key| !matches!(key, VarKey::Flow { row: Phase::A, .. })));
    assert_eq!(formulation.rows_of(RowFamily::Demand).count(), 4);
}
