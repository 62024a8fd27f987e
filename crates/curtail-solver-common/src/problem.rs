//! Problem representation handed to solver backends.

use serde::{Deserialize, Serialize};

/// Type of optimization problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    /// Linear Program
    Lp,
    /// Mixed-Integer Program
    Mip,
}

impl std::fmt::Display for ProblemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemType::Lp => write!(f, "LP"),
            ProblemType::Mip => write!(f, "MIP"),
        }
    }
}

/// Declared domain of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarType {
    Continuous,
    /// Integer in {0, 1}.
    Binary,
}

impl std::fmt::Display for VarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarType::Continuous => write!(f, "continuous"),
            VarType::Binary => write!(f, "binary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    /// `None` means unbounded below.
    pub lower: Option<f64>,
    /// `None` means unbounded above.
    pub upper: Option<f64>,
    pub var_type: VarType,
}

impl VariableDef {
    pub fn free(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: None,
            upper: None,
            var_type: VarType::Continuous,
        }
    }

    pub fn bounded(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            lower: Some(lower),
            upper: Some(upper),
            var_type: VarType::Continuous,
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            var_type: VarType::Binary,
            ..Self::bounded(name, 0.0, 1.0)
        }
    }

    pub fn with_lower(mut self, lower: f64) -> Self {
        self.lower = Some(lower);
        self
    }
}

/// Sparse linear expression over variable indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    pub terms: Vec<(usize, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: usize, coef: f64) -> Self {
        self.push(var, coef);
        self
    }

    pub fn push(&mut self, var: usize, coef: f64) {
        self.terms.push((var, coef));
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, &(var, coef)| acc + coef * values[var])
    }
}

/// One row `lower <= expr <= upper`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRow {
    pub name: String,
    pub expr: LinearExpr,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ConstraintRow {
    pub fn equal(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self {
            name: name.into(),
            expr,
            lower: Some(rhs),
            upper: Some(rhs),
        }
    }

    pub fn ranged(name: impl Into<String>, expr: LinearExpr, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            expr,
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn at_least(name: impl Into<String>, expr: LinearExpr, lower: f64) -> Self {
        Self {
            name: name.into(),
            expr,
            lower: Some(lower),
            upper: None,
        }
    }

    pub fn is_equality(&self) -> bool {
        matches!((self.lower, self.upper), (Some(l), Some(u)) if l == u)
    }

    /// Amount by which `values` violates this row (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let value = self.expr.evaluate(values);
        let below = self.lower.map_or(0.0, |l| (l - value).max(0.0));
        let above = self.upper.map_or(0.0, |u| (value - u).max(0.0));
        below.max(above)
    }
}

/// A frozen minimisation problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearProgram {
    pub variables: Vec<VariableDef>,
    pub objective: LinearExpr,
    pub rows: Vec<ConstraintRow>,
    /// Solver parameters; empty for curtailment studies.
    pub parameters: Vec<f64>,
}

impl LinearProgram {
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn has_binary_variables(&self) -> bool {
        self.variables
            .iter()
            .any(|var| var.var_type == VarType::Binary)
    }

    pub fn problem_type(&self) -> ProblemType {
        if self.has_binary_variables() {
            ProblemType::Mip
        } else {
            ProblemType::Lp
        }
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Largest row violation, useful for checking a returned assignment.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        self.rows
            .iter()
            .map(|row| row.violation(values))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> LinearProgram {
        LinearProgram {
            variables: vec![VariableDef::binary("s"), VariableDef::free("p")],
            objective: LinearExpr::new().term(0, 1.0),
            rows: vec![ConstraintRow::equal(
                "demand",
                LinearExpr::new().term(1, 1.0).term(0, -6.0),
                -10.0,
            )],
            parameters: Vec::new(),
        }
    }

    #[test]
    fn problem_type_follows_variable_tags() {
        let mut lp = tiny();
        assert_eq!(lp.problem_type(), ProblemType::Mip);
        lp.variables[0].var_type = VarType::Continuous;
        assert_eq!(lp.problem_type(), ProblemType::Lp);
    }

    #[test]
    fn violation_measures_distance_to_the_band() {
        let lp = tiny();
        // p - 6s = -10 holds for s = 1, p = -4
        assert_eq!(lp.max_violation(&[1.0, -4.0]), 0.0);
        assert!((lp.max_violation(&[0.0, -4.0]) - 6.0).abs() < 1e-12);

        let row = ConstraintRow::at_least("floor", LinearExpr::new().term(0, 1.0), 2.0);
        assert_eq!(row.violation(&[3.0]), 0.0);
        assert_eq!(row.violation(&[0.5]), 1.5);
        assert!(!row.is_equality());
    }

    #[test]
    fn unbounded_sides_serialize_as_null() {
        let json = serde_json::to_string(&VariableDef::free("x")).unwrap();
        assert!(json.contains("\"lower\":null"));
    }
}
