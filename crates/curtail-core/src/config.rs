//! Study configuration.
//!
//! A [`StudyConfig`] is usually read from a TOML file and then patched by CLI
//! flags. Partial files are fine; every section and field has a default.
//!
//! ```toml
//! [formulation]
//! phase_coupling = "diagonal_only"
//! load_profile = "time_series"
//! smoothing_weight = 0.25
//!
//! [solver]
//! backend = "microlp"
//! time_limit_secs = 30.0
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Top-level configuration for one curtailment study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// How the problem is formulated.
    pub formulation: FormulationConfig,

    /// Which backend solves it and for how long.
    pub solver: SolverConfig,

    /// Phasor recovery settings.
    pub recovery: RecoveryConfig,
}

impl StudyConfig {
    pub fn from_toml_str(contents: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Rejects values that deserialize fine but make no sense.
    pub fn check(&self) -> CoreResult<()> {
        let weight = self.formulation.smoothing_weight;
        if !(weight >= 0.0 && weight.is_finite()) {
            return Err(CoreError::Config(format!(
                "formulation.smoothing_weight must be a non-negative number, got {weight}"
            )));
        }
        if let Some(limit) = self.solver.time_limit_secs {
            if !(limit > 0.0 && Duration::try_from_secs_f64(limit).is_ok()) {
                return Err(CoreError::Config(format!(
                    "solver.time_limit_secs must be a positive number of seconds that fits a duration, got {limit}"
                )));
            }
        }
        let v = self.recovery.slack_voltage;
        if !(v > 0.0 && v.is_finite()) {
            return Err(CoreError::Config(format!(
                "recovery.slack_voltage must be positive, got {v}"
            )));
        }
        Ok(())
    }
}

/// Problem-builder options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulationConfig {
    pub phase_coupling: PhaseCoupling,

    pub load_profile: LoadProfileKind,

    pub curtailment: CurtailmentKind,

    /// Weight on |s(t) - s(t-1)| in the objective (0 disables smoothing).
    pub smoothing_weight: f64,
}

impl Default for FormulationConfig {
    fn default() -> Self {
        Self {
            phase_coupling: PhaseCoupling::Full,
            load_profile: LoadProfileKind::Static,
            curtailment: CurtailmentKind::Binary,
            smoothing_weight: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Backend name (`microlp`, `clarabel`, `highs`).
    pub backend: String,

    /// Wall-clock limit for one solve. `None` waits indefinitely.
    pub time_limit_secs: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: "microlp".to_string(),
            time_limit_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Reference voltage magnitude at the slack node (p.u.).
    pub slack_voltage: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self { slack_voltage: 1.0 }
    }
}

/// Which phase pairs carry flow and voltage variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseCoupling {
    /// Own-phase quantities only.
    DiagonalOnly,
    /// All 3×3 phase pairs, tied together by the symmetric rotation.
    #[default]
    Full,
}

/// Which load record form the builder expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadProfileKind {
    #[default]
    Static,
    TimeSeries,
}

/// Declared type of the curtailment status variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurtailmentKind {
    #[default]
    Binary,
    /// Continuous in [0, 1].
    Relaxed,
}

macro_rules! keyword_enum {
    ($ty:ident { $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $($label $(| $alias)* => Ok($ty::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}'; supported values: {}",
                        stringify!($ty),
                        other,
                        [$($label),+].join(", ")
                    )),
                }
            }
        }
    };
}

keyword_enum!(PhaseCoupling {
    DiagonalOnly => "diagonal_only" | "diagonal",
    Full => "full",
});

keyword_enum!(LoadProfileKind {
    Static => "static",
    TimeSeries => "time_series" | "timeseries",
});

keyword_enum!(CurtailmentKind {
    Binary => "binary",
    Relaxed => "relaxed",
});
