//! Phase labels and per-phase containers.
//!
//! Every per-phase quantity is stored densely for all three phases, even when a
//! study activates only a subset. Inactive entries stay at zero and are never
//! read by the formulation.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One conductor of a three-phase feeder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    A,
    B,
    C,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Phase::A => 0,
            Phase::B => 1,
            Phase::C => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Phase::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::A => "a",
            Phase::B => "b",
            Phase::C => "c",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Phase::A),
            "b" => Ok(Phase::B),
            "c" => Ok(Phase::C),
            other => Err(format!("unknown phase '{other}'; expected one of a, b, c")),
        }
    }
}

/// One value per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseValues(pub [f64; 3]);

impl PhaseValues {
    pub fn uniform(value: f64) -> Self {
        PhaseValues([value; 3])
    }

    pub fn get(&self, phase: Phase) -> f64 {
        self.0[phase.index()]
    }
}

impl Index<Phase> for PhaseValues {
    type Output = f64;

    fn index(&self, phase: Phase) -> &f64 {
        &self.0[phase.index()]
    }
}

impl IndexMut<Phase> for PhaseValues {
    fn index_mut(&mut self, phase: Phase) -> &mut f64 {
        &mut self.0[phase.index()]
    }
}

/// A 3×3 matrix indexed by (row phase, column phase).
///
/// The diagonal holds own-phase quantities; off-diagonal entries hold the
/// mutual coupling between conductors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseMatrix(pub [[f64; 3]; 3]);

impl PhaseMatrix {
    pub fn diagonal(value: f64) -> Self {
        let mut m = [[0.0; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = value;
        }
        PhaseMatrix(m)
    }

    /// Converts nested rows, returning `None` unless the shape is exactly 3×3.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        if rows.len() != 3 || rows.iter().any(|row| row.len() != 3) {
            return None;
        }
        let mut m = [[0.0; 3]; 3];
        for (i, row) in rows.iter().enumerate() {
            m[i].copy_from_slice(row);
        }
        Some(PhaseMatrix(m))
    }

    #[inline]
    pub fn get(&self, row: Phase, col: Phase) -> f64 {
        self.0[row.index()][col.index()]
    }

    /// Iterates over `(row, col, value)` in row-major order.
    pub fn entries(&self) -> impl Iterator<Item = (Phase, Phase, f64)> + '_ {
        Phase::ALL.into_iter().flat_map(move |row| {
            Phase::ALL
                .into_iter()
                .map(move |col| (row, col, self.get(row, col)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_labels_round_trip_through_from_str() {
        for phase in Phase::ALL {
            assert_eq!(phase.label().parse::<Phase>().unwrap(), phase);
        }
        assert_eq!(" B ".parse::<Phase>().unwrap(), Phase::B);
        assert!("d".parse::<Phase>().is_err());
    }

    #[test]
    fn phase_matrix_rejects_wrong_shapes() {
        let square = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
        assert_eq!(PhaseMatrix::from_rows(&square), Some(PhaseMatrix::diagonal(1.0)));

        let ragged = vec![vec![1.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
        assert!(PhaseMatrix::from_rows(&ragged).is_none());
        assert!(PhaseMatrix::from_rows(&square[..2]).is_none());
    }

    #[test]
    fn entries_are_row_major() {
        let m = PhaseMatrix([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let values: Vec<f64> = m.entries().map(|(_, _, v)| v).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(m.get(Phase::B, Phase::C), 6.0);
    }
}
