//! Phase rotation coefficients for the coupled formulation.
//!
//! With α = exp(−i·2π/3) the symmetric rotation is
//!
//! ```text
//!     ⎡ 1   α²  α  ⎤
//! Γ = ⎢ α   1   α² ⎥
//!     ⎣ α²  α   1  ⎦
//! ```
//!
//! Γ is fixed by three-phase symmetry, so it is split into real and
//! imaginary parts once and every coupling row reads plain `f64`s.

use std::f64::consts::PI;

use curtail_core::Phase;
use num_complex::Complex64;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseRotation {
    re: [[f64; 3]; 3],
    im: [[f64; 3]; 3],
}

impl PhaseRotation {
    /// The 120°-symmetric rotation Γ.
    pub fn symmetric() -> Self {
        let alpha = Complex64::from_polar(1.0, -2.0 * PI / 3.0);
        let alpha2 = alpha * alpha;
        let one = Complex64::new(1.0, 0.0);
        Self::from_complex([[one, alpha2, alpha], [alpha, one, alpha2], [alpha2, alpha, one]])
    }

    pub fn from_complex(gamma: [[Complex64; 3]; 3]) -> Self {
        let mut re = [[0.0; 3]; 3];
        let mut im = [[0.0; 3]; 3];
        for (i, row) in gamma.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                re[i][j] = value.re;
                im[i][j] = value.im;
            }
        }
        Self { re, im }
    }

    #[inline]
    pub fn re(&self, row: Phase, col: Phase) -> f64 {
        self.re[row.index()][col.index()]
    }

    #[inline]
    pub fn im(&self, row: Phase, col: Phase) -> f64 {
        self.im[row.index()][col.index()]
    }
}

impl Default for PhaseRotation {
    fn default() -> Self {
        Self::symmetric()
    }
}
