//! Geometric model types.

use nalgebra::{Matrix3, Vector3};

const W_EPS: f64 = 1e-12;

/// Planar projective transformation, source plane to target plane.
///
/// Stored scaled so that `h[(2, 2)] == 1` whenever the estimator produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    /// Build from nine row-major scalars.
    pub fn from_row_major(values: [f64; 9]) -> Self {
        Self::new(Matrix3::from_row_slice(&values))
    }

    /// Nine row-major scalars.
    pub fn to_row_major(&self) -> [f64; 9] {
        let m = &self.h;
        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ]
    }

    /// Map a source point into the target plane; `None` for points sent to
    /// infinity.
    pub fn project(&self, p: [f64; 2]) -> Option<[f64; 2]> {
        let v = self.h * Vector3::new(p[0], p[1], 1.0);
        let w = v[2];
        if !w.is_finite() || w.abs() <= W_EPS {
            return None;
        }
        let out = [v[0] / w, v[1] / w];
        if out.iter().all(|c| c.is_finite()) {
            Some(out)
        } else {
            None
        }
    }

    /// Forward reprojection error `|H * src - dst|` in target units.
    pub fn transfer_error(&self, src: [f64; 2], dst: [f64; 2]) -> f64 {
        match self.project(src) {
            Some(p) => ((p[0] - dst[0]).powi(2) + (p[1] - dst[1]).powi(2)).sqrt(),
            None => f64::INFINITY,
        }
    }
}
