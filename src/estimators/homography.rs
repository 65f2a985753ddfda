//! Homography estimator: 4-point DLT for minimal samples, least squares for
//! larger ones.
//!
//! Data rows are `[x_src, y_src, x_dst, y_dst]`. Both point sets are
//! conditioned (centroid at the origin, mean distance sqrt(2)) before solving,
//! with `h[8]` fixed to 1 in the conditioned frame.

use nalgebra::{DMatrix, DVector, Matrix3};

use crate::core::Estimator;
use crate::models::Homography;
use crate::types::DataMatrix;
use crate::utils::gauss_elimination;

const MIN_DET: f64 = 1e-4;
const MAX_DET: f64 = 1e4;
/// Minimum sine of the angle at a triangle vertex before three points count
/// as collinear.
const COLLINEAR_SINE: f64 = 1e-6;

pub struct HomographyEstimator;

impl Default for HomographyEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Similarity transform moving points to zero mean and mean norm sqrt(2).
fn conditioning<I>(points: I) -> Option<Matrix3<f64>>
where
    I: Iterator<Item = (f64, f64)> + Clone,
{
    let n = points.clone().count() as f64;
    if n == 0.0 {
        return None;
    }
    let (sx, sy) = points.clone().fold((0.0, 0.0), |acc, (x, y)| (acc.0 + x, acc.1 + y));
    let (cx, cy) = (sx / n, sy / n);
    let mean_dist = points
        .map(|(x, y)| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if !mean_dist.is_finite() || mean_dist <= f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

fn apply(t: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
    // Conditioning transforms are affine.
    (
        t[(0, 0)] * x + t[(0, 2)],
        t[(1, 1)] * y + t[(1, 2)],
    )
}

fn collinear(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let (ux, uy) = (b.0 - a.0, b.1 - a.1);
    let (vx, vy) = (c.0 - a.0, c.1 - a.1);
    let cross = (ux * vy - uy * vx).abs();
    let norms = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
    norms <= f64::EPSILON || cross <= COLLINEAR_SINE * norms
}

/// Assemble the 3x3 matrix from the eight solved unknowns, undo the
/// conditioning and rescale so `h[(2, 2)] == 1`.
fn finish(h: &DVector<f64>, t_src: &Matrix3<f64>, t_dst: &Matrix3<f64>) -> Option<Homography> {
    if h.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
    let t_dst_inv = t_dst.try_inverse()?;
    let full = t_dst_inv * hn * t_src;
    let w = full[(2, 2)];
    if !w.is_finite() || w.abs() <= 1e-12 {
        return None;
    }
    Some(Homography::new(full / w))
}

impl HomographyEstimator {
    pub fn new() -> Self {
        Self
    }

    fn conditioned_points(
        data: &DataMatrix,
        sample: &[usize],
    ) -> Option<(Matrix3<f64>, Matrix3<f64>, Vec<[f64; 4]>)> {
        let t_src = conditioning(sample.iter().map(|&i| (data[(i, 0)], data[(i, 1)])))?;
        let t_dst = conditioning(sample.iter().map(|&i| (data[(i, 2)], data[(i, 3)])))?;
        let points = sample
            .iter()
            .map(|&i| {
                let (x1, y1) = apply(&t_src, data[(i, 0)], data[(i, 1)]);
                let (x2, y2) = apply(&t_dst, data[(i, 2)], data[(i, 3)]);
                [x1, y1, x2, y2]
            })
            .collect();
        Some((t_src, t_dst, points))
    }

    /// Non-zero entries of the two DLT rows for one correspondence; column 8
    /// is the right-hand side.
    fn fill_rows<F>(p: &[f64; 4], row: usize, mut set: F)
    where
        F: FnMut(usize, usize, f64),
    {
        let [x1, y1, x2, y2] = *p;
        set(row, 0, -x1);
        set(row, 1, -y1);
        set(row, 2, -1.0);
        set(row, 6, x2 * x1);
        set(row, 7, x2 * y1);
        set(row, 8, -x2);

        set(row + 1, 3, -x1);
        set(row + 1, 4, -y1);
        set(row + 1, 5, -1.0);
        set(row + 1, 6, y2 * x1);
        set(row + 1, 7, y2 * y1);
        set(row + 1, 8, -y2);
    }

    fn estimate_minimal_model(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Homography> {
        let Some((t_src, t_dst, points)) = Self::conditioned_points(data, sample) else {
            return Vec::new();
        };

        // 8x9 augmented system [A | b].
        let mut augmented = DMatrix::<f64>::zeros(8, 9);
        for (i, p) in points.iter().enumerate() {
            Self::fill_rows(p, 2 * i, |r, c, v| augmented[(r, c)] = v);
        }

        let mut h = DVector::<f64>::zeros(8);
        if !gauss_elimination(&mut augmented, &mut h) {
            return Vec::new();
        }

        finish(&h, &t_src, &t_dst).into_iter().collect()
    }
}

impl Estimator for HomographyEstimator {
    type Model = Homography;

    fn sample_size(&self) -> usize {
        4
    }

    /// Distinct rows, and no three source or target points collinear.
    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool {
        if sample.len() < self.sample_size() {
            return false;
        }
        for i in 0..sample.len() {
            for j in (i + 1)..sample.len() {
                if sample[i] == sample[j] {
                    return false;
                }
            }
        }

        for offset in [0, 2] {
            let p = |k: usize| (data[(sample[k], offset)], data[(sample[k], offset + 1)]);
            for a in 0..4 {
                for b in (a + 1)..4 {
                    for c in (b + 1)..4 {
                        if collinear(p(a), p(b), p(c)) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    fn estimate_model(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Homography> {
        let n = sample.len();
        if n < self.sample_size() {
            return Vec::new();
        }
        if n == self.sample_size() {
            return self.estimate_minimal_model(data, sample);
        }
        self.estimate_model_nonminimal(data, sample)
    }

    fn estimate_model_nonminimal(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Homography> {
        let n = sample.len();
        if n < self.sample_size() {
            return Vec::new();
        }
        let Some((t_src, t_dst, points)) = Self::conditioned_points(data, sample) else {
            return Vec::new();
        };

        // 2N x 8 coefficients and 2N inhomogeneous terms.
        let mut coefficients = DMatrix::<f64>::zeros(2 * n, 8);
        let mut inhomogeneous = DVector::<f64>::zeros(2 * n);
        for (i, p) in points.iter().enumerate() {
            Self::fill_rows(p, 2 * i, |r, c, v| {
                if c == 8 {
                    inhomogeneous[r] = v;
                } else {
                    coefficients[(r, c)] = v;
                }
            });
        }

        // Over-determined for N > 4: least-squares solution via SVD.
        let svd = coefficients.svd(true, true);
        let Ok(h) = svd.solve(&inhomogeneous, 1e-12) else {
            return Vec::new();
        };

        finish(&h, &t_src, &t_dst).into_iter().collect()
    }

    fn is_valid_model(
        &self,
        model: &Homography,
        _data: &DataMatrix,
        _sample: &[usize],
        _threshold: f64,
    ) -> bool {
        let det = model.h.determinant().abs();
        det.is_finite() && det > MIN_DET && det < MAX_DET
    }
}
