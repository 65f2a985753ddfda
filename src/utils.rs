//! Miscellaneous numeric helpers: a seedable uniform index generator and a
//! small dense linear solver.

use nalgebra::{DMatrix, DVector};
use rand::distributions::Uniform;
use rand::prelude::*;

/// Uniform integer generator used for minimal-sample selection.
///
/// Always seeded, so sampling is reproducible.
pub struct UniformRandomGenerator {
    rng: StdRng,
}

impl UniformRandomGenerator {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fill `out` with distinct values in `[min, max]`.
    ///
    /// Rejection sampling; intended for minimal samples much smaller than the
    /// range. The caller guarantees `out.len() <= max - min + 1`.
    pub fn gen_unique(&mut self, out: &mut [usize], min: usize, max: usize) {
        let dist = Uniform::new_inclusive(min, max);
        for i in 0..out.len() {
            loop {
                let candidate = self.rng.sample(dist);
                if out[..i].iter().all(|&v| v != candidate) {
                    out[i] = candidate;
                    break;
                }
            }
        }
    }
}

/// Solve `A x = b` given the augmented matrix `[A | b]` (n x n+1) using
/// Gaussian elimination with partial pivoting.
///
/// Returns `false` when the system is (numerically) singular; `augmented` is
/// clobbered either way.
pub fn gauss_elimination(augmented: &mut DMatrix<f64>, result: &mut DVector<f64>) -> bool {
    let n = augmented.nrows();
    if n + 1 != augmented.ncols() || n != result.len() {
        return false;
    }

    for i in 0..n {
        let mut max_row = i;
        let mut max_val = augmented[(i, i)].abs();
        for k in (i + 1)..n {
            let val = augmented[(k, i)].abs();
            if val > max_val {
                max_val = val;
                max_row = k;
            }
        }
        if max_row != i {
            augmented.swap_rows(i, max_row);
        }

        if augmented[(i, i)].abs() < 1e-10 {
            return false;
        }

        for k in (i + 1)..n {
            let factor = augmented[(k, i)] / augmented[(i, i)];
            for j in i..=n {
                augmented[(k, j)] -= factor * augmented[(i, j)];
            }
        }
    }

    for i in (0..n).rev() {
        let mut acc = augmented[(i, n)];
        for j in (i + 1)..n {
            acc -= augmented[(i, j)] * result[j];
        }
        result[i] = acc / augmented[(i, i)];
    }

    true
}
