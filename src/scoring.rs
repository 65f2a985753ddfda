//! Inlier-count scoring for the RANSAC loop.

use std::cmp::Ordering;

use crate::core::Scoring;
use crate::types::DataMatrix;

/// Model quality: number of inliers, ties broken by the smaller sum of inlier
/// residuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub inlier_count: usize,
    pub residual_sum: f64,
}

impl Score {
    pub fn new(inlier_count: usize, residual_sum: f64) -> Self {
        Self {
            inlier_count,
            residual_sum,
        }
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.inlier_count.cmp(&other.inlier_count) {
            Ordering::Equal => other.residual_sum.partial_cmp(&self.residual_sum),
            ord => Some(ord),
        }
    }
}

/// Counts rows whose residual is strictly below the threshold.
///
/// The residual function takes `(data, model, row_index)` and returns a
/// non-negative residual (`INFINITY` for rows the model cannot explain).
pub struct RansacInlierCountScoring<M, F>
where
    F: Fn(&DataMatrix, &M, usize) -> f64,
{
    threshold: f64,
    residual_fn: F,
    _marker: std::marker::PhantomData<M>,
}

impl<M, F> RansacInlierCountScoring<M, F>
where
    F: Fn(&DataMatrix, &M, usize) -> f64,
{
    pub fn new(threshold: f64, residual_fn: F) -> Self {
        Self {
            threshold,
            residual_fn,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<M, F> Scoring<M> for RansacInlierCountScoring<M, F>
where
    F: Fn(&DataMatrix, &M, usize) -> f64,
{
    type Score = Score;

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, data: &DataMatrix, model: &M, inliers_out: &mut Vec<usize>) -> Score {
        inliers_out.clear();
        let mut residual_sum = 0.0;
        for i in 0..data.nrows() {
            let r = (self.residual_fn)(data, model, i);
            if r < self.threshold {
                inliers_out.push(i);
                residual_sum += r;
            }
        }
        Score::new(inliers_out.len(), residual_sum)
    }
}
