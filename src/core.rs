//! RANSAC traits and the generic hypothesize-and-verify loop.
//!
//! The loop is assembled from five pluggable parts:
//! - an [`Estimator`] turning minimal samples into model hypotheses,
//! - a [`Sampler`] choosing those samples,
//! - a [`Scoring`] strategy ranking hypotheses and reporting their inliers,
//! - an optional [`LocalOptimizer`] refining the final model,
//! - a [`TerminationCriterion`] shrinking the iteration budget.

use crate::scoring::Score;
use crate::settings::RansacSettings;
use crate::types::DataMatrix;

/// Estimator responsible for generating model hypotheses from samples.
pub trait Estimator {
    type Model: Clone;

    /// Size of a minimal sample.
    fn sample_size(&self) -> usize;

    /// Reject samples that cannot produce a well-defined model.
    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool;

    /// Candidate models from a minimal sample.
    fn estimate_model(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Self::Model>;

    /// Least-squares fit to more than a minimal sample.
    fn estimate_model_nonminimal(&self, data: &DataMatrix, sample: &[usize]) -> Vec<Self::Model> {
        self.estimate_model(data, sample)
    }

    /// Validate a candidate model before scoring.
    fn is_valid_model(
        &self,
        model: &Self::Model,
        data: &DataMatrix,
        sample: &[usize],
        threshold: f64,
    ) -> bool;
}

/// Sampler responsible for drawing minimal samples from the data.
pub trait Sampler {
    /// Draw `sample_size` row indices into `out_indices`.
    ///
    /// Returns `false` if no sample could be drawn (e.g. too few rows).
    fn sample(&mut self, data: &DataMatrix, sample_size: usize, out_indices: &mut [usize]) -> bool;

    /// Feedback hook after each iteration.
    fn update(&mut self, sample: &[usize], sample_size: usize, iteration: usize, score_hint: f64);
}

/// Scoring strategy used to rank models and determine their inliers.
pub trait Scoring<M> {
    /// Greater is better.
    type Score: Clone + PartialOrd;

    fn threshold(&self) -> f64;

    /// Score `model` and write its inlier rows to `inliers_out`.
    fn score(&self, data: &DataMatrix, model: &M, inliers_out: &mut Vec<usize>) -> Self::Score;
}

/// Refinement of a model using its inliers.
pub trait LocalOptimizer<M, Sc: Scoring<M>> {
    /// Returns `(refined_model, refined_score, refined_inliers)`.
    fn run(
        &mut self,
        data: &DataMatrix,
        inliers: &[usize],
        model: &M,
        best_score: &Sc::Score,
        scoring: &Sc,
    ) -> (M, Sc::Score, Vec<usize>);
}

/// Refits the model to all current inliers and re-scores it.
///
/// The refit replaces the input model unless it scores worse.
pub struct LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    estimator: E,
}

impl<E> LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }
}

impl<E, Sc> LocalOptimizer<E::Model, Sc> for LeastSquaresOptimizer<E>
where
    E: Estimator,
    Sc: Scoring<E::Model>,
{
    fn run(
        &mut self,
        data: &DataMatrix,
        inliers: &[usize],
        model: &E::Model,
        best_score: &Sc::Score,
        scoring: &Sc,
    ) -> (E::Model, Sc::Score, Vec<usize>) {
        let unchanged = || (model.clone(), best_score.clone(), inliers.to_vec());
        if inliers.len() < self.estimator.sample_size() {
            return unchanged();
        }

        let Some(refined) = self
            .estimator
            .estimate_model_nonminimal(data, inliers)
            .into_iter()
            .next()
        else {
            return unchanged();
        };
        if !self
            .estimator
            .is_valid_model(&refined, data, inliers, scoring.threshold())
        {
            return unchanged();
        }

        let mut refined_inliers = Vec::with_capacity(inliers.len());
        let refined_score = scoring.score(data, &refined, &mut refined_inliers);
        if refined_score >= *best_score {
            (refined, refined_score, refined_inliers)
        } else {
            unchanged()
        }
    }
}

/// Decides when the loop may stop.
pub trait TerminationCriterion<S> {
    /// May lower `max_iterations`; returns `true` to stop immediately.
    fn check(
        &mut self,
        data: &DataMatrix,
        best_score: &S,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool;
}

/// Adaptive iteration budget from the current inlier ratio:
/// `N = log(1 - confidence) / log(1 - inlier_ratio^sample_size)`.
pub struct RansacTerminationCriterion {
    /// Desired confidence in \[0, 1\).
    pub confidence: f64,
}

impl TerminationCriterion<Score> for RansacTerminationCriterion {
    fn check(
        &mut self,
        data: &DataMatrix,
        best_score: &Score,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        let n = data.nrows() as f64;
        if n <= 0.0 {
            return false;
        }

        let inlier_ratio = (best_score.inlier_count as f64 / n).clamp(0.0, 1.0);
        if inlier_ratio >= 1.0 {
            // Every row agrees; nothing left to look for.
            *max_iterations = 0;
            return true;
        }
        if inlier_ratio <= 0.0 {
            return false;
        }

        let p_good_sample = inlier_ratio.powi(sample_size as i32);
        if p_good_sample <= 0.0 || p_good_sample >= 1.0 {
            return false;
        }

        let log_one_minus_conf = (1.0 - self.confidence).ln();
        let log_one_minus_p = (1.0 - p_good_sample).ln();
        if !log_one_minus_conf.is_finite() || !log_one_minus_p.is_finite() {
            return false;
        }

        let required = (log_one_minus_conf / log_one_minus_p).ceil().max(1.0) as usize;
        if required < *max_iterations {
            *max_iterations = required;
        }
        false
    }
}

/// Generic RANSAC pipeline orchestrating the above components.
pub struct Ransac<E, Sa, Sc, LO, T>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring<E::Model>,
    LO: LocalOptimizer<E::Model, Sc>,
    T: TerminationCriterion<Sc::Score>,
{
    pub settings: RansacSettings,
    pub estimator: E,
    pub sampler: Sa,
    pub scoring: Sc,
    pub final_optimizer: Option<LO>,
    pub termination: T,

    pub best_model: Option<E::Model>,
    pub best_inliers: Vec<usize>,
    pub best_score: Option<Sc::Score>,
    pub iteration: usize,
}

impl<E, Sa, Sc, LO, T> Ransac<E, Sa, Sc, LO, T>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring<E::Model>,
    LO: LocalOptimizer<E::Model, Sc>,
    T: TerminationCriterion<Sc::Score>,
{
    pub fn new(
        settings: RansacSettings,
        estimator: E,
        sampler: Sa,
        scoring: Sc,
        final_optimizer: Option<LO>,
        termination: T,
    ) -> Self {
        Self {
            settings,
            estimator,
            sampler,
            scoring,
            final_optimizer,
            termination,
            best_model: None,
            best_inliers: Vec::new(),
            best_score: None,
            iteration: 0,
        }
    }

    /// Run the loop on `data`; results are left in the `best_*` fields.
    pub fn run(&mut self, data: &DataMatrix) {
        let sample_size = self.estimator.sample_size();
        let mut sample = vec![0usize; sample_size];
        let mut tmp_inliers = Vec::new();

        let mut max_iterations = self.settings.max_iterations;
        let min_iterations = self.settings.min_iterations.min(max_iterations);

        self.best_inliers.clear();
        self.best_model = None;
        self.best_score = None;
        self.iteration = 0;

        if data.nrows() < sample_size {
            return;
        }

        let threshold = self.scoring.threshold();

        while self.iteration < max_iterations || self.iteration < min_iterations {
            let mut models: Vec<E::Model> = Vec::new();

            for _ in 0..100 {
                if !self.sampler.sample(data, sample_size, &mut sample[..])
                    || !self.estimator.is_valid_sample(data, &sample)
                {
                    self.sampler.update(&sample, sample_size, self.iteration, 0.0);
                    continue;
                }

                models = self.estimator.estimate_model(data, &sample);
                if !models.is_empty() {
                    break;
                }
                self.sampler.update(&sample, sample_size, self.iteration, 0.0);
            }

            if models.is_empty() {
                self.iteration += 1;
                continue;
            }

            let mut iteration_improved_best = false;

            for model in models.iter() {
                if !self.estimator.is_valid_model(model, data, &sample, threshold) {
                    continue;
                }

                let score = self.scoring.score(data, model, &mut tmp_inliers);
                let better = match &self.best_score {
                    None => true,
                    Some(best) => score > *best,
                };

                if better {
                    self.best_score = Some(score);
                    self.best_model = Some(model.clone());
                    self.best_inliers.clear();
                    self.best_inliers.extend_from_slice(&tmp_inliers);
                    iteration_improved_best = true;
                }
            }

            if iteration_improved_best {
                if let Some(best_score) = &self.best_score {
                    if self
                        .termination
                        .check(data, best_score, sample_size, &mut max_iterations)
                    {
                        self.iteration += 1;
                        break;
                    }
                }
            }

            self.sampler.update(&sample, sample_size, self.iteration, 0.0);
            self.iteration += 1;
        }

        if let (Some(final_opt), Some(best_model), Some(best_score)) = (
            &mut self.final_optimizer,
            &self.best_model,
            &self.best_score,
        ) {
            if self.best_inliers.len() >= sample_size {
                let (refined_model, refined_score, refined_inliers) = final_opt.run(
                    data,
                    &self.best_inliers,
                    best_model,
                    best_score,
                    &self.scoring,
                );
                self.best_model = Some(refined_model);
                self.best_score = Some(refined_score);
                self.best_inliers = refined_inliers;
            }
        }

        log::debug!(
            "ransac: {} iterations, {} inliers of {} rows",
            self.iteration,
            self.best_inliers.len(),
            data.nrows()
        );
    }
}
