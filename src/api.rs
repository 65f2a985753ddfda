//! High-level entry points: robust homography estimation and end-to-end
//! feature matching.

use crate::coords::Roi;
use crate::core::{LeastSquaresOptimizer, Ransac, RansacTerminationCriterion};
use crate::error::{FeatureError, Result};
use crate::estimators::HomographyEstimator;
use crate::features::FeatureSet;
use crate::matching::{match_descriptors, Correspondence};
use crate::models::Homography;
use crate::samplers::UniformRandomSampler;
use crate::scoring::{RansacInlierCountScoring, Score};
use crate::settings::{MatchSettings, RansacSettings};
use crate::types::DataMatrix;

/// Minimum number of correspondences a homography can be fitted to.
pub const MIN_HOMOGRAPHY_CORRESPONDENCES: usize = 4;

/// Result of a RANSAC estimation.
#[derive(Debug, Clone)]
pub struct EstimationResult<M> {
    pub model: M,
    /// Indices of inlier correspondences, ascending.
    pub inliers: Vec<usize>,
    pub score: Score,
    pub iterations: usize,
}

/// Estimate the homography mapping `src[i]` onto `dst[i]`.
///
/// Inliers are correspondences whose forward reprojection error is below
/// `threshold`. Returns `Ok(None)` when no valid model exists (too few points
/// or degenerate geometry).
pub fn estimate_homography(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    threshold: f64,
    settings: &RansacSettings,
) -> Result<Option<EstimationResult<Homography>>> {
    if src.len() != dst.len() {
        return Err(FeatureError::InvalidParameter(format!(
            "{} source points but {} target points",
            src.len(),
            dst.len()
        )));
    }
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(FeatureError::InvalidParameter(format!(
            "threshold must be positive, got {threshold}"
        )));
    }
    if src.len() < MIN_HOMOGRAPHY_CORRESPONDENCES {
        return Ok(None);
    }

    // Rows: [x_src, y_src, x_dst, y_dst]
    let mut data = DataMatrix::zeros(src.len(), 4);
    for (i, (s, d)) in src.iter().zip(dst).enumerate() {
        data[(i, 0)] = s[0];
        data[(i, 1)] = s[1];
        data[(i, 2)] = d[0];
        data[(i, 3)] = d[1];
    }

    let scoring =
        RansacInlierCountScoring::new(threshold, |data: &DataMatrix, model: &Homography, idx| {
            let src = [data[(idx, 0)], data[(idx, 1)]];
            let dst = [data[(idx, 2)], data[(idx, 3)]];
            model.transfer_error(src, dst)
        });
    let final_optimizer = settings
        .final_refit
        .then(|| LeastSquaresOptimizer::new(HomographyEstimator::new()));
    let termination = RansacTerminationCriterion {
        confidence: settings.confidence,
    };

    let mut ransac = Ransac::new(
        settings.clone(),
        HomographyEstimator::new(),
        UniformRandomSampler::from_seed(settings.seed),
        scoring,
        final_optimizer,
        termination,
    );
    ransac.run(&data);

    Ok(match (ransac.best_model, ransac.best_score) {
        (Some(model), Some(score)) => {
            let mut inliers = ransac.best_inliers;
            inliers.sort_unstable();
            Some(EstimationResult {
                model,
                inliers,
                score,
                iterations: ransac.iteration,
            })
        }
        _ => None,
    })
}

/// Outcome of [`match_features`].
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Ratio-test survivors, ascending by descriptor distance.
    pub correspondences: Vec<Correspondence>,
    /// Source-pixel to target-pixel homography, when one could be fitted.
    pub homography: Option<Homography>,
    /// `inliers[i]` tells whether `correspondences[i]` agrees with the
    /// homography.
    pub inliers: Vec<bool>,
    pub inlier_count: usize,
    /// RANSAC iterations spent (0 when RANSAC did not run).
    pub iterations: usize,
}

impl MatchResult {
    fn without_homography(correspondences: Vec<Correspondence>) -> Self {
        Self {
            inliers: vec![false; correspondences.len()],
            correspondences,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.correspondences.is_empty()
    }

    /// Correspondences flagged as homography inliers, in result order.
    pub fn inlier_correspondences(&self) -> impl Iterator<Item = &Correspondence> + '_ {
        self.correspondences
            .iter()
            .zip(&self.inliers)
            .filter(|(_, inlier)| **inlier)
            .map(|(c, _)| c)
    }

    /// Fraction of correspondences that are inliers (0 when there are none).
    pub fn inlier_ratio(&self) -> f64 {
        if self.correspondences.is_empty() {
            0.0
        } else {
            self.inlier_count as f64 / self.correspondences.len() as f64
        }
    }

    /// Corners of a source-pixel region mapped into the target image, in
    /// [`Roi::corners`] order. For crop-local features pass
    /// `Roi::full(source.image_size())` to outline the whole crop.
    pub fn project_roi(&self, roi: &Roi) -> Option<[[f64; 2]; 4]> {
        let h = self.homography.as_ref()?;
        let c = roi.corners();
        Some([
            h.project(c[0])?,
            h.project(c[1])?,
            h.project(c[2])?,
            h.project(c[3])?,
        ])
    }
}

/// Match `source` features against `target` features.
///
/// Both sets are brought to pixel space with their own image size first, so
/// the homography maps source pixels to target pixels regardless of how
/// either set is stored. Empty inputs yield an empty result, not an error;
/// descriptors of different widths are [`FeatureError::InvalidFormat`].
pub fn match_features(
    source: &FeatureSet,
    target: &FeatureSet,
    settings: &MatchSettings,
) -> Result<MatchResult> {
    settings.validate()?;

    if source.is_empty() || target.is_empty() {
        log::debug!(
            "nothing to match: {} source / {} target descriptors",
            source.len(),
            target.len()
        );
        return Ok(MatchResult::default());
    }
    if source.descriptors().cols() != target.descriptors().cols() {
        return Err(FeatureError::InvalidFormat(format!(
            "descriptor width mismatch: source {} bytes, target {} bytes",
            source.descriptors().cols(),
            target.descriptors().cols()
        )));
    }

    let source = source.denormalized()?;
    let target = target.denormalized()?;

    let correspondences =
        match_descriptors(source.descriptors(), target.descriptors(), settings.ratio);
    if correspondences.len() < MIN_HOMOGRAPHY_CORRESPONDENCES {
        log::debug!(
            "{} correspondences survive the ratio test, skipping homography",
            correspondences.len()
        );
        return Ok(MatchResult::without_homography(correspondences));
    }

    let src: Vec<[f64; 2]> = correspondences
        .iter()
        .map(|c| {
            let kp = &source.keypoints()[c.source_index];
            [kp.x, kp.y]
        })
        .collect();
    let dst: Vec<[f64; 2]> = correspondences
        .iter()
        .map(|c| {
            let kp = &target.keypoints()[c.target_index];
            [kp.x, kp.y]
        })
        .collect();

    let estimate =
        estimate_homography(&src, &dst, settings.ransac_threshold, &settings.ransac)?;
    let Some(estimate) = estimate else {
        log::debug!(
            "no homography consistent with {} correspondences",
            correspondences.len()
        );
        return Ok(MatchResult::without_homography(correspondences));
    };

    let mut inliers = vec![false; correspondences.len()];
    for &i in &estimate.inliers {
        inliers[i] = true;
    }
    log::debug!(
        "homography: {} of {} correspondences are inliers after {} iterations",
        estimate.inliers.len(),
        correspondences.len(),
        estimate.iterations
    );

    Ok(MatchResult {
        correspondences,
        homography: Some(estimate.model),
        inlier_count: estimate.inliers.len(),
        inliers,
        iterations: estimate.iterations,
    })
}
