//! Estimators for geometric models.

pub mod homography;

pub use homography::HomographyEstimator;
