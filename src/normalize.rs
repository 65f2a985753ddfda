//! Conversion of keypoint positions between pixel space and the unit square.
//!
//! Normalized coordinates are only meaningful together with the image size
//! they were computed against; [`FeatureSet`](crate::features::FeatureSet)
//! keeps the two together.

use crate::error::{FeatureError, Result};
use crate::types::{ImageSize, Keypoint};

fn check(size: ImageSize) -> Result<(f64, f64)> {
    if size.is_degenerate() {
        return Err(FeatureError::InvalidDimension {
            width: size.width,
            height: size.height,
        });
    }
    Ok((size.width as f64, size.height as f64))
}

/// Map a pixel-space keypoint to `[0, 1]` coordinates relative to `size`.
pub fn normalize(kp: &Keypoint, size: ImageSize) -> Result<Keypoint> {
    let (w, h) = check(size)?;
    Ok(kp.at(kp.x / w, kp.y / h))
}

/// Inverse of [`normalize`] for the same `size`.
pub fn denormalize(kp: &Keypoint, size: ImageSize) -> Result<Keypoint> {
    let (w, h) = check(size)?;
    Ok(kp.at(kp.x * w, kp.y * h))
}

pub fn normalize_all(kps: &[Keypoint], size: ImageSize) -> Result<Vec<Keypoint>> {
    let (w, h) = check(size)?;
    Ok(kps.iter().map(|kp| kp.at(kp.x / w, kp.y / h)).collect())
}

pub fn denormalize_all(kps: &[Keypoint], size: ImageSize) -> Result<Vec<Keypoint>> {
    let (w, h) = check(size)?;
    Ok(kps.iter().map(|kp| kp.at(kp.x * w, kp.y * h)).collect())
}
