//! Tunables for matching and the RANSAC loop.
//!
//! All structs deserialize from JSON with missing fields filled from
//! `Default`, so a config file only needs the values it changes:
//!
//! ```json
//! { "ratio": 0.7, "ransac": { "max_iterations": 500 } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

/// RANSAC loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacSettings {
    /// Iterations run even when the adaptive budget says fewer suffice.
    pub min_iterations: usize,
    /// Hard cap on iterations.
    pub max_iterations: usize,
    /// Desired probability of drawing at least one all-inlier sample, in \[0, 1\).
    pub confidence: f64,
    /// Sampler seed; a fixed seed keeps matching reproducible.
    pub seed: u64,
    /// Refit the winning model to all of its inliers.
    pub final_refit: bool,
}

impl Default for RansacSettings {
    fn default() -> Self {
        Self {
            min_iterations: 0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 0x5EED,
            final_refit: true,
        }
    }
}

/// Matching configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Lowe ratio in (0, 1); smaller is stricter.
    pub ratio: f64,
    /// Maximum reprojection error (target pixels) for a RANSAC inlier.
    pub ransac_threshold: f64,
    pub ransac: RansacSettings,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            ratio: 0.75,
            ransac_threshold: 3.0,
            ransac: RansacSettings::default(),
        }
    }
}

impl MatchSettings {
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_ransac_threshold(mut self, threshold: f64) -> Self {
        self.ransac_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.ratio > 0.0 && self.ratio < 1.0) {
            return Err(FeatureError::InvalidParameter(format!(
                "ratio must be in (0, 1), got {}",
                self.ratio
            )));
        }
        if !(self.ransac_threshold.is_finite() && self.ransac_threshold > 0.0) {
            return Err(FeatureError::InvalidParameter(format!(
                "ransac_threshold must be positive, got {}",
                self.ransac_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.ransac.confidence) {
            return Err(FeatureError::InvalidParameter(format!(
                "confidence must be in [0, 1), got {}",
                self.ransac.confidence
            )));
        }
        Ok(())
    }
}

/// Load and validate [`MatchSettings`] from a JSON file.
pub fn load_match_settings(path: &Path) -> Result<MatchSettings> {
    let data = fs::read_to_string(path)?;
    let settings: MatchSettings = serde_json::from_str(&data)?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = MatchSettings::default();
        assert!(cfg.validate().is_ok());
        assert!((cfg.ratio - 0.75).abs() < 1e-12);
        assert!((cfg.ransac_threshold - 3.0).abs() < 1e-12);
        assert_eq!(cfg.ransac.max_iterations, 2000);
        assert!(cfg.ransac.final_refit);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: MatchSettings =
            serde_json::from_str(r#"{"ratio": 0.6, "ransac": {"seed": 7}}"#).unwrap();
        assert!((cfg.ratio - 0.6).abs() < 1e-12);
        assert_eq!(cfg.ransac.seed, 7);
        assert_eq!(cfg.ransac.max_iterations, 2000);
        assert_eq!(cfg.ransac_threshold, MatchSettings::default().ransac_threshold);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for bad in [
            MatchSettings::default().with_ratio(0.0),
            MatchSettings::default().with_ratio(1.0),
            MatchSettings::default().with_ratio(f64::NAN),
            MatchSettings::default().with_ransac_threshold(0.0),
            MatchSettings::default().with_ransac_threshold(f64::INFINITY),
        ] {
            assert!(matches!(
                bad.validate(),
                Err(FeatureError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn loads_from_file() {
        let name = format!("orb-match-settings-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, r#"{"ransac_threshold": 5.0}"#).unwrap();
        let cfg = load_match_settings(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.ransac_threshold, 5.0);
        assert_eq!(cfg.ratio, 0.75);

        let missing = std::env::temp_dir().join("orb-match-settings-does-not-exist.json");
        assert!(matches!(load_match_settings(&missing), Err(FeatureError::Io(_))));
    }
}
