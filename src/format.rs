//! Persisted JSON feature document.
//!
//! ```json
//! { "version": 1, "type": "ORB",
//!   "imageSize": { "width": 640, "height": 480 },
//!   "keypoints": [ { "x": 0.5, "y": 0.25, "size": 31.0, "angle": 90.0,
//!                    "response": 0.001, "octave": 0 } ],
//!   "descriptors": { "rows": 1, "cols": 32, "data": "<base64>" } }
//! ```
//!
//! Keypoints are stored normalized to `imageSize`, so every `x` and `y` lies
//! in `[0, 1]`. `descriptors` is `null` only when there are no keypoints. A
//! missing `imageSize` reads as 0x0 and is rejected as a dimension error.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptors::{DescriptorMatrix, ORB_DESCRIPTOR_BYTES};
use crate::error::{FeatureError, Result};
use crate::features::{CoordinateSpace, FeatureSet};
use crate::types::{ImageSize, Keypoint};

/// Type tag identifying the feature family.
pub const FEATURE_TYPE: &str = "ORB";
/// Newest document version this crate reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

/// Base64 descriptor block of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedDescriptors {
    pub rows: usize,
    pub cols: usize,
    pub data: String,
}

/// Wire shape of a feature file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDocument {
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub image_size: ImageSize,
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Option<EncodedDescriptors>,
}

impl FeatureDocument {
    /// Export a feature set; keypoints are normalized against its image size.
    pub fn from_feature_set(set: &FeatureSet) -> Result<Self> {
        let normalized = set.normalized()?;
        let descriptors = if normalized.is_empty() {
            None
        } else {
            let m = normalized.descriptors();
            Some(EncodedDescriptors {
                rows: m.rows(),
                cols: m.cols(),
                data: m.to_encoded(),
            })
        };
        Ok(Self {
            version: FORMAT_VERSION,
            kind: FEATURE_TYPE.to_string(),
            image_size: normalized.image_size(),
            keypoints: normalized.keypoints().to_vec(),
            descriptors,
        })
    }

    /// Validate the document and rebuild a normalized [`FeatureSet`].
    pub fn into_feature_set(self) -> Result<FeatureSet> {
        if self.kind != FEATURE_TYPE {
            return Err(FeatureError::InvalidFormat(format!(
                "expected feature type {FEATURE_TYPE:?}, found {:?}",
                self.kind
            )));
        }
        if self.version == 0 || self.version > FORMAT_VERSION {
            return Err(FeatureError::InvalidFormat(format!(
                "unsupported feature file version {}",
                self.version
            )));
        }
        if self.image_size.is_degenerate() {
            return Err(FeatureError::InvalidDimension {
                width: self.image_size.width,
                height: self.image_size.height,
            });
        }
        let in_unit_range = |v: f64| (0.0..=1.0).contains(&v);
        if let Some(kp) = self
            .keypoints
            .iter()
            .find(|kp| !in_unit_range(kp.x) || !in_unit_range(kp.y))
        {
            return Err(FeatureError::InvalidFormat(format!(
                "keypoint ({}, {}) is not normalized to [0, 1]",
                kp.x, kp.y
            )));
        }

        let descriptors = match self.descriptors {
            Some(enc) => DescriptorMatrix::from_encoded(enc.rows, enc.cols, &enc.data)?,
            None if self.keypoints.is_empty() => DescriptorMatrix::empty(ORB_DESCRIPTOR_BYTES),
            None => {
                return Err(FeatureError::InvalidFormat(format!(
                    "{} keypoints without descriptors",
                    self.keypoints.len()
                )))
            }
        };

        FeatureSet::with_space(
            self.keypoints,
            descriptors,
            self.image_size,
            CoordinateSpace::Normalized,
        )
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document. Shape errors surface as [`FeatureError::InvalidFormat`].
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| FeatureError::InvalidFormat(e.to_string()))
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        log::debug!(
            "wrote {} keypoints to {}",
            self.keypoints.len(),
            path.display()
        );
        Ok(())
    }

    pub fn read_from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Serialize a feature set straight to JSON text.
pub fn export_features(set: &FeatureSet) -> Result<String> {
    FeatureDocument::from_feature_set(set)?.to_json_string()
}

/// Parse and validate JSON text into a normalized feature set.
pub fn import_features(text: &str) -> Result<FeatureSet> {
    FeatureDocument::from_json_str(text)?.into_feature_set()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> FeatureSet {
        let kps = vec![
            Keypoint::new(320.0, 240.0).with_size(31.0).with_angle(12.5),
            Keypoint::new(64.0, 48.0).with_octave(1).with_class_id(3),
        ];
        let desc = DescriptorMatrix::from_rows(&[[0xAAu8; 32], [0x0Fu8; 32]]).unwrap();
        FeatureSet::new(kps, desc, ImageSize::new(640, 480)).unwrap()
    }

    #[test]
    fn export_writes_normalized_keypoints_and_base64() {
        let doc = FeatureDocument::from_feature_set(&set()).unwrap();
        assert_eq!(doc.version, FORMAT_VERSION);
        assert_eq!(doc.kind, "ORB");
        assert_eq!((doc.keypoints[0].x, doc.keypoints[0].y), (0.5, 0.5));
        let enc = doc.descriptors.as_ref().unwrap();
        assert_eq!((enc.rows, enc.cols), (2, 32));

        let json = doc.to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "ORB");
        assert_eq!(value["imageSize"]["width"], 640);
        assert!(value["descriptors"]["data"].is_string());
    }

    #[test]
    fn import_restores_set() {
        let original = set();
        let imported = import_features(&export_features(&original).unwrap()).unwrap();
        assert_eq!(imported.space(), CoordinateSpace::Normalized);
        assert_eq!(imported.descriptors(), original.descriptors());
        let pixels = imported.denormalized().unwrap();
        for (a, b) in pixels.keypoints().iter().zip(original.keypoints()) {
            assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
            assert_eq!(a.class_id, b.class_id);
        }
    }

    #[test]
    fn empty_set_exports_null_descriptors() {
        let json = export_features(&FeatureSet::empty(ImageSize::new(10, 10))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["descriptors"].is_null());
        assert!(import_features(&json).unwrap().is_empty());
    }

    #[test]
    fn rejects_wrong_type() {
        let mut doc = FeatureDocument::from_feature_set(&set()).unwrap();
        doc.kind = "SIFT".to_string();
        let err = doc.into_feature_set().unwrap_err();
        assert!(matches!(err, FeatureError::InvalidFormat(_)), "got {err:?}");
    }

    #[test]
    fn rejects_future_version() {
        let mut doc = FeatureDocument::from_feature_set(&set()).unwrap();
        doc.version = FORMAT_VERSION + 1;
        assert!(matches!(
            doc.into_feature_set(),
            Err(FeatureError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let mut doc = FeatureDocument::from_feature_set(&set()).unwrap();
        doc.keypoints.pop();
        assert!(matches!(
            doc.into_feature_set(),
            Err(FeatureError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_corrupt_payload() {
        let mut doc = FeatureDocument::from_feature_set(&set()).unwrap();
        if let Some(enc) = doc.descriptors.as_mut() {
            enc.data.replace_range(0..1, "*");
        }
        assert!(matches!(doc.into_feature_set(), Err(FeatureError::Decode(_))));
    }

    #[test]
    fn rejects_missing_descriptors_for_keypoints() {
        let mut doc = FeatureDocument::from_feature_set(&set()).unwrap();
        doc.descriptors = None;
        assert!(matches!(
            doc.into_feature_set(),
            Err(FeatureError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_zero_image_size() {
        let mut doc = FeatureDocument::from_feature_set(&set()).unwrap();
        doc.image_size = ImageSize::new(0, 480);
        assert!(matches!(
            doc.into_feature_set(),
            Err(FeatureError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn rejects_pixel_coordinates() {
        let json = r#"{
            "version": 1,
            "type": "ORB",
            "imageSize": { "width": 640, "height": 480 },
            "keypoints": [ { "x": 320.0, "y": 240.0, "size": 31.0, "angle": -1.0,
                             "response": 0.0, "octave": 0 } ],
            "descriptors": { "rows": 1, "cols": 32,
                             "data": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=" }
        }"#;
        let err = import_features(json).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidFormat(_)), "got {err:?}");

        for (x, y) in [(-0.01, 0.5), (0.5, 1.5), (f64::NAN, 0.5)] {
            let mut doc = FeatureDocument::from_feature_set(&set()).unwrap();
            doc.keypoints[0] = doc.keypoints[0].at(x, y);
            assert!(matches!(
                doc.into_feature_set(),
                Err(FeatureError::InvalidFormat(_))
            ));
        }

        // The unit square's edges are valid.
        let mut doc = FeatureDocument::from_feature_set(&set()).unwrap();
        doc.keypoints[0] = doc.keypoints[0].at(1.0, 0.0);
        assert!(doc.into_feature_set().is_ok());
    }

    #[test]
    fn missing_image_size_is_invalid_dimension() {
        let json = r#"{ "version": 1, "type": "ORB", "keypoints": [], "descriptors": null }"#;
        let err = import_features(json).unwrap_err();
        assert!(
            matches!(err, FeatureError::InvalidDimension { width: 0, height: 0 }),
            "got {err:?}"
        );
    }

    #[test]
    fn malformed_json_is_invalid_format() {
        for text in ["{", r#"{"version": 1}"#, r#"{"version":"x","type":"ORB"}"#] {
            assert!(matches!(
                FeatureDocument::from_json_str(text),
                Err(FeatureError::InvalidFormat(_))
            ));
        }
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("orb-match-{}.json", std::process::id()));
        let doc = FeatureDocument::from_feature_set(&set()).unwrap();
        doc.write_to_path(&path).unwrap();
        let read = FeatureDocument::read_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(read, doc);
    }
}
