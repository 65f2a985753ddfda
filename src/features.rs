//! Keypoints paired with their descriptor rows.

use crate::coords::Roi;
use crate::descriptors::DescriptorMatrix;
use crate::error::{FeatureError, Result};
use crate::normalize::{denormalize_all, normalize_all};
use crate::types::{ImageSize, Keypoint};

/// Coordinate space of the keypoints held by a [`FeatureSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSpace {
    /// Pixel coordinates of the image described by `image_size`.
    Pixels,
    /// Unit-square coordinates relative to `image_size`.
    Normalized,
}

/// Detection result: keypoint `i` is described by descriptor row `i`.
///
/// The constructor refuses mismatched lengths and every transformation moves
/// keypoints and rows together, so the pairing cannot be broken from outside.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    keypoints: Vec<Keypoint>,
    descriptors: DescriptorMatrix,
    image_size: ImageSize,
    space: CoordinateSpace,
}

impl FeatureSet {
    /// Feature set in pixel coordinates of an image of `image_size`.
    pub fn new(
        keypoints: Vec<Keypoint>,
        descriptors: DescriptorMatrix,
        image_size: ImageSize,
    ) -> Result<Self> {
        Self::with_space(keypoints, descriptors, image_size, CoordinateSpace::Pixels)
    }

    pub fn with_space(
        keypoints: Vec<Keypoint>,
        descriptors: DescriptorMatrix,
        image_size: ImageSize,
        space: CoordinateSpace,
    ) -> Result<Self> {
        if keypoints.len() != descriptors.rows() {
            return Err(FeatureError::InvalidFormat(format!(
                "{} keypoints but {} descriptor rows",
                keypoints.len(),
                descriptors.rows()
            )));
        }
        if space == CoordinateSpace::Normalized && image_size.is_degenerate() {
            return Err(FeatureError::InvalidDimension {
                width: image_size.width,
                height: image_size.height,
            });
        }
        Ok(Self {
            keypoints,
            descriptors,
            image_size,
            space,
        })
    }

    /// Feature set with no keypoints.
    pub fn empty(image_size: ImageSize) -> Self {
        Self {
            keypoints: Vec::new(),
            descriptors: DescriptorMatrix::empty(crate::descriptors::ORB_DESCRIPTOR_BYTES),
            image_size,
            space: CoordinateSpace::Pixels,
        }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &DescriptorMatrix {
        &self.descriptors
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    /// `(keypoint, descriptor row)` pairs in detection order.
    pub fn iter(&self) -> impl Iterator<Item = (&Keypoint, &[u8])> + '_ {
        self.keypoints.iter().zip(self.descriptors.iter_rows())
    }

    /// Same features with keypoints in unit-square coordinates.
    pub fn normalized(&self) -> Result<Self> {
        match self.space {
            CoordinateSpace::Normalized => Ok(self.clone()),
            CoordinateSpace::Pixels => Ok(Self {
                keypoints: normalize_all(&self.keypoints, self.image_size)?,
                descriptors: self.descriptors.clone(),
                image_size: self.image_size,
                space: CoordinateSpace::Normalized,
            }),
        }
    }

    /// Same features with keypoints in pixel coordinates.
    pub fn denormalized(&self) -> Result<Self> {
        match self.space {
            CoordinateSpace::Pixels => Ok(self.clone()),
            CoordinateSpace::Normalized => Ok(Self {
                keypoints: denormalize_all(&self.keypoints, self.image_size)?,
                descriptors: self.descriptors.clone(),
                image_size: self.image_size,
                space: CoordinateSpace::Pixels,
            }),
        }
    }

    /// Keep the features for which `keep` returns `true`.
    pub fn retain<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Keypoint) -> bool,
    {
        let indices: Vec<usize> = self
            .keypoints
            .iter()
            .enumerate()
            .filter(|(_, kp)| keep(kp))
            .map(|(i, _)| i)
            .collect();
        Self {
            keypoints: indices.iter().map(|&i| self.keypoints[i]).collect(),
            descriptors: self.descriptors.select_rows(&indices),
            image_size: self.image_size,
            space: self.space,
        }
    }

    /// Restrict to the features inside `roi` and express them in ROI-local
    /// pixel coordinates; the resulting image size is the ROI size.
    pub fn crop(&self, roi: &Roi) -> Result<Self> {
        let pixels = self.denormalized()?;
        let kept = pixels.retain(|kp| roi.contains(kp.x, kp.y));
        let (dx, dy) = (roi.x as f64, roi.y as f64);
        Ok(Self {
            keypoints: kept
                .keypoints
                .iter()
                .map(|kp| kp.at(kp.x - dx, kp.y - dy))
                .collect(),
            descriptors: kept.descriptors,
            image_size: roi.size(),
            space: CoordinateSpace::Pixels,
        })
    }

    /// Move ROI-local pixel features back into the coordinates of the full
    /// image of size `image_size`.
    pub fn offset_by(&self, roi: &Roi, image_size: ImageSize) -> Result<Self> {
        let pixels = self.denormalized()?;
        let (dx, dy) = (roi.x as f64, roi.y as f64);
        Ok(Self {
            keypoints: pixels
                .keypoints
                .iter()
                .map(|kp| kp.at(kp.x + dx, kp.y + dy))
                .collect(),
            descriptors: pixels.descriptors,
            image_size,
            space: CoordinateSpace::Pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureSet {
        let kps = vec![
            Keypoint::new(5.0, 5.0),
            Keypoint::new(50.0, 40.0),
            Keypoint::new(70.0, 10.0),
        ];
        let desc = DescriptorMatrix::from_rows(&[[1u8; 4], [2u8; 4], [3u8; 4]]).unwrap();
        FeatureSet::new(kps, desc, ImageSize::new(100, 50)).unwrap()
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let desc = DescriptorMatrix::from_rows(&[[0u8; 32]]).unwrap();
        let err = FeatureSet::new(vec![], desc, ImageSize::new(10, 10)).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidFormat(_)));
    }

    #[test]
    fn normalized_requires_real_size() {
        let err = FeatureSet::with_space(
            vec![],
            DescriptorMatrix::empty(32),
            ImageSize::new(0, 0),
            CoordinateSpace::Normalized,
        )
        .unwrap_err();
        assert!(matches!(err, FeatureError::InvalidDimension { .. }));
    }

    #[test]
    fn crop_keeps_pairing_and_shifts() {
        let set = sample();
        let cropped = set.crop(&Roi::new(40, 0, 40, 50)).unwrap();
        assert_eq!(cropped.len(), 2);
        assert_eq!(cropped.image_size(), ImageSize::new(40, 50));
        let pairs: Vec<_> = cropped.iter().map(|(kp, row)| (kp.x, kp.y, row[0])).collect();
        assert_eq!(pairs, vec![(10.0, 40.0, 2), (30.0, 10.0, 3)]);

        let back = cropped
            .offset_by(&Roi::new(40, 0, 40, 50), set.image_size())
            .unwrap();
        assert_eq!(back.keypoints()[0], set.keypoints()[1]);
        assert_eq!(back.descriptors().row(1), set.descriptors().row(2));
    }

    #[test]
    fn normalize_round_trip_keeps_descriptors() {
        let set = sample();
        let n = set.normalized().unwrap();
        assert_eq!(n.space(), CoordinateSpace::Normalized);
        assert_eq!(n.keypoints()[1].x, 0.5);
        assert_eq!(n.descriptors(), set.descriptors());
        let back = n.denormalized().unwrap();
        assert_eq!(back.space(), CoordinateSpace::Pixels);
        for (a, b) in back.keypoints().iter().zip(set.keypoints()) {
            assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
        }
    }

    #[test]
    fn retain_filters_rows_too() {
        let kept = sample().retain(|kp| kp.y < 20.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.descriptors().as_bytes(), &[1, 1, 1, 1, 3, 3, 3, 3]);
    }
}
