//! Core shared types: keypoints, image sizes and the dense point matrix the
//! RANSAC pipeline operates on.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Dynamic row-major view of point correspondences.
///
/// Each row holds one correspondence `[x_src, y_src, x_dst, y_dst]`; the
/// estimators and samplers index rows of this matrix.
pub type DataMatrix = DMatrix<f64>;

/// A detected ORB keypoint.
///
/// `x`/`y` are either pixel coordinates or unit-interval coordinates relative to
/// an [`ImageSize`]; which one is tracked by the owning
/// [`FeatureSet`](crate::features::FeatureSet), never by the keypoint itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Diameter of the meaningful neighbourhood.
    #[serde(default)]
    pub size: f32,
    /// Orientation in degrees, `-1` when not computed.
    #[serde(default = "Keypoint::default_angle")]
    pub angle: f32,
    #[serde(default)]
    pub response: f32,
    /// Pyramid level the keypoint was detected on.
    #[serde(default)]
    pub octave: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i32>,
}

impl Keypoint {
    /// Keypoint at `(x, y)` with the remaining attributes left at their defaults.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            size: 0.0,
            angle: Self::default_angle(),
            response: 0.0,
            octave: 0,
            class_id: None,
        }
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_response(mut self, response: f32) -> Self {
        self.response = response;
        self
    }

    pub fn with_octave(mut self, octave: i32) -> Self {
        self.octave = octave;
        self
    }

    pub fn with_class_id(mut self, class_id: i32) -> Self {
        self.class_id = Some(class_id);
        self
    }

    /// Same keypoint with a different position.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    fn default_angle() -> f32 {
        -1.0
    }
}

/// Pixel dimensions of a source image (or crop).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either side is zero, which makes normalization undefined.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
