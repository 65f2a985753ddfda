//! Region-of-interest geometry and rendered/natural pixel conversions.
//!
//! Images are usually displayed at a size different from their natural pixel
//! size. Regions selected on screen are converted to natural pixels before
//! cropping, and results computed in natural pixels are converted back before
//! they are drawn.

use crate::error::{FeatureError, Result};
use crate::types::ImageSize;

/// Axis-aligned region in natural pixels of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering the whole image.
    pub fn full(size: ImageSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Half-open containment test: the right and bottom edges are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (x0, y0) = (self.x as f64, self.y as f64);
        x >= x0 && y >= y0 && x < x0 + self.width as f64 && y < y0 + self.height as f64
    }

    /// Corners in clockwise order starting at the top-left.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        let (x0, y0) = (self.x as f64, self.y as f64);
        let (x1, y1) = (x0 + self.width as f64, y0 + self.height as f64);
        [[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
    }

    /// Intersection with the image bounds, `None` when nothing is left.
    pub fn clamp_to(&self, size: ImageSize) -> Option<Roi> {
        if self.x >= size.width || self.y >= size.height {
            return None;
        }
        let width = self.width.min(size.width - self.x);
        let height = self.height.min(size.height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Roi::new(self.x, self.y, width, height))
    }
}

/// Scale between an image as rendered on screen and its natural pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    rendered_width: f64,
    rendered_height: f64,
    natural: ImageSize,
}

impl DisplayScale {
    pub fn new(rendered_width: f64, rendered_height: f64, natural: ImageSize) -> Result<Self> {
        let rendered_ok = rendered_width.is_finite()
            && rendered_height.is_finite()
            && rendered_width > 0.0
            && rendered_height > 0.0;
        if !rendered_ok || natural.is_degenerate() {
            return Err(FeatureError::InvalidDimension {
                width: natural.width,
                height: natural.height,
            });
        }
        Ok(Self {
            rendered_width,
            rendered_height,
            natural,
        })
    }

    pub fn natural(&self) -> ImageSize {
        self.natural
    }

    fn factors(&self) -> (f64, f64) {
        (
            self.natural.width as f64 / self.rendered_width,
            self.natural.height as f64 / self.rendered_height,
        )
    }

    pub fn to_natural(&self, p: [f64; 2]) -> [f64; 2] {
        let (sx, sy) = self.factors();
        [p[0] * sx, p[1] * sy]
    }

    pub fn to_rendered(&self, p: [f64; 2]) -> [f64; 2] {
        let (sx, sy) = self.factors();
        [p[0] / sx, p[1] / sy]
    }

    /// Convert an on-screen rectangle to a natural-pixel [`Roi`].
    ///
    /// Edges are rounded to the nearest pixel and the result is clamped to the
    /// image; `None` when the rectangle does not overlap the image.
    pub fn roi_to_natural(&self, x: f64, y: f64, width: f64, height: f64) -> Option<Roi> {
        let [x0, y0] = self.to_natural([x.max(0.0), y.max(0.0)]);
        let [x1, y1] = self.to_natural([(x + width).max(0.0), (y + height).max(0.0)]);
        let (x0, y0) = (x0.round(), y0.round());
        let (x1, y1) = (x1.round(), y1.round());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Roi::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32).clamp_to(self.natural)
    }

    /// On-screen `[x, y, width, height]` of a natural-pixel region.
    pub fn roi_to_rendered(&self, roi: &Roi) -> [f64; 4] {
        let [x, y] = self.to_rendered([roi.x as f64, roi.y as f64]);
        let [w, h] = self.to_rendered([roi.width as f64, roi.height as f64]);
        [x, y, w, h]
    }
}
