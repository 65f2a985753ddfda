//! Explicit workflow state for "detect in A, export, match in B".
//!
//! ```text
//! Idle -> ImageALoaded -> Detected -> ImageBLoaded -> Matched
//!                            ^  (import)                 |
//!                            +---------------------------+ (new image B)
//! ```
//!
//! Every operation either performs its transition or returns an error and
//! leaves the session exactly as it was.

use crate::api::{match_features, MatchResult};
use crate::error::{FeatureError, Result};
use crate::features::FeatureSet;
use crate::format::{export_features, import_features};
use crate::settings::MatchSettings;
use crate::types::ImageSize;

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    ImageALoaded {
        image_a: ImageSize,
    },
    Detected {
        reference: FeatureSet,
    },
    ImageBLoaded {
        reference: FeatureSet,
        image_b: ImageSize,
    },
    Matched {
        reference: FeatureSet,
        image_b: ImageSize,
        result: MatchResult,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::ImageALoaded { .. } => "ImageALoaded",
            SessionState::Detected { .. } => "Detected",
            SessionState::ImageBLoaded { .. } => "ImageBLoaded",
            SessionState::Matched { .. } => "Matched",
        }
    }

    fn reference(&self) -> Option<&FeatureSet> {
        match self {
            SessionState::Detected { reference }
            | SessionState::ImageBLoaded { reference, .. }
            | SessionState::Matched { reference, .. } => Some(reference),
            SessionState::Idle | SessionState::ImageALoaded { .. } => None,
        }
    }
}

fn check_size(size: ImageSize) -> Result<()> {
    if size.is_degenerate() {
        return Err(FeatureError::InvalidDimension {
            width: size.width,
            height: size.height,
        });
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Reference features, once detected or imported.
    pub fn reference(&self) -> Option<&FeatureSet> {
        self.state.reference()
    }

    pub fn result(&self) -> Option<&MatchResult> {
        match &self.state {
            SessionState::Matched { result, .. } => Some(result),
            _ => None,
        }
    }

    fn invalid(&self, expected: &'static str) -> FeatureError {
        FeatureError::InvalidState {
            expected,
            found: self.state.name(),
        }
    }

    /// Start over with a new image A. Allowed from any state.
    pub fn load_image_a(&mut self, size: ImageSize) -> Result<()> {
        check_size(size)?;
        self.state = SessionState::ImageALoaded { image_a: size };
        Ok(())
    }

    /// Record features detected in image A (typically in a crop of it).
    pub fn set_reference(&mut self, features: FeatureSet) -> Result<()> {
        if !matches!(self.state, SessionState::ImageALoaded { .. }) {
            return Err(self.invalid("ImageALoaded"));
        }
        check_size(features.image_size())?;
        log::debug!("reference set with {} features", features.len());
        self.state = SessionState::Detected {
            reference: features,
        };
        Ok(())
    }

    /// Replace the reference with features from a JSON feature file.
    /// Allowed from any state.
    pub fn import_reference(&mut self, json: &str) -> Result<()> {
        let reference = import_features(json)?;
        log::debug!("imported reference with {} features", reference.len());
        self.state = SessionState::Detected { reference };
        Ok(())
    }

    /// JSON feature file of the current reference.
    pub fn export_reference(&self) -> Result<String> {
        let reference = self.reference().ok_or_else(|| self.invalid("Detected"))?;
        export_features(reference)
    }

    /// Load the image to search in. Requires a reference.
    pub fn load_image_b(&mut self, size: ImageSize) -> Result<()> {
        check_size(size)?;
        let reference = self
            .reference()
            .cloned()
            .ok_or_else(|| self.invalid("Detected"))?;
        self.state = SessionState::ImageBLoaded {
            reference,
            image_b: size,
        };
        Ok(())
    }

    /// Match the reference against features detected in image B.
    ///
    /// Unlike [`match_features`], an empty reference is reported as
    /// [`FeatureError::EmptyDescriptors`].
    pub fn match_target(
        &mut self,
        target: &FeatureSet,
        settings: &MatchSettings,
    ) -> Result<&MatchResult> {
        let (reference, image_b) = match &self.state {
            SessionState::ImageBLoaded { reference, image_b }
            | SessionState::Matched {
                reference, image_b, ..
            } => (reference, *image_b),
            _ => return Err(self.invalid("ImageBLoaded")),
        };
        if reference.is_empty() {
            return Err(FeatureError::EmptyDescriptors);
        }
        if target.image_size() != image_b {
            log::warn!(
                "target features are for a {}x{} image, image B is {}x{}",
                target.image_size().width,
                target.image_size().height,
                image_b.width,
                image_b.height
            );
        }

        let result = match_features(reference, target, settings)?;
        let reference = reference.clone();
        self.state = SessionState::Matched {
            reference,
            image_b,
            result,
        };
        self.result().ok_or_else(|| self.invalid("Matched"))
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }
}
