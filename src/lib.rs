//! # orb-match - Locate a detected region in a second image
//!
//! `orb-match` takes ORB keypoints and binary descriptors detected in a region
//! of one image, stores them in a portable JSON feature file, and later finds
//! that region in another image: brute-force Hamming k-NN, Lowe's ratio test
//! and a RANSAC homography.
//!
//! Feature detection itself happens elsewhere; this crate starts from
//! keypoints plus descriptor bytes.
//!
//! ## Quick Start
//!
//! ```rust
//! use orb_match::{
//!     export_features, import_features, match_features, DescriptorMatrix, FeatureSet,
//!     ImageSize, Keypoint, MatchSettings,
//! };
//!
//! let size = ImageSize::new(100, 100);
//! let keypoints = vec![Keypoint::new(10.0, 20.0), Keypoint::new(60.0, 35.0)];
//! let descriptors = DescriptorMatrix::from_rows(&[[0x0Fu8; 32], [0xF0u8; 32]]).unwrap();
//! let reference = FeatureSet::new(keypoints, descriptors, size).unwrap();
//!
//! // Persist, reload, match.
//! let json = export_features(&reference).unwrap();
//! let reloaded = import_features(&json).unwrap();
//! let result = match_features(&reloaded, &reference, &MatchSettings::default()).unwrap();
//!
//! // Two correspondences are not enough for a homography.
//! assert!(result.homography.is_none());
//! ```
//!
//! ## Coordinates
//!
//! Feature files always store keypoints normalized by their image size, so a
//! file stays meaningful when the image is displayed at another scale.
//! [`match_features`] brings both sides back to pixels with their own sizes;
//! the resulting homography maps source pixels (crop-local when the reference
//! was [cropped](FeatureSet::crop)) to target pixels.
//!
//! ## Extending the RANSAC loop
//!
//! The estimation loop in [`core`] is generic over the same traits it uses
//! internally:
//!
//! - **[`Estimator`](core::Estimator)**: model hypotheses from samples
//! - **[`Sampler`](core::Sampler)**: sampling strategy
//! - **[`Scoring<M>`](core::Scoring)**: hypothesis ranking and inlier selection
//! - **[`LocalOptimizer<M, S>`](core::LocalOptimizer)**: refinement of the best model
//! - **[`TerminationCriterion<S>`](core::TerminationCriterion)**: adaptive iteration budget
//!
//! ## Modules
//!
//! - **[`types`]**, **[`descriptors`]**, **[`features`]**: keypoints, descriptor
//!   matrices, paired feature sets
//! - **[`codec`]**, **[`format`]**: base64 and the JSON feature file
//! - **[`normalize`]**, **[`coords`]**: coordinate conversions, ROIs, display scaling
//! - **[`matching`]**: k-NN and ratio test
//! - **[`core`]**, **[`estimators`]**, **[`samplers`]**, **[`scoring`]**, **[`models`]**: RANSAC
//! - **[`api`]**: high-level entry points
//! - **[`session`]**: the detect / export / match workflow as a state machine
//! - **[`settings`]**: tunables, loadable from JSON

pub mod api;
pub mod codec;
pub mod coords;
pub mod core;
pub mod descriptors;
pub mod error;
pub mod estimators;
pub mod features;
pub mod format;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod samplers;
pub mod scoring;
pub mod session;
pub mod settings;
pub mod types;
pub mod utils;

// Re-export high-level API
pub use api::{estimate_homography, match_features, EstimationResult, MatchResult};
pub use format::{export_features, import_features, FeatureDocument};
pub use matching::{knn_match, match_descriptors, ratio_test, Correspondence};

// Re-export data types
pub use coords::{DisplayScale, Roi};
pub use descriptors::{hamming_distance, DescriptorMatrix};
pub use error::{FeatureError, Result};
pub use features::{CoordinateSpace, FeatureSet};
pub use models::Homography;
pub use types::{ImageSize, Keypoint};

// Re-export core traits for easy access
pub use crate::core::{Estimator, LocalOptimizer, Sampler, Scoring, TerminationCriterion};

pub use session::{Session, SessionState};
pub use settings::{load_match_settings, MatchSettings, RansacSettings};
