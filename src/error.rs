//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

/// Recoverable failures reported by feature import, normalization and matching.
///
/// None of these leave partially updated state behind: callers can retry with
/// corrected input.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The document or container has an unexpected shape or type tag.
    #[error("invalid feature format: {0}")]
    InvalidFormat(String),
    /// Base64 descriptor payload is corrupt.
    #[error("descriptor payload could not be decoded: {0}")]
    Decode(#[from] base64::DecodeError),
    /// Normalization against a zero-sized image.
    #[error("invalid image dimension {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },
    /// No descriptors available to match.
    #[error("no descriptors to match")]
    EmptyDescriptors,
    /// A tunable is outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A session operation was called out of order.
    #[error("operation requires state {expected}, session is {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FeatureError>;
