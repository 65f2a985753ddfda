//! Base64 text codec for binary descriptor payloads.
//!
//! Uses the standard alphabet with `=` padding so the output can be embedded in
//! JSON strings without escaping. Decoding is strict: the input length must be
//! a multiple of four and every character must belong to the alphabet.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::Result;

/// Encode raw bytes as padded base64 text.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode padded base64 text back into bytes.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}
