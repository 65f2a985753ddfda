//! Binary descriptor storage and Hamming distance.

use crate::codec;
use crate::error::{FeatureError, Result};

/// Byte width of a standard ORB descriptor (256 bits).
pub const ORB_DESCRIPTOR_BYTES: usize = 32;

/// Row-major matrix of binary descriptors, one row per keypoint.
///
/// The content of a row is an opaque bit pattern; the only operation defined on
/// it is [`hamming_distance`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorMatrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl DescriptorMatrix {
    /// Wrap `data` as a `rows x cols` matrix.
    pub fn new(rows: usize, cols: usize, data: Vec<u8>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(FeatureError::InvalidFormat(format!(
                "descriptor payload has {} bytes, expected {rows}x{cols}",
                data.len()
            )));
        }
        if rows > 0 && cols == 0 {
            return Err(FeatureError::InvalidFormat(
                "descriptor rows must have a non-zero width".to_string(),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Matrix with zero rows of the given width.
    pub fn empty(cols: usize) -> Self {
        Self {
            rows: 0,
            cols,
            data: Vec::new(),
        }
    }

    /// Build a matrix from equal-width rows.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(ORB_DESCRIPTOR_BYTES);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(FeatureError::InvalidFormat(format!(
                    "descriptor row {i} has {} bytes, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Self::new(rows.len(), cols, data)
    }

    /// Decode a base64 payload into a `rows x cols` matrix.
    pub fn from_encoded(rows: usize, cols: usize, text: &str) -> Result<Self> {
        Self::new(rows, cols, codec::decode(text)?)
    }

    /// Base64 text of the raw row-major bytes.
    pub fn to_encoded(&self) -> String {
        codec::encode(&self.data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of row `i`.
    ///
    /// # Panics
    /// If `i >= self.rows()`.
    pub fn row(&self, i: usize) -> &[u8] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        // `chunks_exact(0)` panics, and a zero-width matrix has no rows anyway.
        self.data.chunks_exact(self.cols.max(1))
    }

    /// New matrix made of the selected rows, in the given order.
    pub(crate) fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }
}

/// Number of differing bits between two equal-length descriptors.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}
