//! Brute-force Hamming nearest-neighbour search and Lowe's ratio test.

use crate::descriptors::{hamming_distance, DescriptorMatrix};

/// Source/target pairing produced by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correspondence {
    pub source_index: usize,
    pub target_index: usize,
    /// Hamming distance between the two descriptors.
    pub distance: u32,
}

/// Up to two nearest target rows for one source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnnCandidate {
    pub source_index: usize,
    /// `(target_index, distance)` of the closest target row.
    pub best: Option<(usize, u32)>,
    /// Runner-up, always at least as far as `best`.
    pub second: Option<(usize, u32)>,
}

/// For every source row, find its two closest target rows.
///
/// Ties are broken in favour of the lower target index. Rows of different
/// widths never match, so an empty candidate list is returned in that case.
pub fn knn_match(source: &DescriptorMatrix, target: &DescriptorMatrix) -> Vec<KnnCandidate> {
    if source.cols() != target.cols() {
        log::warn!(
            "descriptor width mismatch: source {} bytes, target {} bytes",
            source.cols(),
            target.cols()
        );
        return Vec::new();
    }

    source
        .iter_rows()
        .enumerate()
        .map(|(source_index, s)| {
            let mut best: Option<(usize, u32)> = None;
            let mut second: Option<(usize, u32)> = None;
            for (j, t) in target.iter_rows().enumerate() {
                let d = hamming_distance(s, t);
                match best {
                    Some((_, bd)) if d >= bd => {
                        if second.map_or(true, |(_, sd)| d < sd) {
                            second = Some((j, d));
                        }
                    }
                    _ => {
                        second = best;
                        best = Some((j, d));
                    }
                }
            }
            KnnCandidate {
                source_index,
                best,
                second,
            }
        })
        .collect()
}

/// Keep candidates whose best distance is clearly smaller than the runner-up:
/// `best < ratio * second`.
///
/// Candidates with fewer than two neighbours are dropped. The result is sorted
/// by ascending distance; equal distances keep source order.
pub fn ratio_test(candidates: &[KnnCandidate], ratio: f64) -> Vec<Correspondence> {
    let mut out: Vec<Correspondence> = candidates
        .iter()
        .filter_map(|c| match (c.best, c.second) {
            (Some((target_index, d1)), Some((_, d2))) if (d1 as f64) < ratio * d2 as f64 => {
                Some(Correspondence {
                    source_index: c.source_index,
                    target_index,
                    distance: d1,
                })
            }
            _ => None,
        })
        .collect();
    out.sort_by_key(|c| c.distance);
    out
}

/// [`knn_match`] followed by [`ratio_test`].
pub fn match_descriptors(
    source: &DescriptorMatrix,
    target: &DescriptorMatrix,
    ratio: f64,
) -> Vec<Correspondence> {
    let candidates = knn_match(source, target);
    let kept = ratio_test(&candidates, ratio);
    log::debug!(
        "ratio test kept {} of {} candidates (ratio {ratio})",
        kept.len(),
        candidates.len()
    );
    kept
}
