//! Statistical helpers shared by the detection and aggregation stages.
//!
//! The fallback rules here are part of the pipeline contract: acoustic data
//! is routinely sparse, so an under-populated sample set yields a defined
//! degenerate result (SD of 0, empty block scan) rather than an error.

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population variance. Returns 0.0 for an empty slice.
pub fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32
}

/// Population standard deviation with the under-population fallback.
///
/// Fewer than 3 values yields exactly 0.0. Two readings cannot distinguish
/// spread from noise in this domain, so the pipeline treats them as "no
/// spread information" rather than computing a meaningless SD.
pub fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 3 {
        return 0.0;
    }
    variance(values).sqrt()
}

/// Scans `trace` in non-overlapping blocks of `block_len` samples and
/// returns `(start_index, mean, sd)` of the block with minimum variance.
///
/// Minimum variance is a proxy for the quietest stretch of a trace: the
/// noise floor estimate for adaptive thresholding and the anchor for
/// quiet-region selection in spectral subtraction.
///
/// Returns `None` when the trace is shorter than one block or `block_len`
/// is 0.
pub fn min_variance_block(trace: &[f32], block_len: usize) -> Option<(usize, f32, f32)> {
    if block_len == 0 || trace.len() < block_len {
        return None;
    }

    let mut best: Option<(usize, f32, f32)> = None;
    let mut start = 0;
    while start + block_len <= trace.len() {
        let block = &trace[start..start + block_len];
        let var = variance(block);
        if best.is_none_or(|(_, _, best_sd)| var < best_sd * best_sd) {
            best = Some((start, mean(block), var.sqrt()));
        }
        start += block_len;
    }
    best
}

/// Symmetric moving-average smoothing.
///
/// Each output sample is the mean of the input samples within `window / 2`
/// on either side, clipped at the edges. A window of 0 or 1 returns the
/// input unchanged.
pub fn smooth(values: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            mean(&values[lo..hi])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn mean_basic() {
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn std_dev_under_three_is_zero() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[5.0]), 0.0);
        assert_eq!(std_dev(&[5.0, 100.0]), 0.0);
    }

    #[test]
    fn std_dev_of_constant_is_zero() {
        assert_eq!(std_dev(&[4.0, 4.0, 4.0, 4.0]), 0.0);
    }

    #[test]
    fn std_dev_known_value() {
        // Population SD of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.0).abs() < 1e-5);
    }

    #[test]
    fn min_variance_block_finds_flat_stretch() {
        // Noisy first half, flat second half
        let mut trace: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        trace.extend(std::iter::repeat_n(0.25f32, 64));

        let (start, m, sd) = min_variance_block(&trace, 32).unwrap();
        assert!(start >= 64, "expected a block in the flat half, got {start}");
        assert!((m - 0.25).abs() < 1e-6);
        assert!(sd < 1e-6);
    }

    #[test]
    fn min_variance_block_short_trace() {
        assert!(min_variance_block(&[1.0, 2.0], 32).is_none());
        assert!(min_variance_block(&[1.0, 2.0], 0).is_none());
    }

    #[test]
    fn smooth_preserves_constant() {
        let flat = vec![3.0f32; 20];
        assert_eq!(smooth(&flat, 3), flat);
    }

    #[test]
    fn smooth_window_one_is_identity() {
        let v = vec![1.0, 5.0, 2.0];
        assert_eq!(smooth(&v, 1), v);
    }

    #[test]
    fn smooth_reduces_spike() {
        let mut v = vec![0.0f32; 11];
        v[5] = 9.0;
        let s = smooth(&v, 3);
        assert!((s[5] - 3.0).abs() < 1e-6);
        assert!((s[4] - 3.0).abs() < 1e-6);
    }
}
