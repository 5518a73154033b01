//! Adaptive-threshold recursive peak detection.
//!
//! Operates on any non-negative "trace": an amplitude envelope (samples over
//! time) or a noise-subtracted spectrum (bins over frequency). Detection is
//! divide-and-conquer: isolate the tallest excursion in a range, then
//! recurse into the stretches either side of it, outside a guard band.
//!
//! The recursion is a pure function returning its own peak list; the
//! top-level entry point merges, sorts and backfills inter-peak intervals.

use batscan_core::stats::{mean, min_variance_block, std_dev};

/// Edge drop below the maximum on dB traces: 20·log10(3), the one-third
/// amplitude relaxation expressed in decibels.
const DB_EDGE_DROP: f32 = 9.54;

/// A detected amplitude excursion in a trace.
///
/// Positions are in trace samples, relative to the start of the trace the
/// detector was given (pass-relative for envelopes, bin index for spectra).
#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    /// Ordinal position within the sorted peak list of its trace.
    pub index: usize,
    /// Start position in trace samples.
    pub start: usize,
    /// Width in trace samples. Always > 0 for an accepted peak.
    pub width: usize,
    /// Sample rate of the trace (envelope rate, not raw audio rate).
    pub sample_rate: f32,
    /// Maximum trace value within the peak.
    pub max_value: f32,
    /// Sum of trace values between start and end.
    pub area: f32,
    /// Absolute detection threshold in force when this peak was accepted.
    pub threshold: f32,
    /// Distance from the previous peak's start, in trace samples.
    /// `None` for the first peak of a trace.
    pub prev_interval: Option<usize>,
    /// Owning recording number, backfilled by the aggregator.
    pub recording_number: usize,
    /// Owning pass number, backfilled by the aggregator.
    pub pass_number: usize,
}

impl Peak {
    /// End position (exclusive) in trace samples.
    pub fn end(&self) -> usize {
        self.start + self.width
    }

    /// Peak duration in milliseconds at the trace rate.
    pub fn duration_ms(&self) -> f32 {
        self.width as f32 * 1000.0 / self.sample_rate
    }

    /// Interval from the previous peak in milliseconds, if known.
    pub fn interval_ms(&self) -> Option<f32> {
        self.prev_interval
            .map(|i| i as f32 * 1000.0 / self.sample_rate)
    }
}

/// Value scale of the trace a detector runs on.
///
/// The scale decides both how the adaptive threshold is derived and how far
/// the boundary-scan edge may sit from the maximum: on a squared-energy
/// envelope the edge relaxes downward to a third of the maximum, while on a
/// log-ratio (dB) spectrum the same one-third factor is a fixed 9.5 dB drop
/// and the edge clamps upward to it, keeping leakage skirts out of the lobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDomain {
    /// Squared-amplitude envelope samples over time.
    Energy,
    /// Log-ratio spectrum bins in dB over frequency.
    Decibel,
}

/// Peak isolation limits, all in trace samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Back-scan gap tolerance and minimum credible peak width.
    pub leadin: usize,
    /// Forward-scan gap tolerance; also the truncation-artifact skip at the
    /// front of a search range.
    pub leadout: usize,
    /// Exclusion zone around an isolated peak before recursing (~10 ms of
    /// envelope samples in the time domain).
    pub guard_band: usize,
    /// Absolute minimum accepted width.
    pub min_width: usize,
    /// Value scale of the trace.
    pub domain: TraceDomain,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        // Defaults assume a 12 kHz envelope rate (384 kHz / 32):
        // 2 ms lead-in/out, 10 ms guard band.
        Self {
            leadin: 24,
            leadout: 24,
            guard_band: 120,
            min_width: 20,
            domain: TraceDomain::Energy,
        }
    }
}

impl DetectorConfig {
    /// Builds an envelope-domain config from millisecond limits at a given
    /// trace rate.
    pub fn from_millis(trace_rate: f32, leadin_ms: f32, leadout_ms: f32, guard_ms: f32) -> Self {
        let to_samples = |ms: f32| ((ms * trace_rate / 1000.0) as usize).max(1);
        Self {
            leadin: to_samples(leadin_ms),
            leadout: to_samples(leadout_ms),
            guard_band: to_samples(guard_ms),
            min_width: 20,
            domain: TraceDomain::Energy,
        }
    }
}

/// Selects the detection threshold for a trace.
///
/// Scans the trace in non-overlapping blocks and takes the block with
/// minimum variance as the quietest stretch; the threshold is
/// `(mean + 2·SD)` of that block scaled by `factor`. Fixed per trace so
/// relative comparisons between peaks stay consistent.
pub fn adaptive_threshold(trace: &[f32], factor: f32) -> f32 {
    let block_len = (trace.len() / 16).max(16);
    let (m, sd) = match min_variance_block(trace, block_len) {
        Some((_, m, sd)) => (m, sd),
        // Trace shorter than one block: fall back to whole-trace stats.
        None => (mean(trace), std_dev(trace)),
    };
    // Strictly positive once detection succeeds; an all-zero trace must not
    // pass the `max >= threshold` test.
    ((m + 2.0 * sd) * factor).max(1e-12)
}

/// Selects the detection threshold for a squared-energy envelope.
///
/// Squaring pushes the bulk of the noise toward zero while stretching its
/// tail, so quietest-block statistics taken on the squared values land far
/// below where the noise actually crosses. The threshold is derived on the
/// amplitude scale instead: square root, [`adaptive_threshold`], square.
pub fn adaptive_energy_threshold(trace: &[f32], factor: f32) -> f32 {
    let amplitudes: Vec<f32> = trace.iter().map(|&v| v.max(0.0).sqrt()).collect();
    let amp_threshold = adaptive_threshold(&amplitudes, factor);
    (amp_threshold * amp_threshold).max(1e-12)
}

/// Detects all peaks in `trace` above `threshold`.
///
/// Returns peaks sorted by start position with ordinals and
/// interval-from-previous backfilled. If no accepted peak reaches twice the
/// threshold the whole list is discarded: a pass where nothing clearly
/// clears the noise floor is treated as silence, not as weak detections.
pub fn detect_peaks(
    trace: &[f32],
    trace_rate: f32,
    threshold: f32,
    config: &DetectorConfig,
) -> Vec<Peak> {
    let mut peaks = isolate(trace, 0, trace.len(), trace_rate, threshold, config);

    if !peaks.iter().any(|p| p.max_value >= 2.0 * threshold) {
        return Vec::new();
    }

    peaks.sort_by_key(|p| p.start);
    let mut prev_start = None;
    for (i, peak) in peaks.iter_mut().enumerate() {
        peak.index = i;
        peak.prev_interval = prev_start.map(|s: usize| peak.start - s);
        prev_start = Some(peak.start);
    }
    peaks
}

/// Convenience wrapper: domain-appropriate adaptive threshold followed by
/// detection.
pub fn detect_with_adaptive_threshold(
    trace: &[f32],
    trace_rate: f32,
    threshold_factor: f32,
    config: &DetectorConfig,
) -> (Vec<Peak>, f32) {
    let threshold = match config.domain {
        TraceDomain::Energy => adaptive_energy_threshold(trace, threshold_factor),
        TraceDomain::Decibel => adaptive_threshold(trace, threshold_factor),
    };
    (detect_peaks(trace, trace_rate, threshold, config), threshold)
}

/// Recursive isolation over `[start, end)`. Pure: returns the peaks found
/// in the range, unsorted.
fn isolate(
    trace: &[f32],
    start: usize,
    end: usize,
    trace_rate: f32,
    threshold: f32,
    config: &DetectorConfig,
) -> Vec<Peak> {
    let len = end.saturating_sub(start);
    if len <= config.leadin {
        return Vec::new();
    }

    let mut max_idx = argmax(&trace[start..end]) + start;
    if max_idx < start + config.leadout {
        // A maximum hugging the front of the range can be a truncation
        // artifact from the split that produced this range; retry past it.
        if start + config.leadout >= end {
            return Vec::new();
        }
        max_idx = argmax(&trace[start + config.leadout..end]) + start + config.leadout;
    }

    let max_value = trace[max_idx];
    if max_value < threshold {
        return Vec::new();
    }

    // The boundary scan tolerates dips inside the pulse: on an energy trace
    // the edge relaxes down to a third of the maximum, on a dB trace the
    // same factor is a fixed drop below the maximum and clamps the edge
    // upward so low leakage skirts are not folded into the lobe.
    let edge = match config.domain {
        TraceDomain::Energy => threshold.min(max_value / 3.0),
        TraceDomain::Decibel => threshold.max(max_value - DB_EDGE_DROP),
    };

    // Back-scan to the peak start, tolerating up to leadin consecutive
    // below-edge samples.
    let mut peak_start = max_idx;
    let mut gap = 0usize;
    let mut i = max_idx;
    while i > start {
        i -= 1;
        if trace[i] >= edge {
            peak_start = i;
            gap = 0;
        } else {
            gap += 1;
            if gap > config.leadin {
                break;
            }
        }
    }

    // Forward-scan to the peak end with the leadout tolerance.
    let mut peak_end = max_idx + 1;
    gap = 0;
    i = max_idx;
    while i + 1 < end {
        i += 1;
        if trace[i] >= edge {
            peak_end = i + 1;
            gap = 0;
        } else {
            gap += 1;
            if gap > config.leadout {
                break;
            }
        }
    }

    let width = peak_end - peak_start;
    // The gap tolerance can stitch sparse noise crossings into a wide span,
    // so acceptance counts the samples actually at or above the edge rather
    // than trusting the span width. Too-sparse excursions are noise,
    // silently dropped: a detection confidence policy, not a fault.
    let above_edge = trace[peak_start..peak_end]
        .iter()
        .filter(|&&v| v >= edge)
        .count();
    let mut found = Vec::new();
    if width > config.leadin && above_edge >= config.min_width {
        found.push(Peak {
            index: 0,
            start: peak_start,
            width,
            sample_rate: trace_rate,
            max_value,
            area: trace[peak_start..peak_end].iter().sum(),
            threshold,
            prev_interval: None,
            recording_number: 0,
            pass_number: 0,
        });
    }

    // Recurse into the stretches either side of the isolated region,
    // outside the guard band, whether or not this peak was accepted.
    let left_end = peak_start.saturating_sub(config.guard_band);
    if left_end > start && left_end - start > config.leadin {
        found.extend(isolate(trace, start, left_end, trace_rate, threshold, config));
    }
    let right_start = peak_end + config.guard_band;
    if right_start < end && end - right_start > config.leadout {
        found.extend(isolate(trace, right_start, end, trace_rate, threshold, config));
    }

    found
}

fn argmax(slice: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in slice.iter().enumerate() {
        if v > slice[best] {
            best = i;
        }
    }
    best
}
