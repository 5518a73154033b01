//! Passes: bounded time windows of pulses with aggregate statistics.
//!
//! A pass owns its pulses. Aggregate statistics are cached and invalidated
//! by every mutating operation; [`compute_statistics`] is the pure function
//! the cache is filled from, exposed separately so the statistics can be
//! tested without building a pass.

use crate::pulse::Pulse;
use batscan_analysis::spectrum::CALL_FLOOR_HZ;
use batscan_core::stats::{mean, std_dev};

/// Mean and standard deviation of one pass parameter.
///
/// `sd` is 0 whenever fewer than 3 values qualify; statistical
/// underpopulation is a defined fallback, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParameterStats {
    /// Arithmetic mean of the qualifying values. 0 when none qualify.
    pub mean: f32,
    /// Standard deviation, 0 with fewer than 3 qualifying values.
    pub sd: f32,
    /// Number of values that qualified.
    pub count: usize,
}

impl ParameterStats {
    fn from_values(values: &[f32]) -> Self {
        Self {
            mean: mean(values),
            sd: std_dev(values),
            count: values.len(),
        }
    }
}

/// Aggregate statistics over a pass's pulse list.
#[derive(Debug, Clone, Default)]
pub struct PassStats {
    /// Start frequency in Hz, over pulses above the call floor.
    pub start_frequency: ParameterStats,
    /// End frequency in Hz, over pulses above the call floor.
    pub end_frequency: ParameterStats,
    /// Peak frequency in Hz, over pulses above the call floor.
    pub peak_frequency: ParameterStats,
    /// Pulse duration in milliseconds.
    pub duration_ms: ParameterStats,
    /// Inter-pulse interval in milliseconds.
    pub interval_ms: ParameterStats,
    /// Total pulses in the pass, qualifying or not.
    pub pulse_count: usize,
}

/// Computes aggregate statistics for a pulse list.
///
/// Frequencies at or below the 15 kHz call floor (including the -1
/// sentinel) are excluded from the frequency statistics. Durations always
/// qualify; intervals qualify when present and positive.
pub fn compute_statistics(pulses: &[Pulse]) -> PassStats {
    let frequency_values = |f: fn(&Pulse) -> i32| -> Vec<f32> {
        pulses
            .iter()
            .map(f)
            .filter(|&hz| hz as f32 > CALL_FLOOR_HZ)
            .map(|hz| hz as f32)
            .collect()
    };

    let starts = frequency_values(Pulse::start_frequency);
    let ends = frequency_values(Pulse::end_frequency);
    let peaks = frequency_values(Pulse::peak_frequency);
    let durations: Vec<f32> = pulses.iter().map(Pulse::duration_ms).collect();
    let intervals: Vec<f32> = pulses
        .iter()
        .filter_map(Pulse::interval_ms)
        .filter(|&ms| ms > 0.0)
        .collect();

    PassStats {
        start_frequency: ParameterStats::from_values(&starts),
        end_frequency: ParameterStats::from_values(&ends),
        peak_frequency: ParameterStats::from_values(&peaks),
        duration_ms: ParameterStats::from_values(&durations),
        interval_ms: ParameterStats::from_values(&intervals),
        pulse_count: pulses.len(),
    }
}

/// Iterative mean-interval estimate robust to missed detections.
///
/// A missed pulse doubles the observed interval, so a plain mean over a
/// sparse pass overestimates the base interval. Starting from the simple
/// mean, each of 10 refinement rounds clamps intervals above 3x the guess
/// to the guess, splits intervals above 1.5x the guess into two halves
/// (both kept as samples), then nudges the guess by a tenth of the RMS
/// deviation, downward when most samples sit below it.
pub fn estimate_mean_interval(intervals_ms: &[f32]) -> f32 {
    if intervals_ms.is_empty() {
        return 0.0;
    }
    let mut guess = mean(intervals_ms);

    for _ in 0..10 {
        if guess <= 0.0 {
            break;
        }
        let mut working = Vec::with_capacity(intervals_ms.len() * 2);
        for &interval in intervals_ms {
            let interval = if interval > 3.0 * guess {
                guess
            } else {
                interval
            };
            if interval > 1.5 * guess {
                working.push(interval / 2.0);
                working.push(interval / 2.0);
            } else {
                working.push(interval);
            }
        }

        let sum_sq: f32 = working.iter().map(|&v| (v - guess) * (v - guess)).sum();
        let deviation = (sum_sq / working.len() as f32).sqrt();
        let below = working.iter().filter(|&&v| v < guess).count();
        let above = working.iter().filter(|&&v| v > guess).count();

        let step = deviation / 10.0;
        guess += if below > above { -step } else { step };
    }
    guess
}

/// An ordered collection of pulses within a bounded time window.
#[derive(Debug, Clone)]
pub struct Pass {
    /// Ordinal position within the owning segment.
    pub pass_number: usize,
    /// Number of the owning recording.
    pub recording_number: usize,
    /// Start of the pass window in raw samples from the start of the
    /// recording.
    pub offset_samples: usize,
    /// Length of the pass window in raw samples.
    pub length_samples: usize,
    /// Raw audio sample rate in Hz.
    pub sample_rate: f32,
    /// Envelope threshold factor the pass was detected with.
    pub envelope_threshold_factor: f32,
    /// Spectral threshold factor the pass was analysed with.
    pub spectrum_threshold_factor: f32,
    pulses: Vec<Pulse>,
    stats: Option<PassStats>,
}

impl Pass {
    /// Creates an empty pass covering `[offset, offset + length)` samples.
    pub fn new(
        pass_number: usize,
        recording_number: usize,
        offset_samples: usize,
        length_samples: usize,
        sample_rate: f32,
    ) -> Self {
        Self {
            pass_number,
            recording_number,
            offset_samples,
            length_samples,
            sample_rate,
            envelope_threshold_factor: 0.0,
            spectrum_threshold_factor: 0.0,
            pulses: Vec::new(),
            stats: None,
        }
    }

    /// The pulses in detection order.
    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// Number of pulses in the pass.
    pub fn pulse_count(&self) -> usize {
        self.pulses.len()
    }

    /// Pass window duration in seconds.
    pub fn duration_s(&self) -> f32 {
        self.length_samples as f32 / self.sample_rate
    }

    /// Appends a pulse, stamping it with the pass provenance.
    pub fn add_pulse(&mut self, mut pulse: Pulse) {
        pulse.peak.pass_number = self.pass_number;
        pulse.peak.recording_number = self.recording_number;
        self.pulses.push(pulse);
        self.stats = None;
    }

    /// Replaces the whole pulse list.
    pub fn set_pulses(&mut self, pulses: Vec<Pulse>) {
        self.pulses = pulses;
        for pulse in &mut self.pulses {
            pulse.peak.pass_number = self.pass_number;
            pulse.peak.recording_number = self.recording_number;
        }
        self.stats = None;
    }

    /// Removes the pulses at the given list positions and returns them, in
    /// their original order. Out-of-range indices are ignored.
    pub fn delete_pulses(&mut self, indices: &[usize]) -> Vec<Pulse> {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.pulses.len())
            .collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut removed = Vec::with_capacity(sorted.len());
        for &i in sorted.iter().rev() {
            removed.push(self.pulses.remove(i));
        }
        removed.reverse();
        if !removed.is_empty() {
            self.stats = None;
        }
        removed
    }

    /// Aggregate statistics, recomputed on first access after a mutation.
    pub fn stats(&mut self) -> &PassStats {
        self.stats
            .get_or_insert_with(|| compute_statistics(&self.pulses))
    }

    /// Discards the cached statistics so the next access recomputes them.
    pub fn invalidate(&mut self) {
        self.stats = None;
    }

    /// Refined mean interval over the pass's pulse intervals, in ms.
    pub fn mean_interval_estimate(&self) -> f32 {
        let intervals: Vec<f32> = self
            .pulses
            .iter()
            .filter_map(Pulse::interval_ms)
            .filter(|&ms| ms > 0.0)
            .collect();
        estimate_mean_interval(&intervals)
    }

    /// One-line human-readable statistics summary.
    pub fn summary(&mut self) -> String {
        let stats = self.stats().clone();
        format!(
            "pass {}: {} pulses, start {:.1}+/-{:.1} kHz, end {:.1}+/-{:.1} kHz, \
             peak {:.1}+/-{:.1} kHz, dur {:.1}+/-{:.1} ms, interval {:.0}+/-{:.0} ms",
            self.pass_number,
            stats.pulse_count,
            stats.start_frequency.mean / 1000.0,
            stats.start_frequency.sd / 1000.0,
            stats.end_frequency.mean / 1000.0,
            stats.end_frequency.sd / 1000.0,
            stats.peak_frequency.mean / 1000.0,
            stats.peak_frequency.sd / 1000.0,
            stats.duration_ms.mean,
            stats.duration_ms.sd,
            stats.interval_ms.mean,
            stats.interval_ms.sd,
        )
    }
}
