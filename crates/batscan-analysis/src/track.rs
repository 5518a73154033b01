//! Per-frame frequency tracking across a pulse window.
//!
//! Produces the dominant frequency of each short FFT frame through a pulse,
//! giving the frequency-versus-time trajectory the classifier's FM-shape
//! analysis slopes are measured on.

use crate::fft::{Fft, hamming};

/// Dominant frequency per frame across a pulse window.
#[derive(Debug, Clone)]
pub struct FrequencyTrack {
    /// Peak frequency of each frame in Hz.
    pub freqs_hz: Vec<f32>,
    /// Time between consecutive frames in seconds.
    pub frame_interval_s: f32,
}

impl FrequencyTrack {
    /// Number of frames in the track.
    pub fn len(&self) -> usize {
        self.freqs_hz.len()
    }

    /// True when the track has no frames.
    pub fn is_empty(&self) -> bool {
        self.freqs_hz.is_empty()
    }

    /// Straight-line slope over frames `[from, to)` in kHz per ms.
    ///
    /// Returns 0.0 for a span of fewer than two frames.
    pub fn slope_khz_per_ms(&self, from: usize, to: usize) -> f32 {
        let to = to.min(self.freqs_hz.len());
        if from + 1 >= to {
            return 0.0;
        }
        let df = self.freqs_hz[to - 1] - self.freqs_hz[from];
        let dt = (to - 1 - from) as f32 * self.frame_interval_s;
        if dt <= 0.0 {
            return 0.0;
        }
        // Hz/s -> kHz/ms is a factor of 1e-6
        df / dt * 1e-6
    }

    /// Slope across the whole track in kHz per ms.
    pub fn overall_slope(&self) -> f32 {
        self.slope_khz_per_ms(0, self.freqs_hz.len())
    }

    /// Slopes of the first, middle and final thirds of the track.
    ///
    /// `None` when the track is too short to split into thirds of at least
    /// two frames each.
    pub fn third_slopes(&self) -> Option<[f32; 3]> {
        let n = self.freqs_hz.len();
        if n < 6 {
            return None;
        }
        let third = n / 3;
        Some([
            self.slope_khz_per_ms(0, third + 1),
            self.slope_khz_per_ms(third, 2 * third + 1),
            self.slope_khz_per_ms(2 * third, n),
        ])
    }
}

/// Extracts the frequency track of `samples` with Hamming frames of
/// `fft_size` every `hop` samples, ignoring bins at or below `min_hz`.
///
/// A buffer shorter than one frame yields a single zero-padded frame.
pub fn frequency_track(
    samples: &[f32],
    fft_size: usize,
    hop: usize,
    sample_rate: f32,
    min_hz: f32,
) -> FrequencyTrack {
    let fft = Fft::new(fft_size);
    let hop = hop.max(1);
    let hz_per_bin = sample_rate / fft_size as f32;
    let min_bin = (min_hz / hz_per_bin).ceil() as usize;

    let mut freqs = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + fft_size).min(samples.len());
        if end <= start {
            break;
        }
        let mut frame = samples[start..end].to_vec();
        frame.resize(fft_size, 0.0);
        hamming(&mut frame);
        let mags = fft.magnitude(&frame);

        let mut best = min_bin.min(mags.len().saturating_sub(1));
        for bin in best..mags.len() {
            if mags[bin] > mags[best] {
                best = bin;
            }
        }
        freqs.push(best as f32 * hz_per_bin);

        if end == samples.len() {
            break;
        }
        start += hop;
    }

    FrequencyTrack {
        freqs_hz: freqs,
        frame_interval_s: hop as f32 / sample_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: f32 = 384_000.0;

    fn chirp(f0: f32, f1: f32, n: usize) -> Vec<f32> {
        let duration = n as f32 / SR;
        let k = (f1 - f0) / duration;
        (0..n)
            .map(|i| {
                let t = i as f32 / SR;
                (2.0 * PI * (f0 * t + 0.5 * k * t * t)).sin()
            })
            .collect()
    }

    #[test]
    fn downward_sweep_has_negative_slope() {
        let samples = chirp(45_000.0, 25_000.0, 8192);
        let track = frequency_track(&samples, 256, 128, SR, 15_000.0);

        assert!(track.len() > 10);
        let slope = track.overall_slope();
        assert!(slope < 0.0, "downward sweep slope {slope} should be negative");

        // First frame near 45 kHz, last near 25 kHz
        assert!((track.freqs_hz[0] - 45_000.0).abs() < 4_000.0);
        assert!((track.freqs_hz[track.len() - 2] - 25_000.0).abs() < 4_000.0);
    }

    #[test]
    fn constant_tone_has_flat_track() {
        let samples: Vec<f32> = (0..8192)
            .map(|i| (2.0 * PI * 40_000.0 * i as f32 / SR).sin())
            .collect();
        let track = frequency_track(&samples, 256, 128, SR, 15_000.0);

        let slope = track.overall_slope();
        assert!(slope.abs() < 0.2, "tone slope {slope} should be near zero");
    }

    #[test]
    fn third_slopes_need_six_frames() {
        let track = FrequencyTrack {
            freqs_hz: vec![40_000.0; 5],
            frame_interval_s: 0.001,
        };
        assert!(track.third_slopes().is_none());

        let track = FrequencyTrack {
            freqs_hz: vec![40_000.0; 9],
            frame_interval_s: 0.001,
        };
        assert!(track.third_slopes().is_some());
    }

    #[test]
    fn short_buffer_single_frame() {
        let track = frequency_track(&[0.1; 64], 256, 128, SR, 15_000.0);
        assert_eq!(track.len(), 1);
    }

    #[test]
    fn slope_of_short_span_is_zero() {
        let track = FrequencyTrack {
            freqs_hz: vec![40_000.0],
            frame_interval_s: 0.001,
        };
        assert_eq!(track.overall_slope(), 0.0);
    }
}
