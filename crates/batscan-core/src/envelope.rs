//! Amplitude-envelope extraction from raw ultrasonic samples.
//!
//! The envelope is the coarse amplitude-over-time trace the peak detector
//! operates on. The pipeline is:
//!
//! 1. High-pass at ~15 kHz — removes wind, handling and low-frequency noise
//!    below the biological call range
//! 2. Rectify (absolute value)
//! 3. Low-pass at ~3 kHz — smooths the rectified signal
//! 4. High-pass at ~100 Hz — removes the DC drift rectification introduces
//! 5. Block-average every N samples and square the block mean
//!
//! Squaring biases the envelope toward energy, suppressing small
//! fluctuations relative to genuine pulses. One envelope sample is produced
//! per N input samples, so the envelope rate is `sample_rate / N`.

use crate::biquad::Biquad;

/// Envelope extraction parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeConfig {
    /// First high-pass cutoff in Hz, below the bat call band.
    pub highpass_hz: f32,
    /// Smoothing low-pass cutoff in Hz applied after rectification.
    pub lowpass_hz: f32,
    /// Drift high-pass cutoff in Hz applied after smoothing.
    pub drift_hz: f32,
    /// Down-sampling factor N: one envelope sample per N input samples.
    pub decimation: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            highpass_hz: 15_000.0,
            lowpass_hz: 3_000.0,
            drift_hz: 100.0,
            decimation: 32,
        }
    }
}

/// Number of samples the filter chain is run over before the first retained
/// output, so the biquads reach a stable state instead of colouring the
/// start of the envelope with their step response.
const PREROLL_SAMPLES: usize = 2048;

/// Extracts a down-sampled, squared amplitude envelope from raw samples.
///
/// # Example
///
/// ```rust
/// use batscan_core::{EnvelopeConfig, EnvelopeExtractor};
///
/// let mut extractor = EnvelopeExtractor::new(384_000.0, EnvelopeConfig::default());
/// let samples = vec![0.0f32; 38_400];
/// let envelope = extractor.extract(&samples);
/// assert_eq!(envelope.len(), samples.len() / 32);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeExtractor {
    sample_rate: f32,
    config: EnvelopeConfig,
    highpass: Biquad,
    lowpass: Biquad,
    drift: Biquad,
}

impl EnvelopeExtractor {
    /// Creates an extractor for the given input sample rate.
    pub fn new(sample_rate: f32, config: EnvelopeConfig) -> Self {
        let q = 0.707;
        Self {
            sample_rate,
            config,
            highpass: Biquad::highpass(config.highpass_hz, q, sample_rate),
            lowpass: Biquad::lowpass(config.lowpass_hz, q, sample_rate),
            drift: Biquad::highpass(config.drift_hz, q, sample_rate),
        }
    }

    /// Input sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Envelope sample rate in Hz (`sample_rate / decimation`).
    pub fn envelope_rate(&self) -> f32 {
        self.sample_rate / self.config.decimation as f32
    }

    /// Down-sampling factor.
    pub fn decimation(&self) -> usize {
        self.config.decimation
    }

    /// Extracts the envelope of `samples`.
    ///
    /// Produces `samples.len() / decimation` envelope values; a partial
    /// trailing block is discarded. Non-finite filter output is excluded
    /// from block means, and a block with no finite contribution yields 0.
    pub fn extract(&mut self, samples: &[f32]) -> Vec<f32> {
        self.highpass.clear();
        self.lowpass.clear();
        self.drift.clear();

        // Prime the filters on a pre-roll of the data itself (output
        // discarded) so the first retained block sees settled filter state.
        let preroll = samples.len().min(PREROLL_SAMPLES);
        for &s in &samples[..preroll] {
            self.filter_one(s);
        }

        let n = self.config.decimation.max(1);
        let mut envelope = Vec::with_capacity(samples.len() / n);

        let mut block_sum = 0.0f32;
        let mut block_count = 0usize;
        let mut in_block = 0usize;

        for &s in samples {
            let filtered = self.filter_one(s);
            if filtered.is_finite() {
                block_sum += filtered;
                block_count += 1;
            }
            in_block += 1;
            if in_block == n {
                let block_mean = if block_count > 0 {
                    block_sum / block_count as f32
                } else {
                    0.0
                };
                envelope.push(block_mean * block_mean);
                block_sum = 0.0;
                block_count = 0;
                in_block = 0;
            }
        }

        envelope
    }

    #[inline]
    fn filter_one(&mut self, sample: f32) -> f32 {
        let banded = self.highpass.process(sample);
        let smoothed = self.lowpass.process(banded.abs());
        self.drift.process(smoothed)
    }
}
