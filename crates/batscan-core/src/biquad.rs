//! Biquad (bi-quadratic) filter for band isolation.
//!
//! The envelope pipeline uses three of these in series: a high-pass to
//! remove low-frequency wind/handling noise below the bat band, a low-pass
//! to smooth the rectified signal, and a second gentle high-pass to remove
//! DC drift introduced by rectification.
//!
//! Coefficient calculation uses the RBJ Audio EQ Cookbook formulas.

use core::f32::consts::PI;
use libm::{cosf, sinf};

/// Second-order IIR filter in Direct Form I.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    /// Input delay line: x[n-1], x[n-2]
    x1: f32,
    x2: f32,

    /// Output delay line: y[n-1], y[n-2]
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a passthrough biquad (`y[n] = x[n]`).
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Creates a low-pass biquad at `frequency` Hz.
    ///
    /// `q` is typically 0.707 for a Butterworth response.
    pub fn lowpass(frequency: f32, q: f32, sample_rate: f32) -> Self {
        let (b0, b1, b2, a0, a1, a2) = lowpass_coefficients(frequency, q, sample_rate);
        Self::from_coefficients(b0, b1, b2, a0, a1, a2)
    }

    /// Creates a high-pass biquad at `frequency` Hz.
    pub fn highpass(frequency: f32, q: f32, sample_rate: f32) -> Self {
        let (b0, b1, b2, a0, a1, a2) = highpass_coefficients(frequency, q, sample_rate);
        Self::from_coefficients(b0, b1, b2, a0, a1, a2)
    }

    /// Builds a biquad from raw coefficients, normalizing by `a0`.
    pub fn from_coefficients(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let a0_inv = 1.0 / a0;
        Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Processes a single sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Clears the delay lines without changing coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// RBJ cookbook low-pass coefficients `(b0, b1, b2, a0, a1, a2)`.
pub fn lowpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cosf(omega);
    let sin_omega = sinf(omega);
    let alpha = sin_omega / (2.0 * q);

    let b0 = (1.0 - cos_omega) / 2.0;
    let b1 = 1.0 - cos_omega;
    let b2 = (1.0 - cos_omega) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// RBJ cookbook high-pass coefficients `(b0, b1, b2, a0, a1, a2)`.
pub fn highpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cosf(omega);
    let sin_omega = sinf(omega);
    let alpha = sin_omega / (2.0 * q);

    let b0 = (1.0 + cos_omega) / 2.0;
    let b1 = -(1.0 + cos_omega);
    let b2 = (1.0 + cos_omega) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::PI;

    fn sine(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn passthrough_is_identity() {
        let mut bq = Biquad::new();
        for i in 0..100 {
            let x = (i as f32 * 0.1).sin();
            assert!((bq.process(x) - x).abs() < 1e-6);
        }
    }

    #[test]
    fn highpass_attenuates_low_frequency() {
        let sr = 384_000.0;
        let mut bq = Biquad::highpass(15_000.0, 0.707, sr);

        // 1 kHz is well below the 15 kHz cutoff
        let input = sine(1_000.0, sr, 8192);
        let output: Vec<f32> = input.iter().map(|&s| bq.process(s)).collect();

        // Skip the transient
        assert!(rms(&output[4096..]) < 0.1 * rms(&input[4096..]));
    }

    #[test]
    fn highpass_passes_ultrasonic() {
        let sr = 384_000.0;
        let mut bq = Biquad::highpass(15_000.0, 0.707, sr);

        let input = sine(45_000.0, sr, 8192);
        let output: Vec<f32> = input.iter().map(|&s| bq.process(s)).collect();

        assert!(rms(&output[4096..]) > 0.7 * rms(&input[4096..]));
    }

    #[test]
    fn lowpass_attenuates_high_frequency() {
        let sr = 384_000.0;
        let mut bq = Biquad::lowpass(3_000.0, 0.707, sr);

        let input = sine(60_000.0, sr, 8192);
        let output: Vec<f32> = input.iter().map(|&s| bq.process(s)).collect();

        assert!(rms(&output[4096..]) < 0.05 * rms(&input[4096..]));
    }

    #[test]
    fn clear_resets_state() {
        let mut bq = Biquad::lowpass(3_000.0, 0.707, 384_000.0);
        for _ in 0..64 {
            bq.process(1.0);
        }
        bq.clear();

        let mut fresh = Biquad::lowpass(3_000.0, 0.707, 384_000.0);
        for i in 0..64 {
            let x = (i as f32 * 0.01).sin();
            assert_eq!(bq.process(x), fresh.process(x));
        }
    }
}
