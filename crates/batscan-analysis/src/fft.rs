//! FFT wrapper and frame windowing.
//!
//! Thin layer over rustfft with cached plans. Spectral characterisation of
//! pulses uses overlapped Hamming frames; the autocorrelation width estimate
//! uses the complex in-place transforms.

use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Applies a Hamming window to a frame in place. Every spectral path uses
/// the same window, so averaged spectra and frequency tracks stay
/// comparable.
pub fn hamming(buffer: &mut [f32]) {
    let n = buffer.len();
    for (i, sample) in buffer.iter_mut().enumerate() {
        let w = 0.54 - 0.46 * (2.0 * PI * i as f32 / n as f32).cos();
        *sample *= w;
    }
}

/// FFT processor with cached forward/inverse plans for one size.
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    ifft: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    /// Create an FFT processor for the given size.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        Self { fft, ifft, size }
    }

    /// FFT size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Magnitude spectrum of one real frame.
    ///
    /// The frame is zero-padded or truncated to the FFT size. Returns
    /// `size / 2 + 1` bins (DC to Nyquist).
    pub fn magnitude(&self, frame: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .take(self.size)
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer.truncate(self.size / 2 + 1);
        buffer.iter().map(|c| c.norm()).collect()
    }

    /// Forward FFT on a complex buffer, in place.
    pub fn forward_complex(&self, buffer: &mut [Complex<f32>]) {
        self.fft.process(buffer);
    }

    /// Inverse FFT on a complex buffer, in place, normalized by 1/size.
    pub fn inverse_complex(&self, buffer: &mut [Complex<f32>]) {
        self.ifft.process(buffer);

        let scale = 1.0 / self.size as f32;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_lands_in_expected_bin() {
        let fft = Fft::new(256);

        // Bin 10 at a 256-point FFT
        let input: Vec<f32> = (0..256)
            .map(|i| (2.0 * PI * 10.0 * i as f32 / 256.0).sin())
            .collect();

        let mags = fft.magnitude(&input);
        assert_eq!(mags.len(), 129);

        let peak_bin = mags
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 10);
    }

    #[test]
    fn dc_detection() {
        let fft = Fft::new(256);
        let mags = fft.magnitude(&vec![1.0; 256]);

        let dc = mags[0];
        let rest: f32 = mags[1..].iter().sum();
        assert!(dc > rest * 10.0);
    }

    #[test]
    fn complex_roundtrip() {
        let fft = Fft::new(128);
        let original: Vec<Complex<f32>> = (0..128)
            .map(|i| Complex::new((i as f32 * 0.3).sin(), 0.0))
            .collect();

        let mut buffer = original.clone();
        fft.forward_complex(&mut buffer);
        fft.inverse_complex(&mut buffer);

        for (a, b) in original.iter().zip(buffer.iter()) {
            assert!((a.re - b.re).abs() < 1e-4, "mismatch: {} vs {}", a.re, b.re);
        }
    }

    #[test]
    fn hamming_window_shape() {
        let mut buffer = vec![1.0; 100];
        hamming(&mut buffer);

        // Hamming is 0.08 at the edges, 1.0 at the center
        assert!((buffer[0] - 0.08).abs() < 0.01);
        assert!((buffer[50] - 1.0).abs() < 0.01);
    }

    #[test]
    fn short_frame_is_zero_padded() {
        let fft = Fft::new(256);
        let mags = fft.magnitude(&[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(mags.len(), 129);
        assert!(mags[0] > 0.0);
    }
}
