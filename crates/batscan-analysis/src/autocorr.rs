//! Autocorrelation-based width estimation.
//!
//! The autocorrelation of a window is obtained by inverse-transforming its
//! magnitude spectrum (Wiener–Khinchin, with magnitude rather than power to
//! match the rest of the spectral pipeline). The lag at which the smoothed
//! autocorrelation first decays below half its zero-lag value gives a
//! duration estimate in milliseconds.

use crate::fft::Fft;
use batscan_core::stats::smooth;
use rustfft::num_complex::Complex;

/// Estimates a width in milliseconds from the autocorrelation decay of
/// `window`.
///
/// Returns -1.0 when the window is empty or the autocorrelation never
/// decays below half height within the window; callers treat -1.0 as
/// "not computed", never as a zero-width result.
pub fn autocorrelation_width_ms(window: &[f32], sample_rate: f32) -> f32 {
    if window.is_empty() || sample_rate <= 0.0 {
        return -1.0;
    }

    let size = window.len().next_power_of_two().max(2);
    let fft = Fft::new(size);

    let mut buffer: Vec<Complex<f32>> = window.iter().map(|&v| Complex::new(v, 0.0)).collect();
    buffer.resize(size, Complex::new(0.0, 0.0));

    fft.forward_complex(&mut buffer);
    for c in &mut buffer {
        *c = Complex::new(c.norm(), 0.0);
    }
    fft.inverse_complex(&mut buffer);

    // Only positive lags up to half the transform are meaningful; the rest
    // mirrors by symmetry.
    let raw: Vec<f32> = buffer.iter().take(size / 2).map(|c| c.re).collect();
    let ac = smooth(&raw, 3);

    let r0 = ac[0];
    if !r0.is_finite() || r0 <= 0.0 {
        return -1.0;
    }

    let half = r0 / 2.0;
    for (lag, &v) in ac.iter().enumerate().skip(1) {
        if v < half {
            return lag as f32 * 1000.0 / sample_rate;
        }
    }
    -1.0
}
