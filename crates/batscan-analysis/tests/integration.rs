//! End-to-end detection tests on synthetic bat passes.
//!
//! Builds raw 384 kHz sample buffers containing FM sweep pulses in
//! low-level white noise and runs them through envelope extraction, peak
//! detection and spectral characterisation.

use batscan_analysis::peaks::{DetectorConfig, detect_with_adaptive_threshold};
use batscan_analysis::spectrum::{SpectrumAnalyzer, SpectrumConfig, quiet_start};
use batscan_core::{EnvelopeConfig, EnvelopeExtractor};
use std::f32::consts::PI;

const SR: f32 = 384_000.0;

/// Reproducible uniform white noise in [-amplitude, amplitude].
fn white_noise(n: usize, amplitude: f32, seed: u32) -> Vec<f32> {
    let mut state = seed | 1;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            amplitude * (state as i32 as f32) / (i32::MAX as f32)
        })
        .collect()
}

/// Adds a linear FM sweep from `f0` to `f1` Hz, `duration_s` long, into
/// `buffer` at `at_s` seconds.
fn add_sweep(buffer: &mut [f32], at_s: f32, duration_s: f32, f0: f32, f1: f32, amplitude: f32) {
    let start = (at_s * SR) as usize;
    let len = (duration_s * SR) as usize;
    let k = (f1 - f0) / duration_s;
    for i in 0..len {
        let t = i as f32 / SR;
        buffer[start + i] += amplitude * (2.0 * PI * (f0 * t + 0.5 * k * t * t)).sin();
    }
}

/// One second of noise with three 3 ms 20→45 kHz sweeps 100 ms apart.
fn three_pulse_pass() -> Vec<f32> {
    let mut buffer = white_noise(SR as usize, 0.005, 0xBA75);
    for &at in &[0.2, 0.3, 0.4] {
        add_sweep(&mut buffer, at, 0.003, 20_000.0, 45_000.0, 0.5);
    }
    buffer
}

#[test]
fn three_sweeps_detected_with_100ms_intervals() {
    let samples = three_pulse_pass();

    let mut extractor = EnvelopeExtractor::new(SR, EnvelopeConfig::default());
    let envelope = extractor.extract(&samples);
    let env_rate = extractor.envelope_rate();

    let config = DetectorConfig::from_millis(env_rate, 2.0, 2.0, 10.0);
    let (peaks, threshold) = detect_with_adaptive_threshold(&envelope, env_rate, 1.5, &config);

    assert!(threshold > 0.0);
    assert_eq!(peaks.len(), 3, "expected exactly 3 peaks, got {}", peaks.len());

    assert!(peaks[0].prev_interval.is_none());
    for peak in &peaks[1..] {
        let interval = peak.interval_ms().unwrap();
        assert!(
            (interval - 100.0).abs() <= 5.0,
            "interval {interval} ms not within 100 +/- 5 ms"
        );
    }

    // Each reported width should be near the true 3 ms pulse width. The
    // boundary scan's gap tolerance may stretch the span by a few
    // tenths of a millisecond per bridged noise crossing.
    for peak in &peaks {
        let width_ms = peak.duration_ms();
        assert!(
            (1.0..=8.0).contains(&width_ms),
            "width {width_ms} ms implausible for a 3 ms pulse"
        );
    }
}

#[test]
fn detected_pulse_spectrum_lands_in_sweep_band() {
    let samples = three_pulse_pass();

    let mut extractor = EnvelopeExtractor::new(SR, EnvelopeConfig::default());
    let envelope = extractor.extract(&samples);
    let env_rate = extractor.envelope_rate();
    let decimation = extractor.decimation();

    let config = DetectorConfig::from_millis(env_rate, 2.0, 2.0, 10.0);
    let (peaks, _) = detect_with_adaptive_threshold(&envelope, env_rate, 1.5, &config);
    assert_eq!(peaks.len(), 3);

    let analyzer = SpectrumAnalyzer::new(SR, SpectrumConfig::default());

    for peak in &peaks {
        // Map envelope coordinates back to raw sample coordinates
        let raw_start = peak.start * decimation;
        let raw_width = peak.width * decimation;
        let window_len = analyzer.window_len(raw_width);
        let pulse_window = &samples[raw_start..(raw_start + window_len).min(samples.len())];

        // Matched quiet window from a low-variance stretch before the pulse
        let quiet_env_len = (window_len / decimation).max(1);
        let quiet_window = quiet_start(&envelope, peak.start, quiet_env_len).map(|env_start| {
            let start = env_start * decimation;
            &samples[start..(start + window_len).min(samples.len())]
        });

        let details = analyzer.analyze(pulse_window, quiet_window);
        assert!(
            details.spectral_peak.is_valid(),
            "pulse at {} should yield a valid spectral peak",
            peak.start
        );
        let peak_hz = details.peak_frequency();
        assert!(
            (18_000..=47_000).contains(&peak_hz),
            "spectral peak {peak_hz} Hz outside the 20-45 kHz sweep band"
        );
    }
}

#[test]
fn pure_noise_pass_yields_no_peaks() {
    let samples = white_noise(SR as usize / 2, 0.01, 0x5EED);

    let mut extractor = EnvelopeExtractor::new(SR, EnvelopeConfig::default());
    let envelope = extractor.extract(&samples);
    let env_rate = extractor.envelope_rate();

    let config = DetectorConfig::from_millis(env_rate, 2.0, 2.0, 10.0);
    let (peaks, _) = detect_with_adaptive_threshold(&envelope, env_rate, 1.5, &config);

    assert!(
        peaks.is_empty(),
        "noise-only pass produced {} spurious peaks",
        peaks.len()
    );
}
