//! Spectral characterisation of detected pulses.
//!
//! A pulse is characterised by comparing the averaged magnitude spectrum of
//! its sample window against the spectrum of a matched "quiet" window taken
//! from a low-noise stretch of the same pass. The per-bin log-ratio
//! suppresses stationary background noise; the peak detector then isolates
//! the dominant spectral lobe on that subtracted trace.

use crate::autocorr::autocorrelation_width_ms;
use crate::fft::{Fft, hamming};
use crate::peaks::{DetectorConfig, Peak, TraceDomain, detect_with_adaptive_threshold};
use batscan_core::stats::{mean, min_variance_block, smooth};

/// Frequencies at or below this are outside the biological call range and
/// treated as "not a call" throughout.
pub const CALL_FLOOR_HZ: f32 = 15_000.0;

/// Magnitude floor guarding the log-ratio against division by zero.
const MAG_EPSILON: f32 = 1e-10;

/// Spectral analysis parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumConfig {
    /// FFT frame size; power of two, 128–2048.
    pub fft_size: usize,
    /// Threshold factor for spectral peak detection.
    pub threshold_factor: f32,
    /// Lead-in limit in frequency bins.
    pub leadin_bins: usize,
    /// Lead-out limit in frequency bins.
    pub leadout_bins: usize,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            threshold_factor: 1.5,
            leadin_bins: 5,
            leadout_bins: 5,
        }
    }
}

/// Averaged magnitude spectrum of overlapping Hamming-windowed frames.
///
/// Frames of `fft.size()` samples are taken every `hop` samples, windowed,
/// transformed, and their magnitudes averaged. A buffer shorter than one
/// frame yields a single zero-padded frame.
pub fn averaged_spectrum(samples: &[f32], fft: &Fft, hop: usize) -> Vec<f32> {
    let size = fft.size();
    let hop = hop.max(1);
    let num_bins = size / 2 + 1;

    let mut sum = vec![0.0f32; num_bins];
    let mut frames = 0usize;

    let mut start = 0;
    while start + size <= samples.len() {
        let mut frame = samples[start..start + size].to_vec();
        hamming(&mut frame);
        for (acc, m) in sum.iter_mut().zip(fft.magnitude(&frame)) {
            *acc += m;
        }
        frames += 1;
        start += hop;
    }

    if frames == 0 {
        let mut frame = samples.to_vec();
        frame.resize(size, 0.0);
        hamming(&mut frame);
        return fft.magnitude(&frame);
    }

    for acc in &mut sum {
        *acc /= frames as f32;
    }
    sum
}

/// The dominant spectral lobe of a pulse's noise-subtracted spectrum.
///
/// All frequencies are integer Hz; `-1` means the value could not be
/// computed from the available data and must never be read as 0 Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralPeak {
    /// The bin-domain peak this lobe was built from, if detection succeeded.
    pub peak: Option<Peak>,
    /// Frequency resolution of the spectrum in Hz per bin.
    pub hz_per_bin: f32,
    /// Frequency of the maximum magnitude bin.
    pub peak_hz: i32,
    /// Low edge of the above-threshold lobe.
    pub low_hz: i32,
    /// High edge of the above-threshold lobe.
    pub high_hz: i32,
    /// Low bound at half the peak magnitude.
    pub half_height_low_hz: i32,
    /// High bound at half the peak magnitude.
    pub half_height_high_hz: i32,
    /// Bandwidth at half the peak magnitude.
    pub half_height_width_hz: i32,
    /// Autocorrelation-derived width estimate in milliseconds; -1.0 unset.
    pub autocorr_width_ms: f32,
    /// The subtracted magnitude trace the lobe was found on.
    pub magnitudes: Vec<f32>,
    /// Index of the owning pulse within its pass, for provenance only.
    pub parent_pulse: Option<usize>,
}

impl SpectralPeak {
    /// A peak that could not be computed: every frequency field is -1.
    pub fn invalid() -> Self {
        Self {
            peak: None,
            hz_per_bin: 0.0,
            peak_hz: -1,
            low_hz: -1,
            high_hz: -1,
            half_height_low_hz: -1,
            half_height_high_hz: -1,
            half_height_width_hz: -1,
            autocorr_width_ms: -1.0,
            magnitudes: Vec::new(),
            parent_pulse: None,
        }
    }

    /// Builds a spectral peak from a detected bin-domain peak.
    ///
    /// All derived frequencies are computed here, once; `-1` afterwards
    /// means exactly "not computable from this data". An empty magnitude
    /// array yields [`SpectralPeak::invalid`].
    pub fn from_magnitudes(magnitudes: &[f32], peak: Peak, hz_per_bin: f32) -> Self {
        if magnitudes.is_empty() || hz_per_bin <= 0.0 {
            return Self::invalid();
        }

        let lo = peak.start.min(magnitudes.len() - 1);
        let hi = peak.end().min(magnitudes.len());
        if lo >= hi {
            return Self::invalid();
        }

        let mut max_bin = lo;
        for bin in lo..hi {
            if magnitudes[bin] > magnitudes[max_bin] {
                max_bin = bin;
            }
        }
        let max_mag = magnitudes[max_bin];
        let half = max_mag / 2.0;

        // Scan outward from the maximum until magnitude falls below half
        // height. Bounds may extend past the lobe edges.
        let mut hh_low = max_bin;
        while hh_low > 0 && magnitudes[hh_low - 1] >= half {
            hh_low -= 1;
        }
        let mut hh_high = max_bin;
        while hh_high + 1 < magnitudes.len() && magnitudes[hh_high + 1] >= half {
            hh_high += 1;
        }

        let to_hz = |bin: usize| (bin as f32 * hz_per_bin) as i32;
        Self {
            peak_hz: to_hz(max_bin),
            low_hz: to_hz(lo),
            high_hz: to_hz(hi.saturating_sub(1)),
            half_height_low_hz: to_hz(hh_low),
            half_height_high_hz: to_hz(hh_high),
            half_height_width_hz: ((hh_high - hh_low) as f32 * hz_per_bin) as i32,
            autocorr_width_ms: -1.0,
            hz_per_bin,
            magnitudes: magnitudes.to_vec(),
            peak: Some(peak),
            parent_pulse: None,
        }
    }

    /// True when the frequency fields were successfully computed.
    pub fn is_valid(&self) -> bool {
        self.peak_hz >= 0
    }
}

/// One pulse's computed spectrum and its retained spectral peak.
///
/// Exactly one spectral peak is kept: the highest-area candidate from the
/// subtracted spectrum (first wins on equal area).
#[derive(Debug, Clone)]
pub struct SpectrumDetails {
    /// Noise-subtracted log-ratio trace in dB per bin.
    pub subtracted: Vec<f32>,
    /// Frequency resolution in Hz per bin.
    pub hz_per_bin: f32,
    /// Detection threshold applied to the subtracted trace.
    pub threshold: f32,
    /// The retained spectral peak; invalid when nothing was detected.
    pub spectral_peak: SpectralPeak,
}

impl SpectrumDetails {
    /// Peak frequency in Hz, gated against the not-a-call band.
    pub fn peak_frequency(&self) -> i32 {
        gate(self.spectral_peak.peak_hz)
    }

    /// Start frequency in Hz. Bat calls sweep downward, so the start of the
    /// call maps to the high edge of the spectral lobe.
    pub fn start_frequency(&self) -> i32 {
        gate(self.spectral_peak.high_hz)
    }

    /// End frequency in Hz (low edge of the lobe).
    pub fn end_frequency(&self) -> i32 {
        gate(self.spectral_peak.low_hz)
    }

    /// Magnitude-weighted mean frequency of the lobe in Hz.
    pub fn mean_frequency(&self) -> i32 {
        let Some(peak) = &self.spectral_peak.peak else {
            return -1;
        };
        let lo = peak.start.min(self.subtracted.len());
        let hi = peak.end().min(self.subtracted.len());

        let mut weighted = 0.0f64;
        let mut total = 0.0f64;
        for bin in lo..hi {
            let hz = bin as f32 * self.hz_per_bin;
            if hz <= CALL_FLOOR_HZ {
                continue;
            }
            // Negative ratio bins carry no call energy
            let m = f64::from(self.subtracted[bin].max(0.0));
            weighted += f64::from(hz) * m;
            total += m;
        }
        if total <= 0.0 {
            return -1;
        }
        gate((weighted / total) as i32)
    }
}

/// Values inside the not-a-call sentinel band read as -1, never as a small
/// valid frequency.
fn gate(hz: i32) -> i32 {
    if hz as f32 > CALL_FLOOR_HZ { hz } else { -1 }
}

/// Locates the start of a quiet stretch in an envelope, for use as the
/// background window of spectral subtraction.
///
/// Scans the envelope before `before` in blocks of `window_len` samples and
/// returns the start of the minimum-variance block. `None` when no full
/// block precedes `before`; callers must fall back explicitly rather than
/// folding a sentinel into offset arithmetic.
pub fn quiet_start(envelope: &[f32], before: usize, window_len: usize) -> Option<usize> {
    let before = before.min(envelope.len());
    min_variance_block(&envelope[..before], window_len).map(|(start, _, _)| start)
}

/// Spectral analyzer: averaged spectra, noise subtraction, peak extraction.
pub struct SpectrumAnalyzer {
    fft: Fft,
    config: SpectrumConfig,
    detector: DetectorConfig,
    sample_rate: f32,
}

impl SpectrumAnalyzer {
    /// Creates an analyzer for raw audio at `sample_rate`.
    pub fn new(sample_rate: f32, config: SpectrumConfig) -> Self {
        let detector = DetectorConfig {
            leadin: config.leadin_bins,
            leadout: config.leadout_bins,
            guard_band: config.leadout_bins.max(4),
            min_width: 20,
            domain: TraceDomain::Decibel,
        };
        Self {
            fft: Fft::new(config.fft_size),
            config,
            detector,
            sample_rate,
        }
    }

    /// Frequency resolution of the analysis in Hz per bin.
    pub fn hz_per_bin(&self) -> f32 {
        self.sample_rate / self.config.fft_size as f32
    }

    /// Window length for a pulse whose time-domain peak spans
    /// `peak_width_samples` raw samples: at least one FFT frame, extended to
    /// twice the peak width.
    pub fn window_len(&self, peak_width_samples: usize) -> usize {
        self.config.fft_size.max(2 * peak_width_samples)
    }

    /// Characterises one pulse window against a quiet background window.
    ///
    /// The pulse spectrum averages Hamming frames at 50% overlap; the quiet
    /// spectrum uses 75% overlap for stability with the same amount of
    /// data. When no quiet window exists the noise estimate falls back to a
    /// flat spectrum at the pulse spectrum's own mean magnitude, making the
    /// subtracted trace a peak-to-average measure for that pulse.
    ///
    /// A successful detection also carries the autocorrelation-decay width
    /// of the quiet window on its spectral peak.
    pub fn analyze(&self, pulse_window: &[f32], quiet_window: Option<&[f32]>) -> SpectrumDetails {
        let size = self.config.fft_size;
        let hz_per_bin = self.hz_per_bin();

        if pulse_window.is_empty() {
            return SpectrumDetails {
                subtracted: Vec::new(),
                hz_per_bin,
                threshold: 0.0,
                spectral_peak: SpectralPeak::invalid(),
            };
        }

        let pulse_spectrum = smooth(&averaged_spectrum(pulse_window, &self.fft, size / 2), 3);
        let quiet_spectrum = match quiet_window {
            Some(quiet) if !quiet.is_empty() => {
                smooth(&averaged_spectrum(quiet, &self.fft, size / 4), 3)
            }
            _ => vec![mean(&pulse_spectrum).max(MAG_EPSILON); pulse_spectrum.len()],
        };

        // Log-ratio subtraction, guarded against zero division.
        let subtracted: Vec<f32> = pulse_spectrum
            .iter()
            .zip(quiet_spectrum.iter())
            .map(|(&p, &q)| 20.0 * (p.max(MAG_EPSILON) / q.max(MAG_EPSILON)).log10())
            .collect();

        // Bins at or below the call floor are excluded from the scan
        // entirely; leaving them in would let the dead band masquerade as
        // the quietest stretch and collapse the adaptive threshold.
        let floor_bin = ((CALL_FLOOR_HZ / hz_per_bin).ceil() as usize).min(subtracted.len());
        let (mut peaks, threshold) = detect_with_adaptive_threshold(
            &subtracted[floor_bin..],
            hz_per_bin,
            self.config.threshold_factor,
            &self.detector,
        );
        for peak in &mut peaks {
            peak.start += floor_bin;
        }

        // Single retained candidate: highest area, first wins ties.
        let best = peaks
            .iter()
            .max_by(|a, b| {
                a.area
                    .partial_cmp(&b.area)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();

        let mut spectral_peak = match best {
            Some(peak) => SpectralPeak::from_magnitudes(&subtracted, peak, hz_per_bin),
            None => SpectralPeak::invalid(),
        };

        // The autocorrelation width characterises the background the pulse
        // stood out of; without a quiet window it stays at the -1.0 sentinel.
        if spectral_peak.is_valid() {
            if let Some(quiet) = quiet_window.filter(|q| !q.is_empty()) {
                spectral_peak.autocorr_width_ms = autocorrelation_width_ms(quiet, self.sample_rate);
            }
        }

        SpectrumDetails {
            subtracted,
            hz_per_bin,
            threshold,
            spectral_peak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: f32 = 384_000.0;

    /// Linear FM sweep from `f0` to `f1` Hz over `n` samples.
    fn chirp(f0: f32, f1: f32, amplitude: f32, n: usize) -> Vec<f32> {
        let duration = n as f32 / SR;
        let k = (f1 - f0) / duration;
        (0..n)
            .map(|i| {
                let t = i as f32 / SR;
                amplitude * (2.0 * PI * (f0 * t + 0.5 * k * t * t)).sin()
            })
            .collect()
    }

    /// Reproducible white noise.
    fn noise(n: usize, amplitude: f32, seed: u32) -> Vec<f32> {
        let mut state = seed | 1;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                amplitude * (state as i32 as f32) / (i32::MAX as f32)
            })
            .collect()
    }

    fn add(a: &[f32], b: &[f32]) -> Vec<f32> {
        a.iter().zip(b.iter()).map(|(&x, &y)| x + y).collect()
    }

    #[test]
    fn sweep_band_recovered() {
        let analyzer = SpectrumAnalyzer::new(SR, SpectrumConfig::default());

        let quiet = noise(4096, 0.01, 7);
        let pulse = add(&chirp(45_000.0, 25_000.0, 0.5, 4096), &noise(4096, 0.01, 99));

        let details = analyzer.analyze(&pulse, Some(&quiet));
        assert!(details.spectral_peak.is_valid());

        let peak_hz = details.peak_frequency();
        assert!(
            (25_000..=45_000).contains(&peak_hz),
            "peak {peak_hz} outside the sweep band"
        );
        // Start is the high edge, end the low edge of a downward sweep
        let start = details.start_frequency();
        let end = details.end_frequency();
        assert!((start - 45_000).abs() < 5_000, "start {start} not near 45 kHz");
        assert!((end - 25_000).abs() < 5_000, "end {end} not near 25 kHz");
        // Monotonic construction invariant
        assert!(details.spectral_peak.low_hz <= details.spectral_peak.peak_hz);
        assert!(details.spectral_peak.peak_hz <= details.spectral_peak.high_hz);
    }

    #[test]
    fn empty_pulse_window_reports_sentinels() {
        let analyzer = SpectrumAnalyzer::new(SR, SpectrumConfig::default());
        let details = analyzer.analyze(&[], None);

        assert_eq!(details.peak_frequency(), -1);
        assert_eq!(details.start_frequency(), -1);
        assert_eq!(details.end_frequency(), -1);
        assert_eq!(details.mean_frequency(), -1);
        assert!(!details.spectral_peak.is_valid());
    }

    #[test]
    fn spectral_peak_from_empty_magnitudes_is_all_minus_one() {
        let peak = Peak {
            index: 0,
            start: 10,
            width: 30,
            sample_rate: 375.0,
            max_value: 1.0,
            area: 10.0,
            threshold: 0.1,
            prev_interval: None,
            recording_number: 0,
            pass_number: 0,
        };
        let sp = SpectralPeak::from_magnitudes(&[], peak, 375.0);

        assert_eq!(sp.peak_hz, -1);
        assert_eq!(sp.low_hz, -1);
        assert_eq!(sp.high_hz, -1);
        assert_eq!(sp.half_height_low_hz, -1);
        assert_eq!(sp.half_height_high_hz, -1);
        assert_eq!(sp.half_height_width_hz, -1);
        assert!(!sp.is_valid());
    }

    #[test]
    fn half_height_bounds_bracket_peak() {
        // Triangular lobe over bins 40..80, apex at 60
        let mut mags = vec![0.0f32; 128];
        for bin in 40..80 {
            mags[bin] = 1.0 - (bin as f32 - 60.0).abs() / 20.0;
        }
        let peak = Peak {
            index: 0,
            start: 40,
            width: 40,
            sample_rate: 375.0,
            max_value: 1.0,
            area: 20.0,
            threshold: 0.1,
            prev_interval: None,
            recording_number: 0,
            pass_number: 0,
        };
        let sp = SpectralPeak::from_magnitudes(&mags, peak, 100.0);

        assert_eq!(sp.peak_hz, 6_000);
        // Half height at magnitude 0.5 -> bins 50..70
        assert_eq!(sp.half_height_low_hz, 5_000);
        assert_eq!(sp.half_height_high_hz, 7_000);
        assert_eq!(sp.half_height_width_hz, 2_000);
        assert!(sp.half_height_low_hz <= sp.peak_hz && sp.peak_hz <= sp.half_height_high_hz);
    }

    #[test]
    fn gate_rejects_call_floor() {
        assert_eq!(gate(14_000), -1);
        assert_eq!(gate(15_000), -1);
        assert_eq!(gate(-1), -1);
        assert_eq!(gate(15_100), 15_100);
    }

    #[test]
    fn quiet_start_prefers_flat_stretch() {
        let mut envelope = noise(256, 1.0, 3).iter().map(|v| v.abs()).collect::<Vec<_>>();
        for v in &mut envelope[128..192] {
            *v = 0.05;
        }
        let start = quiet_start(&envelope, 256, 64).unwrap();
        assert!(
            (64..=192).contains(&start),
            "quiet start {start} should land in the flat stretch"
        );
    }

    #[test]
    fn quiet_start_none_when_no_room() {
        let envelope = vec![0.1f32; 32];
        assert!(quiet_start(&envelope, 16, 64).is_none());
    }

    #[test]
    fn fallback_noise_floor_still_finds_sweep() {
        let analyzer = SpectrumAnalyzer::new(SR, SpectrumConfig::default());
        let pulse = add(&chirp(45_000.0, 30_000.0, 0.5, 4096), &noise(4096, 0.005, 13));

        let details = analyzer.analyze(&pulse, None);
        let peak_hz = details.peak_frequency();
        assert!(
            (30_000..=45_000).contains(&peak_hz),
            "fallback peak {peak_hz} outside the sweep band"
        );
    }

    #[test]
    fn autocorr_width_comes_from_quiet_window() {
        let analyzer = SpectrumAnalyzer::new(SR, SpectrumConfig::default());
        let quiet = noise(4096, 0.01, 7);
        let pulse = add(&chirp(45_000.0, 25_000.0, 0.5, 4096), &noise(4096, 0.01, 99));

        let details = analyzer.analyze(&pulse, Some(&quiet));
        assert!(details.spectral_peak.is_valid());

        let width = details.spectral_peak.autocorr_width_ms;
        assert!(width > 0.0, "width {width} should be computed");
        let direct = autocorrelation_width_ms(&quiet, SR);
        assert!((width - direct).abs() < 1e-6);
    }

    #[test]
    fn autocorr_width_stays_unset_without_quiet_window() {
        let analyzer = SpectrumAnalyzer::new(SR, SpectrumConfig::default());
        let pulse = add(&chirp(45_000.0, 30_000.0, 0.5, 4096), &noise(4096, 0.005, 13));

        let details = analyzer.analyze(&pulse, None);
        assert!(details.spectral_peak.is_valid());
        assert_eq!(details.spectral_peak.autocorr_width_ms, -1.0);
    }

    #[test]
    fn averaged_spectrum_of_short_buffer_zero_pads() {
        let fft = Fft::new(256);
        let spec = averaged_spectrum(&[0.5; 64], &fft, 128);
        assert_eq!(spec.len(), 129);
    }

    #[test]
    fn window_len_covers_wide_peaks() {
        let analyzer = SpectrumAnalyzer::new(SR, SpectrumConfig::default());
        assert_eq!(analyzer.window_len(100), 1024);
        assert_eq!(analyzer.window_len(2000), 4000);
    }
}
