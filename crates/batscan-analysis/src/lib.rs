//! Batscan Analysis - peak detection and spectral characterisation
//!
//! The detection half of the batscan pipeline:
//!
//! - [`fft`] - FFT wrapper and Hamming frame windowing
//! - [`peaks`] - Adaptive-threshold recursive peak detection over amplitude
//!   envelopes and spectra
//! - [`spectrum`] - Averaged pulse spectra, background-noise subtraction and
//!   spectral peak extraction
//! - [`autocorr`] - Autocorrelation-decay width estimation
//! - [`track`] - Per-frame frequency tracking for FM-shape analysis
//!
//! ## Pipeline
//!
//! ```rust,ignore
//! use batscan_analysis::peaks::{DetectorConfig, detect_with_adaptive_threshold};
//! use batscan_analysis::spectrum::{SpectrumAnalyzer, SpectrumConfig};
//! use batscan_core::{EnvelopeConfig, EnvelopeExtractor};
//!
//! let mut extractor = EnvelopeExtractor::new(384_000.0, EnvelopeConfig::default());
//! let envelope = extractor.extract(&samples);
//!
//! let config = DetectorConfig::from_millis(extractor.envelope_rate(), 2.0, 2.0, 10.0);
//! let (peaks, _) =
//!     detect_with_adaptive_threshold(&envelope, extractor.envelope_rate(), 1.5, &config);
//!
//! let analyzer = SpectrumAnalyzer::new(384_000.0, SpectrumConfig::default());
//! for peak in &peaks {
//!     let details = analyzer.analyze(&pulse_window, Some(&quiet_window));
//!     println!("peak at {} Hz", details.peak_frequency());
//! }
//! ```

pub mod autocorr;
pub mod fft;
pub mod peaks;
pub mod spectrum;
pub mod track;

pub use autocorr::autocorrelation_width_ms;
pub use fft::{Fft, hamming};
pub use peaks::{
    DetectorConfig, Peak, TraceDomain, adaptive_energy_threshold, adaptive_threshold,
    detect_peaks, detect_with_adaptive_threshold,
};
pub use spectrum::{
    CALL_FLOOR_HZ, SpectralPeak, SpectrumAnalyzer, SpectrumConfig, SpectrumDetails,
    averaged_spectrum, quiet_start,
};
pub use track::{FrequencyTrack, frequency_track};
