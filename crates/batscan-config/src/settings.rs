//! The analysis settings file format.

use crate::error::ConfigError;
use crate::validation::{ValidationResult, check_range, collect};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Envelope extraction and time-domain detection settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvelopeSettings {
    /// Detection threshold factor over the noise-floor estimate.
    pub threshold_factor: f32,
    /// Back-scan gap tolerance in milliseconds.
    pub leadin_ms: f32,
    /// Forward-scan gap tolerance in milliseconds.
    pub leadout_ms: f32,
    /// Exclusion zone around an accepted pulse in milliseconds.
    pub guard_ms: f32,
    /// Raw samples averaged into one envelope sample.
    pub decimation: usize,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            threshold_factor: 1.5,
            leadin_ms: 2.0,
            leadout_ms: 2.0,
            guard_ms: 10.0,
            decimation: 32,
        }
    }
}

/// Spectral analysis settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectrumSettings {
    /// Detection threshold factor on the noise-subtracted spectrum.
    pub threshold_factor: f32,
    /// Back-scan gap tolerance in frequency bins.
    pub leadin_bins: usize,
    /// Forward-scan gap tolerance in frequency bins.
    pub leadout_bins: usize,
    /// FFT frame size; power of two, 128-2048.
    pub fft_size: usize,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            threshold_factor: 1.5,
            leadin_bins: 5,
            leadout_bins: 5,
            fft_size: 1024,
        }
    }
}

/// Complete analysis configuration.
///
/// Stored as TOML:
///
/// ```toml
/// [envelope]
/// threshold_factor = 1.5
/// leadin_ms = 2.0
/// leadout_ms = 2.0
/// guard_ms = 10.0
/// decimation = 32
///
/// [spectrum]
/// threshold_factor = 1.5
/// leadin_bins = 5
/// leadout_bins = 5
/// fft_size = 1024
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Envelope extraction and time-domain detection.
    pub envelope: EnvelopeSettings,
    /// Spectral analysis.
    pub spectrum: SpectrumSettings,
}

impl AnalysisSettings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings: AnalysisSettings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: AnalysisSettings = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save the settings to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks every setting against its allowed range.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        check_range(
            "envelope.threshold_factor",
            self.envelope.threshold_factor,
            0.1,
            100.0,
            &mut errors,
        );
        check_range("envelope.leadin_ms", self.envelope.leadin_ms, 0.0, 100.0, &mut errors);
        check_range(
            "envelope.leadout_ms",
            self.envelope.leadout_ms,
            0.0,
            100.0,
            &mut errors,
        );
        check_range("envelope.guard_ms", self.envelope.guard_ms, 0.0, 1000.0, &mut errors);
        check_range(
            "envelope.decimation",
            self.envelope.decimation as f32,
            1.0,
            1024.0,
            &mut errors,
        );
        check_range(
            "spectrum.threshold_factor",
            self.spectrum.threshold_factor,
            0.1,
            100.0,
            &mut errors,
        );

        let fft = self.spectrum.fft_size;
        if !(128..=2048).contains(&fft) {
            check_range("spectrum.fft_size", fft as f32, 128.0, 2048.0, &mut errors);
        } else if !fft.is_power_of_two() {
            errors.push(crate::validation::ValidationError::NotPowerOfTwo(fft));
        }

        collect(errors)
    }
}
