//! One detected call: a time-domain peak paired with its spectrum.

use batscan_analysis::peaks::Peak;
use batscan_analysis::spectrum::SpectrumDetails;

/// A single bat call within a pass.
///
/// Pairs the envelope-domain [`Peak`] with the [`SpectrumDetails`] computed
/// from its sample window. Window positions are in raw samples relative to
/// the owning recording, so the windows can be re-read from the source file
/// for display without keeping the audio in memory.
#[derive(Debug, Clone)]
pub struct Pulse {
    /// The envelope-domain detection, pass-relative.
    pub peak: Peak,
    /// Spectral characterisation of the pulse window.
    pub spectrum: SpectrumDetails,
    /// Start of the pulse sample window in raw samples from the start of
    /// the recording.
    pub window_start: usize,
    /// Length of the pulse sample window in raw samples.
    pub window_len: usize,
    /// Start of the quiet background window, if one was found.
    pub quiet_start: Option<usize>,
}

impl Pulse {
    /// Start frequency in Hz, or -1 when not computable. Bat calls sweep
    /// downward, so this is the high edge of the spectral lobe.
    pub fn start_frequency(&self) -> i32 {
        self.spectrum.start_frequency()
    }

    /// End frequency in Hz (low edge of the lobe), or -1.
    pub fn end_frequency(&self) -> i32 {
        self.spectrum.end_frequency()
    }

    /// Peak frequency in Hz, or -1.
    pub fn peak_frequency(&self) -> i32 {
        self.spectrum.peak_frequency()
    }

    /// Pulse duration in milliseconds, from the envelope-domain peak.
    pub fn duration_ms(&self) -> f32 {
        self.peak.duration_ms()
    }

    /// Interval from the previous pulse in milliseconds, if known.
    pub fn interval_ms(&self) -> Option<f32> {
        self.peak.interval_ms()
    }
}
