//! The per-recording analysis driver.
//!
//! Walks a recording pass by pass: read the pass window, extract the
//! envelope, detect peaks, characterise each peak's spectrum against a
//! quiet background window, and file the resulting pulses on the pass.
//! Windows are read on demand through the sample source; the recording is
//! never held in memory whole.

use batscan_analysis::peaks::{DetectorConfig, detect_with_adaptive_threshold};
use batscan_analysis::spectrum::{SpectrumAnalyzer, SpectrumConfig, quiet_start};
use batscan_config::AnalysisSettings;
use batscan_core::{EnvelopeConfig, EnvelopeExtractor};
use batscan_io::{Result, SampleSource};
use batscan_model::{Pass, Pulse, Recording};

/// Analyses every pass of `recording` against `source`.
///
/// The recording must already be segmented and split into passes. A pass
/// whose window cannot be read aborts the whole recording; degenerate
/// acoustic content (silence, pure noise) is not an error and simply
/// leaves passes empty.
pub fn analyze_recording(
    source: &impl SampleSource,
    recording: &mut Recording,
    settings: &AnalysisSettings,
) -> Result<()> {
    let sample_rate = source.sample_rate();
    let mut extractor = EnvelopeExtractor::new(
        sample_rate,
        EnvelopeConfig {
            decimation: settings.envelope.decimation,
            ..EnvelopeConfig::default()
        },
    );
    let analyzer = SpectrumAnalyzer::new(
        sample_rate,
        SpectrumConfig {
            fft_size: settings.spectrum.fft_size,
            threshold_factor: settings.spectrum.threshold_factor,
            leadin_bins: settings.spectrum.leadin_bins,
            leadout_bins: settings.spectrum.leadout_bins,
        },
    );

    for segment in &mut recording.segments {
        for pass in &mut segment.passes {
            analyze_pass(source, pass, settings, &mut extractor, &analyzer)?;
        }
    }
    Ok(())
}

fn analyze_pass(
    source: &impl SampleSource,
    pass: &mut Pass,
    settings: &AnalysisSettings,
    extractor: &mut EnvelopeExtractor,
    analyzer: &SpectrumAnalyzer,
) -> Result<()> {
    let samples = source.read_window(pass.offset_samples, pass.length_samples)?;
    if samples.is_empty() {
        return Ok(());
    }

    let envelope = extractor.extract(&samples);
    let env_rate = extractor.envelope_rate();
    let decimation = extractor.decimation();

    let detector = DetectorConfig::from_millis(
        env_rate,
        settings.envelope.leadin_ms,
        settings.envelope.leadout_ms,
        settings.envelope.guard_ms,
    );
    let (peaks, _) = detect_with_adaptive_threshold(
        &envelope,
        env_rate,
        settings.envelope.threshold_factor,
        &detector,
    );

    pass.envelope_threshold_factor = settings.envelope.threshold_factor;
    pass.spectrum_threshold_factor = settings.spectrum.threshold_factor;

    for peak in peaks {
        // Envelope coordinates back to raw sample coordinates.
        let raw_start = (peak.start * decimation).min(samples.len());
        let raw_width = peak.width * decimation;
        let window_len = analyzer.window_len(raw_width).min(samples.len() - raw_start);
        let pulse_window = &samples[raw_start..raw_start + window_len];

        // Matched quiet window from a low-variance stretch before the pulse.
        let quiet_env_len = (window_len / decimation).max(1);
        let quiet = quiet_start(&envelope, peak.start, quiet_env_len).map(|env_start| {
            let start = env_start * decimation;
            (
                start,
                &samples[start..(start + window_len).min(samples.len())],
            )
        });

        let spectrum = analyzer.analyze(pulse_window, quiet.as_ref().map(|(_, w)| *w));

        pass.add_pulse(Pulse {
            peak,
            spectrum,
            window_start: pass.offset_samples + raw_start,
            window_len,
            quiet_start: quiet.map(|(start, _)| pass.offset_samples + start),
        });
    }

    Ok(())
}
