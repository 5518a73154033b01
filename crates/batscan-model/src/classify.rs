//! Template-based species suggestion.
//!
//! A pass's aggregate parameters are scored against reference call
//! templates, one band of [upper, lower, median] per parameter. The score
//! multiplies a range-overlap factor and a proximity-of-means factor across
//! all five parameters, then scales by how similarly the peak frequency
//! sits within the start-end band. Scores are comparative rankings, not
//! probabilities.

use crate::pass::{ParameterStats, PassStats};
use batscan_analysis::track::FrequencyTrack;

/// One parameter's reference band, in the parameter's natural unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterBand {
    /// Upper bound of typical calls.
    pub upper: f32,
    /// Lower bound of typical calls.
    pub lower: f32,
    /// Typical (median) value.
    pub median: f32,
}

impl ParameterBand {
    /// Builds a band, ordering the bounds if given reversed.
    pub fn new(lower: f32, upper: f32, median: f32) -> Self {
        Self {
            upper: upper.max(lower),
            lower: lower.min(upper),
            median,
        }
    }

    fn width(&self) -> f32 {
        self.upper - self.lower
    }
}

/// A reference call template for one species.
///
/// Frequencies are in kHz, durations and intervals in milliseconds.
#[derive(Debug, Clone)]
pub struct CallTemplate {
    /// Species or call-type label reported in the match list.
    pub species: String,
    /// Start (high-edge) frequency band in kHz.
    pub start_khz: ParameterBand,
    /// End (low-edge) frequency band in kHz.
    pub end_khz: ParameterBand,
    /// Peak frequency band in kHz.
    pub peak_khz: ParameterBand,
    /// Inter-pulse interval band in ms.
    pub interval_ms: ParameterBand,
    /// Pulse duration band in ms.
    pub duration_ms: ParameterBand,
}

/// Built-in reference templates for common UK species.
///
/// Bands are search-phase figures from field guides; they are deliberately
/// broad, the scoring does the discrimination.
pub fn reference_templates() -> Vec<CallTemplate> {
    let band = ParameterBand::new;
    vec![
        CallTemplate {
            species: "Common pipistrelle".into(),
            start_khz: band(45.0, 70.0, 55.0),
            end_khz: band(42.0, 47.0, 45.0),
            peak_khz: band(43.0, 48.0, 46.0),
            interval_ms: band(70.0, 110.0, 90.0),
            duration_ms: band(3.0, 8.0, 5.5),
        },
        CallTemplate {
            species: "Soprano pipistrelle".into(),
            start_khz: band(50.0, 75.0, 60.0),
            end_khz: band(51.0, 58.0, 53.0),
            peak_khz: band(52.0, 60.0, 55.0),
            interval_ms: band(60.0, 100.0, 80.0),
            duration_ms: band(3.0, 8.0, 5.5),
        },
        CallTemplate {
            species: "Noctule".into(),
            start_khz: band(22.0, 45.0, 28.0),
            end_khz: band(17.0, 25.0, 20.0),
            peak_khz: band(18.0, 27.0, 21.0),
            interval_ms: band(150.0, 400.0, 250.0),
            duration_ms: band(10.0, 25.0, 15.0),
        },
        CallTemplate {
            species: "Daubenton's bat".into(),
            start_khz: band(60.0, 85.0, 70.0),
            end_khz: band(25.0, 35.0, 30.0),
            peak_khz: band(40.0, 50.0, 45.0),
            interval_ms: band(60.0, 100.0, 80.0),
            duration_ms: band(2.0, 5.0, 3.5),
        },
        CallTemplate {
            species: "Brown long-eared bat".into(),
            start_khz: band(35.0, 55.0, 45.0),
            end_khz: band(20.0, 30.0, 25.0),
            peak_khz: band(28.0, 40.0, 33.0),
            interval_ms: band(40.0, 90.0, 60.0),
            duration_ms: band(1.5, 4.0, 2.5),
        },
    ]
}

/// Scores every template against the pass statistics and formats the
/// matches with positive score, best first.
///
/// Returns `"no match"` when nothing scores above zero, which is the
/// normal outcome for a noise-only pass.
pub fn classify(stats: &PassStats, templates: &[CallTemplate]) -> String {
    let mut scored: Vec<(&str, f32)> = templates
        .iter()
        .map(|t| (t.species.as_str(), score_template(stats, t)))
        .filter(|&(_, s)| s > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    if scored.is_empty() {
        return "no match".into();
    }
    let parts: Vec<String> = scored
        .iter()
        .map(|(species, score)| format!("{species} ({score:.3})"))
        .collect();
    parts.join(", ")
}

/// Product of per-parameter scores, scaled by the peak-position factor.
fn score_template(stats: &PassStats, template: &CallTemplate) -> f32 {
    let khz = |p: ParameterStats| ParameterStats {
        mean: p.mean / 1000.0,
        sd: p.sd / 1000.0,
        count: p.count,
    };

    let start = khz(stats.start_frequency);
    let end = khz(stats.end_frequency);
    let peak = khz(stats.peak_frequency);

    let score = parameter_score(start, &template.start_khz)
        * parameter_score(end, &template.end_khz)
        * parameter_score(peak, &template.peak_khz)
        * parameter_score(stats.interval_ms, &template.interval_ms)
        * parameter_score(stats.duration_ms, &template.duration_ms);

    score * peak_position_factor(&start, &end, &peak, template)
}

fn parameter_score(stats: ParameterStats, band: &ParameterBand) -> f32 {
    if stats.count == 0 {
        return 0.0;
    }
    overlap_score(stats.mean, stats.sd, band) * proximity_score(stats.mean, band)
}

/// Overlap of the pass's mean +/- SD interval with the template band:
/// 0 when disjoint, 1 when the pass interval sits inside the band, 0.75
/// when it encloses the band, else the contained fraction of the pass
/// interval. A zero-SD pass degenerates to a point test.
fn overlap_score(mean: f32, sd: f32, band: &ParameterBand) -> f32 {
    let lo = mean - sd;
    let hi = mean + sd;
    if hi < band.lower || lo > band.upper {
        return 0.0;
    }
    if lo >= band.lower && hi <= band.upper {
        return 1.0;
    }
    if lo < band.lower && hi > band.upper {
        return 0.75;
    }
    let span = hi - lo;
    if span <= 0.0 {
        // Point inside the band (the disjoint case returned already).
        return 1.0;
    }
    (hi.min(band.upper) - lo.max(band.lower)) / span
}

/// How close the pass mean is to the band median, on the band's own scale.
fn proximity_score(mean: f32, band: &ParameterBand) -> f32 {
    let width = band.width();
    if width <= 0.0 {
        return if (mean - band.median).abs() < f32::EPSILON {
            1.0
        } else {
            0.0
        };
    }
    (1.0 - (mean - band.median).abs() / width).clamp(0.0, 1.0)
}

/// Compares where the peak frequency sits within the start-end sweep
/// against the template's own relative peak position.
fn peak_position_factor(
    start: &ParameterStats,
    end: &ParameterStats,
    peak: &ParameterStats,
    template: &CallTemplate,
) -> f32 {
    let relative = |peak: f32, start: f32, end: f32| {
        let span = start - end;
        if span.abs() < f32::EPSILON {
            return 0.5;
        }
        ((peak - end) / span).clamp(0.0, 1.0)
    };
    let pass_rel = relative(peak.mean, start.mean, end.mean);
    let template_rel = relative(
        template.peak_khz.median,
        template.start_khz.median,
        template.end_khz.median,
    );
    (1.0 - (pass_rel - template_rel).abs()).clamp(0.0, 1.0)
}

/// Slope class of one third of a call relative to its overall slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeClass {
    /// Steeper than the overall slope by more than 20%.
    High,
    /// Within 20% of the overall slope.
    Medium,
    /// Shallower than the overall slope by more than 20%.
    Low,
}

fn classify_slope(slope: f32, overall: f32) -> SlopeClass {
    let reference = overall.abs();
    if slope.abs() > reference * 1.2 {
        SlopeClass::High
    } else if slope.abs() < reference * 0.8 {
        SlopeClass::Low
    } else {
        SlopeClass::Medium
    }
}

/// Coarse FM-shape label from a pulse's frequency track.
///
/// The track's first, middle and final third slopes are classified against
/// the overall slope and mapped to a shape label. `None` when the track is
/// too short to split into thirds.
pub fn fm_shape(track: &FrequencyTrack) -> Option<&'static str> {
    let thirds = track.third_slopes()?;
    let overall = track.overall_slope();

    let c1 = classify_slope(thirds[0], overall);
    let c2 = classify_slope(thirds[1], overall);
    let c3 = classify_slope(thirds[2], overall);

    use SlopeClass::{High, Low, Medium};
    Some(match (c1, c2, c3) {
        (High, High, High) => "FM1",
        (High, High, Medium) | (High, Medium, Medium) => "FM2",
        (High, Medium, Low) | (High, High, Low) | (Medium, Medium, Low) => "FM/qCF",
        (Medium, Medium, Medium) => "FM3",
        (Medium, Low, Low) | (Low, Low, Low) => "qCF",
        (Low, Low, High) | (Low, Medium, High) | (Low, Low, Medium) => "CF-FM",
        _ => "FM",
    })
}
