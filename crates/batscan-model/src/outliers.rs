//! Outlier-driven pulse removal.
//!
//! Two cooperating filters tighten a pass's statistics: a coarse one-shot
//! guard against corrupt readings ([`delete_extreme_pulses`]) and an
//! iterative variance-driven trim ([`remove_outliers`]).
//!
//! The iterative trim deliberately mixes two variance formulas: pulses are
//! ranked by RMS deviation from the group mean, but each tentative drop is
//! accepted against the population variance of the remainder. The mismatch
//! dampens small-sample sensitivity; keep both formulas as they are.

use crate::pass::Pass;
use crate::pulse::Pulse;
use batscan_analysis::spectrum::CALL_FLOOR_HZ;
use batscan_core::stats::{mean, variance};

/// Ceiling on a credible end frequency in Hz; anything above is a corrupt
/// reading, not a call.
const END_FREQUENCY_CEILING_HZ: i32 = 100_000;

/// Deviation bound applied to end frequency alone in Hz.
const END_DEVIATION_BOUND_HZ: f32 = 15_000.0;

/// Removes pulses whose frequencies are physically implausible or whose
/// spread makes the remaining statistics unreliable. Returns the removed
/// pulses so callers can synchronise whatever mirrors the pulse list.
///
/// A pass with fewer than 3 pulses is left untouched. If the implausibility
/// filter leaves fewer than 3, the pass is too sparse for reliable
/// statistics and every remaining pulse is removed as well.
pub fn remove_outliers(pass: &mut Pass) -> Vec<Pulse> {
    if pass.pulse_count() < 3 {
        return Vec::new();
    }

    let start_mean = mean(&frequency_values(pass.pulses(), Pulse::start_frequency));

    // Implausible pulses go first: an end frequency above the start
    // frequency, above the pass's mean start frequency, or at or below the
    // call floor cannot come from a real downward sweep.
    let implausible: Vec<usize> = pass
        .pulses()
        .iter()
        .enumerate()
        .filter(|(_, pulse)| {
            let end = pulse.end_frequency();
            let start = pulse.start_frequency();
            end > start || end as f32 > start_mean || end as f32 <= CALL_FLOOR_HZ
        })
        .map(|(i, _)| i)
        .collect();
    let mut removed = pass.delete_pulses(&implausible);

    if pass.pulse_count() < 3 {
        let all: Vec<usize> = (0..pass.pulse_count()).collect();
        removed.extend(pass.delete_pulses(&all));
        pass.invalidate();
        return removed;
    }

    // Variance-driven trim: drop the pulse deviating most from the group,
    // keep the drop only while it lowers the total population variance.
    while pass.pulse_count() > 3 {
        let Some(worst) = highest_deviation_index(pass.pulses()) else {
            break;
        };

        let before = total_variance(pass.pulses());
        let mut candidate: Vec<Pulse> = pass.pulses().to_vec();
        candidate.remove(worst);
        let after = total_variance(&candidate);

        if after < before {
            removed.extend(pass.delete_pulses(&[worst]));
        } else {
            break;
        }
    }

    pass.invalidate();
    removed
}

/// One-shot guard against corrupt readings dominating the statistics.
///
/// Removes any pulse whose start, end or peak frequency deviates from the
/// pass mean by more than 2 standard deviations, or whose end frequency
/// deviates by more than 15 kHz or exceeds 100 kHz outright. The 2 SD
/// checks only apply when the SD is known (3 or more qualifying pulses).
pub fn delete_extreme_pulses(pass: &mut Pass) -> Vec<Pulse> {
    let stats = pass.stats().clone();

    let beyond = |value: i32, m: f32, sd: f32| sd > 0.0 && (value as f32 - m).abs() > 2.0 * sd;

    let extreme: Vec<usize> = pass
        .pulses()
        .iter()
        .enumerate()
        .filter(|(_, pulse)| {
            let end = pulse.end_frequency();
            beyond(end, stats.end_frequency.mean, stats.end_frequency.sd)
                || beyond(
                    pulse.start_frequency(),
                    stats.start_frequency.mean,
                    stats.start_frequency.sd,
                )
                || beyond(
                    pulse.peak_frequency(),
                    stats.peak_frequency.mean,
                    stats.peak_frequency.sd,
                )
                || (end as f32 - stats.end_frequency.mean).abs() > END_DEVIATION_BOUND_HZ
                || end > END_FREQUENCY_CEILING_HZ
        })
        .map(|(i, _)| i)
        .collect();

    pass.delete_pulses(&extreme)
}

fn frequency_values(pulses: &[Pulse], f: fn(&Pulse) -> i32) -> Vec<f32> {
    pulses
        .iter()
        .map(f)
        .filter(|&hz| hz as f32 > CALL_FLOOR_HZ)
        .map(|hz| hz as f32)
        .collect()
}

/// Index of the pulse with the highest 3-parameter deviation score: the RMS
/// of its end, start and peak frequency deviations from the group means,
/// divided by sqrt(3).
fn highest_deviation_index(pulses: &[Pulse]) -> Option<usize> {
    let end_mean = mean(&frequency_values(pulses, Pulse::end_frequency));
    let start_mean = mean(&frequency_values(pulses, Pulse::start_frequency));
    let peak_mean = mean(&frequency_values(pulses, Pulse::peak_frequency));

    let score = |pulse: &Pulse| {
        let de = pulse.end_frequency() as f32 - end_mean;
        let ds = pulse.start_frequency() as f32 - start_mean;
        let dp = pulse.peak_frequency() as f32 - peak_mean;
        (de * de + ds * ds + dp * dp).sqrt() / 3.0f32.sqrt()
    };

    let mut best: Option<(usize, f32)> = None;
    for (i, pulse) in pulses.iter().enumerate() {
        let s = score(pulse);
        if best.is_none_or(|(_, b)| s > b) {
            best = Some((i, s));
        }
    }
    best.map(|(i, _)| i)
}

/// Mean population variance of the three frequency parameters.
fn total_variance(pulses: &[Pulse]) -> f32 {
    let var = |f: fn(&Pulse) -> i32| variance(&frequency_values(pulses, f));
    (var(Pulse::end_frequency) + var(Pulse::start_frequency) + var(Pulse::peak_frequency)) / 3.0
}
