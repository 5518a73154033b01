//! Recordings, labelled segments and pass splitting.
//!
//! A recording owns segments, a segment owns passes. Segment boundaries
//! come either from a sidecar label file or default to the whole file as
//! one unlabelled segment. Each segment is then split into passes: one pass
//! when the segment fits in 7.5 s, otherwise equal windows of roughly the
//! nominal 5 s pass length.

use crate::pass::Pass;
use std::path::PathBuf;

/// A segment longer than this is split into multiple passes.
pub const MAX_PASS_S: f64 = 7.5;

/// Nominal pass length used when a segment has to be split.
pub const NOMINAL_PASS_S: f64 = 5.0;

/// A labelled time region of a recording.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Ordinal position within the owning recording.
    pub number: usize,
    /// Free-text label from the sidecar file; empty for a whole-file
    /// default segment.
    pub label: String,
    /// Segment start within the recording, in seconds.
    pub start_s: f64,
    /// Segment end within the recording, in seconds.
    pub end_s: f64,
    /// The segment's passes in time order.
    pub passes: Vec<Pass>,
}

impl Segment {
    /// Creates a segment with no passes yet.
    pub fn new(number: usize, label: impl Into<String>, start_s: f64, end_s: f64) -> Self {
        Self {
            number,
            label: label.into(),
            start_s,
            end_s,
            passes: Vec::new(),
        }
    }

    /// Segment duration in seconds.
    pub fn duration_s(&self) -> f64 {
        (self.end_s - self.start_s).max(0.0)
    }

    /// Splits the segment into empty passes at `sample_rate`.
    ///
    /// A segment of up to 7.5 s becomes a single pass. Anything longer is
    /// cut into `ceil(duration / 5 s)` equal windows, so no pass exceeds
    /// the 7.5 s bound and all passes of a segment have the same length.
    pub fn create_passes(&mut self, sample_rate: f32, recording_number: usize) {
        let duration = self.duration_s();
        let total_samples = (duration * f64::from(sample_rate)) as usize;
        let offset = (self.start_s * f64::from(sample_rate)) as usize;

        self.passes.clear();
        if total_samples == 0 {
            return;
        }

        let count = if duration <= MAX_PASS_S {
            1
        } else {
            (duration / NOMINAL_PASS_S).ceil() as usize
        };
        let pass_len = total_samples / count;

        for i in 0..count {
            let start = offset + i * pass_len;
            // The last pass absorbs the division remainder.
            let len = if i + 1 == count {
                total_samples - i * pass_len
            } else {
                pass_len
            };
            self.passes
                .push(Pass::new(i, recording_number, start, len, sample_rate));
        }
    }
}

/// A single source file and its segments.
#[derive(Debug, Clone)]
pub struct Recording {
    /// Ordinal position within a batch run.
    pub number: usize,
    /// Path of the source file.
    pub path: PathBuf,
    /// Raw audio sample rate in Hz.
    pub sample_rate: f32,
    /// Total frames in the file.
    pub num_frames: usize,
    /// The recording's segments in time order.
    pub segments: Vec<Segment>,
}

impl Recording {
    /// Creates a recording with a single whole-file segment.
    pub fn new(number: usize, path: PathBuf, sample_rate: f32, num_frames: usize) -> Self {
        let duration = num_frames as f64 / f64::from(sample_rate);
        Self {
            number,
            path,
            sample_rate,
            num_frames,
            segments: vec![Segment::new(0, "", 0.0, duration)],
        }
    }

    /// Replaces the default segmentation with labelled regions.
    ///
    /// Labels are `(start_s, end_s, text)` in recording time. Regions
    /// extending past the end of the file are clipped; empty or inverted
    /// regions are dropped. An empty label list restores the whole-file
    /// default.
    pub fn apply_labels(&mut self, labels: &[(f64, f64, String)]) {
        let duration = self.duration_s();
        let segments: Vec<Segment> = labels
            .iter()
            .filter(|(start, end, _)| *end > *start && *start < duration)
            .enumerate()
            .map(|(i, (start, end, text))| {
                Segment::new(i, text.clone(), start.max(0.0), end.min(duration))
            })
            .collect();

        if segments.is_empty() {
            self.segments = vec![Segment::new(0, "", 0.0, duration)];
        } else {
            self.segments = segments;
        }
    }

    /// Recording duration in seconds.
    pub fn duration_s(&self) -> f64 {
        self.num_frames as f64 / f64::from(self.sample_rate)
    }

    /// Splits every segment into passes.
    pub fn create_passes(&mut self) {
        let (rate, number) = (self.sample_rate, self.number);
        for segment in &mut self.segments {
            segment.create_passes(rate, number);
        }
    }
}
