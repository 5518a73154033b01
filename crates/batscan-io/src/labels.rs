//! Sidecar segment label files.
//!
//! One label per line, `<startSeconds> <endSeconds> <comment>`, tab or
//! space delimited. Blank lines and continuation lines starting with a
//! backslash are ignored, as are lines whose times do not parse. This
//! matches the label track export format of common audio editors.

use crate::Result;
use std::path::{Path, PathBuf};

/// Parses sidecar label text into `(start_s, end_s, comment)` triples.
pub fn parse_labels(text: &str) -> Vec<(f64, f64, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('\\') {
                return None;
            }
            let mut fields = line.split_whitespace();
            let start: f64 = fields.next()?.parse().ok()?;
            let end: f64 = fields.next()?.parse().ok()?;
            let comment = fields.collect::<Vec<_>>().join(" ");
            Some((start, end, comment))
        })
        .collect()
}

/// Reads and parses a sidecar label file.
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<(f64, f64, String)>> {
    Ok(parse_labels(&std::fs::read_to_string(path)?))
}

/// The conventional sidecar path for a recording: same name, `.txt`.
pub fn sidecar_path<P: AsRef<Path>>(recording: P) -> PathBuf {
    recording.as_ref().with_extension("txt")
}
