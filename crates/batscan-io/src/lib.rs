//! File access layer for the batscan pipeline.
//!
//! This crate provides:
//!
//! - **Sample access**: [`SampleSource`] for bounded random-access reads of
//!   mono float windows, with [`WavSampleSource`] reading WAV files and
//!   [`BufferSource`] serving in-memory buffers to tests
//! - **Sidecar labels**: [`read_labels`] for the whitespace-delimited
//!   `<start> <end> <comment>` segment label format
//! - **Recording metadata**: [`read_metadata_chunks`] for opaque key/value
//!   chunks embedded by ultrasonic recorders
//!
//! Recordings are never loaded wholesale: envelope extraction and spectral
//! analysis read only the windows they need, so a sample source performs an
//! open-seek-read-close cycle per window.

mod labels;
mod metadata;
mod source;

pub use labels::{read_labels, parse_labels, sidecar_path};
pub use metadata::{MetadataChunk, read_metadata_chunks};
pub use source::{
    BufferSource, SampleSource, WavInfo, WavSampleSource, read_wav_info, write_wav,
};

/// Largest file the analyzer will process, in bytes. Oversized recordings
/// are refused up front rather than discovered mid-analysis.
pub const MAX_FILE_BYTES: u64 = 1 << 30;

/// Error types for file access operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The recording exceeds the processing size limit.
    #[error("file is {size} bytes, over the {MAX_FILE_BYTES} byte limit")]
    FileTooLarge {
        /// Size of the refused file in bytes.
        size: u64,
    },

    /// The file is not mono float/integer PCM the analyzer can read.
    #[error("unsupported WAV layout: {0}")]
    UnsupportedLayout(String),
}

/// Convenience result type for file access operations.
pub type Result<T> = std::result::Result<T, Error>;
