//! Bounded random-access sample reading.

use crate::{Error, MAX_FILE_BYTES, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::{Path, PathBuf};

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = u64::from(reader.len());
    let num_frames = total_samples / u64::from(spec.channels);

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs: num_frames as f64 / f64::from(spec.sample_rate),
    })
}

/// Random access to mono float sample windows of a recording.
///
/// `read_window` clips at the end of the recording, so a window that runs
/// past the last frame comes back short rather than failing; an empty
/// result means the start offset was past the end.
pub trait SampleSource {
    /// Sample rate in Hz.
    fn sample_rate(&self) -> f32;

    /// Total frames available.
    fn num_frames(&self) -> usize;

    /// Reads up to `len` mono samples starting at frame `start`.
    fn read_window(&self, start: usize, len: usize) -> Result<Vec<f32>>;
}

/// A WAV file read window-by-window.
///
/// Each read is a full open-seek-read-close cycle; no file handle is held
/// between windows, so a source can be kept for the whole analysis of a
/// recording without pinning the file. Multi-channel files are mixed down
/// to mono by averaging channels.
#[derive(Debug, Clone)]
pub struct WavSampleSource {
    path: PathBuf,
    info: WavInfo,
}

impl WavSampleSource {
    /// Opens a recording, reading its header and checking the size limit.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let size = std::fs::metadata(&path)?.len();
        if size > MAX_FILE_BYTES {
            return Err(Error::FileTooLarge { size });
        }
        let info = read_wav_info(&path)?;
        if info.channels == 0 {
            return Err(Error::UnsupportedLayout("zero channels".into()));
        }
        tracing::info!(
            path = %path.display(),
            channels = info.channels,
            sample_rate = info.sample_rate,
            frames = info.num_frames,
            "opened recording"
        );
        Ok(Self { path, info })
    }

    /// The header metadata read at open time.
    pub fn info(&self) -> &WavInfo {
        &self.info
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSource for WavSampleSource {
    fn sample_rate(&self) -> f32 {
        self.info.sample_rate as f32
    }

    fn num_frames(&self) -> usize {
        self.info.num_frames as usize
    }

    fn read_window(&self, start: usize, len: usize) -> Result<Vec<f32>> {
        if start >= self.num_frames() || len == 0 {
            return Ok(Vec::new());
        }
        let len = len.min(self.num_frames() - start);
        let channels = usize::from(self.info.channels);

        let mut reader = WavReader::open(&self.path)?;
        reader.seek(start as u32)?;

        let interleaved: Vec<f32> = match reader.spec().sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .take(len * channels)
                .collect::<std::result::Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let max_val = (1i64 << (self.info.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .take(len * channels)
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        if channels == 1 {
            return Ok(interleaved);
        }
        Ok(interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect())
    }
}

/// An in-memory sample source for tests and synthetic recordings.
#[derive(Debug, Clone)]
pub struct BufferSource {
    samples: Vec<f32>,
    sample_rate: f32,
}

impl BufferSource {
    /// Wraps a mono buffer at `sample_rate`.
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}

impl SampleSource for BufferSource {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn num_frames(&self) -> usize {
        self.samples.len()
    }

    fn read_window(&self, start: usize, len: usize) -> Result<Vec<f32>> {
        if start >= self.samples.len() {
            return Ok(Vec::new());
        }
        let end = (start + len).min(self.samples.len());
        Ok(self.samples[start..end].to_vec())
    }
}

/// Writes a mono 32-bit float WAV file.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 / n as f32).collect()
    }

    #[test]
    fn window_reads_match_buffer() {
        let samples = ramp(1000);
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, 384_000).unwrap();

        let source = WavSampleSource::open(file.path()).unwrap();
        assert_eq!(source.num_frames(), 1000);
        assert_eq!(source.sample_rate(), 384_000.0);

        let window = source.read_window(100, 50).unwrap();
        assert_eq!(window.len(), 50);
        for (a, b) in window.iter().zip(&samples[100..150]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn window_clips_at_end_of_file() {
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &ramp(100), 384_000).unwrap();

        let source = WavSampleSource::open(file.path()).unwrap();
        assert_eq!(source.read_window(90, 50).unwrap().len(), 10);
        assert!(source.read_window(100, 50).unwrap().is_empty());
        assert!(source.read_window(5000, 50).unwrap().is_empty());
    }

    #[test]
    fn info_reports_duration() {
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &ramp(192_000), 384_000).unwrap();

        let info = read_wav_info(file.path()).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.num_frames, 192_000);
        assert!((info.duration_secs - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(WavSampleSource::open("/nonexistent/recording.wav").is_err());
    }

    #[test]
    fn buffer_source_windows() {
        let source = BufferSource::new(ramp(100), 384_000.0);
        assert_eq!(source.read_window(0, 100).unwrap().len(), 100);
        assert_eq!(source.read_window(95, 100).unwrap().len(), 5);
        assert!(source.read_window(200, 10).unwrap().is_empty());
    }
}
