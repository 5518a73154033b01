//! Embedded recording metadata.
//!
//! Ultrasonic recorders embed timestamps and notes in extra RIFF chunks
//! ("wamd", "guan" and friends). The analyzer treats them as opaque
//! key/value lookups: the chunk walk collects everything that is not audio
//! and hands the bytes to the caller undecoded.

use crate::{Error, Result};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A metadata chunk is refused beyond this size; anything larger in a
/// non-audio chunk is a corrupt length field.
const MAX_CHUNK_BYTES: u32 = 1 << 20;

/// One non-audio RIFF chunk from a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataChunk {
    /// Four-character chunk identifier, e.g. `wamd` or `guan`.
    pub id: String,
    /// Raw chunk payload, undecoded.
    pub data: Vec<u8>,
}

impl MetadataChunk {
    /// The payload as text, with non-printable bytes replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data)
            .chars()
            .map(|c| {
                if c.is_control() && c != '\n' && c != '\t' {
                    '.'
                } else {
                    c
                }
            })
            .collect()
    }
}

/// Walks the RIFF chunk list of a WAV file and returns every chunk that is
/// not `fmt ` or `data`, in file order.
pub fn read_metadata_chunks<P: AsRef<Path>>(path: P) -> Result<Vec<MetadataChunk>> {
    let mut file = std::fs::File::open(path)?;

    let mut header = [0u8; 12];
    file.read_exact(&mut header)?;
    if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return Err(Error::UnsupportedLayout("not a RIFF/WAVE file".into()));
    }

    let mut chunks = Vec::new();
    let mut chunk_header = [0u8; 8];
    loop {
        match file.read_exact(&mut chunk_header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let id = String::from_utf8_lossy(&chunk_header[0..4]).into_owned();
        let size = u32::from_le_bytes([
            chunk_header[4],
            chunk_header[5],
            chunk_header[6],
            chunk_header[7],
        ]);
        // Chunks are word-aligned: odd sizes carry one pad byte.
        let advance = u64::from(size) + u64::from(size % 2);

        if id == "fmt " || id == "data" || size > MAX_CHUNK_BYTES {
            if size > MAX_CHUNK_BYTES {
                tracing::debug!(id = %id, size, "skipping oversized chunk");
            }
            file.seek(SeekFrom::Current(advance as i64))?;
            continue;
        }

        let mut data = vec![0u8; size as usize];
        file.read_exact(&mut data)?;
        if size % 2 == 1 {
            file.seek(SeekFrom::Current(1))?;
        }
        chunks.push(MetadataChunk { id, data });
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Minimal WAV with a custom metadata chunk appended.
    fn wav_with_chunk(id: &[u8; 4], payload: &[u8]) -> NamedTempFile {
        let mut body = Vec::new();
        // fmt chunk: mono 32-bit float at 384 kHz
        body.extend_from_slice(b"fmt ");
        body.extend_from_slice(&16u32.to_le_bytes());
        body.extend_from_slice(&3u16.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&384_000u32.to_le_bytes());
        body.extend_from_slice(&(384_000u32 * 4).to_le_bytes());
        body.extend_from_slice(&4u16.to_le_bytes());
        body.extend_from_slice(&32u16.to_le_bytes());
        // empty data chunk
        body.extend_from_slice(b"data");
        body.extend_from_slice(&0u32.to_le_bytes());
        // metadata chunk
        body.extend_from_slice(id);
        body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        body.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            body.push(0);
        }

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"RIFF").unwrap();
        file.write_all(&(4 + body.len() as u32).to_le_bytes()).unwrap();
        file.write_all(b"WAVE").unwrap();
        file.write_all(&body).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn metadata_chunk_recovered() {
        let file = wav_with_chunk(b"guan", b"GUANO|Version:1.0\nNote:test");
        let chunks = read_metadata_chunks(file.path()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "guan");
        assert!(chunks[0].text().contains("Note:test"));
    }

    #[test]
    fn odd_sized_chunk_is_padded() {
        let file = wav_with_chunk(b"wamd", b"abc");
        let chunks = read_metadata_chunks(file.path()).unwrap();
        assert_eq!(chunks[0].data, b"abc");
    }

    #[test]
    fn audio_chunks_skipped() {
        let file = wav_with_chunk(b"guan", b"x");
        let chunks = read_metadata_chunks(file.path()).unwrap();
        assert!(chunks.iter().all(|c| c.id != "fmt " && c.id != "data"));
    }

    #[test]
    fn non_riff_file_refused() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"this is not a wav file at all").unwrap();
        file.flush().unwrap();
        assert!(read_metadata_chunks(file.path()).is_err());
    }

    #[test]
    fn control_bytes_rendered_printable() {
        let chunk = MetadataChunk {
            id: "wamd".into(),
            data: vec![0x01, b'h', b'i', 0x00],
        };
        assert_eq!(chunk.text(), ".hi.");
    }
}
