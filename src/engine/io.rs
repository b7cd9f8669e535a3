//! WAV I/O
//!
//! Export writes the canonical 44-byte-header WAV container (RIFF/WAVE/fmt/
//! data, PCM16 little-endian, no extension chunks). Encoding is
//! deterministic: the same buffer and parameters always produce byte-identical
//! output. Import reads already-produced stems back for export-time hydration.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::AudioBuffer;
use crate::error::{EngineError, Result};

/// Convert one float sample to PCM16 with symmetric clamping
#[inline]
fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

fn wav_spec(buffer: &AudioBuffer) -> WavSpec {
    WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Encode a buffer to an in-memory PCM16 WAV file
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, wav_spec(buffer))?;
        for &sample in buffer.samples() {
            writer.write_sample(to_pcm16(sample))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Write a buffer to a PCM16 WAV file on disk
pub fn write_wav(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    let mut writer = WavWriter::create(path, wav_spec(buffer))?;
    for &sample in buffer.samples() {
        writer.write_sample(to_pcm16(sample))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Load a WAV file from disk into an audio buffer
pub fn load_wav(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(EngineError::InvalidAudio {
            reason: format!("file not found: {}", path.display()),
        });
    }
    let reader = WavReader::open(path)?;
    read_wav(reader)
}

/// Load a WAV file from a byte slice (export-time buffer hydration)
pub fn load_wav_bytes(bytes: &[u8]) -> Result<AudioBuffer> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    read_wav(reader)
}

fn read_wav<R: std::io::Read>(mut reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0))
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        (format, bits) => {
            return Err(EngineError::InvalidAudio {
                reason: format!("unsupported WAV format: {:?} {} bit", format, bits),
            })
        }
    };

    AudioBuffer::from_interleaved(samples, channels, spec.sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_buffer(frames: usize, channels: usize, rate: u32) -> AudioBuffer {
        let mut buf = AudioBuffer::new(channels, frames, rate);
        for frame in 0..frames {
            for ch in 0..channels {
                buf.set(frame, ch, (frame as f32 / frames as f32) - 0.5);
            }
        }
        buf
    }

    #[test]
    fn test_canonical_header() {
        let buf = ramp_buffer(100, 1, 44100);
        let bytes = encode_wav(&buf).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[36..40], b"data");
        // PCM16 mono: format tag 1, 16 bits per sample
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16);
        assert_eq!(
            u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            44100
        );
        // 44-byte header + 2 bytes per sample
        assert_eq!(bytes.len(), 44 + 100 * 2);
    }

    #[test]
    fn test_encode_deterministic() {
        let buf = ramp_buffer(500, 2, 48000);
        let a = encode_wav(&buf).unwrap();
        let b = encode_wav(&buf).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_trip_bytes() {
        let buf = ramp_buffer(200, 2, 44100);
        let bytes = encode_wav(&buf).unwrap();
        let loaded = load_wav_bytes(&bytes).unwrap();
        assert_eq!(loaded.num_channels(), 2);
        assert_eq!(loaded.num_frames(), 200);
        assert_eq!(loaded.sample_rate(), 44100);
        for (a, b) in buf.samples().iter().zip(loaded.samples()) {
            assert!((a - b).abs() < 1.0 / 32000.0);
        }
    }

    #[test]
    fn test_write_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mix.wav");
        let buf = ramp_buffer(300, 1, 22050);
        write_wav(&buf, &path).unwrap();
        let loaded = load_wav(&path).unwrap();
        assert_eq!(loaded.num_frames(), 300);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_wav(Path::new("/nonexistent/missing.wav")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_AUDIO");
    }
}
