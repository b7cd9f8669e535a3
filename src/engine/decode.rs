//! Generation payload decoding
//!
//! The generation collaborator delivers raw audio as base64-encoded signed
//! 16-bit little-endian PCM. Each provider path uses one fixed format; there
//! is no negotiation, the caller selects the format by provider.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::engine::buffer::AudioBuffer;
use crate::error::{EngineError, Result};

/// Fixed PCM formats produced by the generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFormat {
    /// Vocal synthesis path: 24 kHz mono
    Mono24k,
    /// Instrumental path: 44.1 kHz stereo
    Stereo44k,
}

impl ProviderFormat {
    /// Sample rate of this provider's payloads
    pub fn sample_rate(&self) -> u32 {
        match self {
            ProviderFormat::Mono24k => 24_000,
            ProviderFormat::Stereo44k => 44_100,
        }
    }

    /// Channel count of this provider's payloads
    pub fn num_channels(&self) -> usize {
        match self {
            ProviderFormat::Mono24k => 1,
            ProviderFormat::Stereo44k => 2,
        }
    }
}

/// Decode a base64 PCM16-LE payload into an audio buffer
///
/// Malformed payloads produce `DecodeFailure`; the caller records the track
/// as unavailable rather than propagating the error further.
pub fn decode_base64_pcm16(payload: &str, format: ProviderFormat) -> Result<AudioBuffer> {
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| EngineError::DecodeFailure {
            reason: format!("invalid base64: {}", e),
        })?;
    decode_pcm16(&bytes, format)
}

/// Decode raw PCM16-LE bytes into an audio buffer
pub fn decode_pcm16(bytes: &[u8], format: ProviderFormat) -> Result<AudioBuffer> {
    if bytes.len() % 2 != 0 {
        return Err(EngineError::DecodeFailure {
            reason: format!("odd byte length {} for 16-bit PCM", bytes.len()),
        });
    }

    let channels = format.num_channels();
    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    if samples.len() % channels != 0 {
        return Err(EngineError::DecodeFailure {
            reason: format!(
                "sample count {} is not divisible by {} channels",
                samples.len(),
                channels
            ),
        });
    }

    if samples.is_empty() {
        return Err(EngineError::DecodeFailure {
            reason: "payload contains no samples".to_string(),
        });
    }

    AudioBuffer::from_interleaved(samples, channels, format.sample_rate())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_pcm16(samples: &[i16]) -> String {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        BASE64.encode(bytes)
    }

    #[test]
    fn test_decode_mono_24k() {
        let payload = encode_pcm16(&[0, 16384, -16384, 32767]);
        let buf = decode_base64_pcm16(&payload, ProviderFormat::Mono24k).unwrap();
        assert_eq!(buf.sample_rate(), 24_000);
        assert_eq!(buf.num_channels(), 1);
        assert_eq!(buf.num_frames(), 4);
        assert!((buf.get(1, 0).unwrap() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_stereo_44k() {
        let payload = encode_pcm16(&[100, -100, 200, -200]);
        let buf = decode_base64_pcm16(&payload, ProviderFormat::Stereo44k).unwrap();
        assert_eq!(buf.sample_rate(), 44_100);
        assert_eq!(buf.num_channels(), 2);
        assert_eq!(buf.num_frames(), 2);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_base64_pcm16("not-base-64!!!", ProviderFormat::Mono24k).unwrap_err();
        assert_eq!(err.error_code(), "DECODE_FAILURE");
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        let err = decode_pcm16(&[0u8; 3], ProviderFormat::Mono24k).unwrap_err();
        assert_eq!(err.error_code(), "DECODE_FAILURE");
    }

    #[test]
    fn test_decode_rejects_ragged_stereo() {
        // 3 samples cannot interleave into 2 channels
        let err = decode_pcm16(&[0u8; 6], ProviderFormat::Stereo44k).unwrap_err();
        assert_eq!(err.error_code(), "DECODE_FAILURE");
    }

    #[test]
    fn test_decode_rejects_empty() {
        let err = decode_pcm16(&[], ProviderFormat::Mono24k).unwrap_err();
        assert_eq!(err.error_code(), "DECODE_FAILURE");
    }
}
