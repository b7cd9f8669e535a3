//! Stem generation interface
//!
//! The engine never talks to a generation backend directly; it consumes
//! base64 PCM16 payloads through the `Generator` trait and decodes them with
//! the declared provider format. A deterministic mock implementation stands
//! in for the real backend in tests and offline demos.

use std::collections::HashMap;
use std::f32::consts::TAU;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::decode::ProviderFormat;
use crate::error::Result;

/// What kind of stem to request from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Instrumental,
    LeadVocal,
    Harmony,
}

/// Free-form generation parameters as key-value pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(flatten)]
    params: HashMap<String, serde_json::Value>,
}

impl GenerationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param<V: Serialize>(mut self, key: &str, value: V) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.params.insert(key.to_string(), value);
        }
        self
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.params
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
    }
}

/// A backend that produces stems on request
///
/// `generate` returns base64-encoded PCM16 little-endian samples in the
/// layout declared by `format`. Decoding and mixing stay on this side of
/// the boundary.
pub trait Generator {
    /// The sample layout every payload from this backend uses
    fn format(&self) -> ProviderFormat;

    /// Request one stem; the payload is base64 PCM16 LE
    fn generate(&self, kind: GenerationKind, params: &GenerationParams) -> Result<String>;
}

/// Deterministic stand-in backend
///
/// Emits a fixed-length sine burst whose pitch depends on the requested
/// kind, so decoded output is predictable enough to assert against.
pub struct MockGenerator {
    format: ProviderFormat,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            format: ProviderFormat::Mono24k,
        }
    }

    pub fn with_format(format: ProviderFormat) -> Self {
        Self { format }
    }

    fn frequency_for(kind: GenerationKind) -> f32 {
        match kind {
            GenerationKind::Instrumental => 110.0,
            GenerationKind::LeadVocal => 220.0,
            GenerationKind::Harmony => 330.0,
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for MockGenerator {
    fn format(&self) -> ProviderFormat {
        self.format
    }

    fn generate(&self, kind: GenerationKind, params: &GenerationParams) -> Result<String> {
        let duration_secs = params.get_f64("duration_secs").unwrap_or(1.0).max(0.0);
        let amplitude = params.get_f64("amplitude").unwrap_or(0.5).clamp(0.0, 1.0) as f32;

        let sample_rate = self.format.sample_rate();
        let num_channels = self.format.num_channels();
        let num_frames = (duration_secs * sample_rate as f64).round() as usize;
        let frequency = Self::frequency_for(kind);

        let mut bytes = Vec::with_capacity(num_frames * num_channels * 2);
        for frame in 0..num_frames {
            let t = frame as f32 / sample_rate as f32;
            let sample = (TAU * frequency * t).sin() * amplitude;
            let quantized = (sample * 32767.0).round() as i16;
            for _ in 0..num_channels {
                bytes.extend_from_slice(&quantized.to_le_bytes());
            }
        }

        debug!(?kind, num_frames, "mock stem generated");
        Ok(BASE64.encode(bytes))
    }
}
