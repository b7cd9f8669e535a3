//! Offline rendering
//!
//! Re-executes the signal-chain topology against an isolated non-real-time
//! context to produce a finished buffer, per stem or merged. Parameters are
//! frozen into the `RenderRequest` before the render starts; automation is
//! baked into the snapshot by the caller, not sampled during the render.
//! Output encoding is deterministic: the same request always produces
//! byte-identical WAV bytes.

use std::path::Path;

use tracing::{debug, info};

use crate::engine::buffer::AudioBuffer;
use crate::engine::context::{ContextConfig, ExecutionContext};
use crate::engine::io;
use crate::error::{EngineError, Result};
use crate::graph::{ChainSettings, OfflineExecutor};
use crate::session::{resolve_effective_gains, Session, SendLevels, TrackId};
use crate::dsp::eq::EqSettings;

/// Frozen snapshot of one track at render time
#[derive(Debug, Clone)]
pub struct TrackConfig {
    pub track_id: TrackId,
    /// Decoded source; `None` when the track is still loading or failed to
    /// decode. Such tracks are skipped, not fatal.
    pub buffer: Option<AudioBuffer>,
    /// Effective gain at snapshot time (mute/solo already resolved)
    pub volume: f32,
    pub eq: EqSettings,
    pub sends: SendLevels,
    pub offset_secs: f64,
}

/// One export request; used once and discarded
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub tracks: Vec<TrackConfig>,
    pub sample_rate: u32,
    pub num_channels: usize,
    /// When false, EQ and sends are forced to pass-through (dry stems);
    /// volume is still applied.
    pub apply_effects: bool,
}

impl RenderRequest {
    /// Snapshot a session's current parameters into a request
    ///
    /// The session's A/B bypass folds into `apply_effects`, so a bypassed
    /// session exports exactly what it monitors.
    pub fn from_session(
        session: &Session,
        sample_rate: u32,
        num_channels: usize,
        apply_effects: bool,
    ) -> Self {
        let gains = resolve_effective_gains(session.tracks());
        let tracks = session
            .tracks()
            .iter()
            .map(|track| TrackConfig {
                track_id: track.id,
                buffer: track.source.clone(),
                volume: gains.get(&track.id).copied().unwrap_or(0.0),
                eq: track.eq.clone(),
                sends: track.sends,
                offset_secs: track.offset_secs,
            })
            .collect();
        Self {
            tracks,
            sample_rate,
            num_channels,
            apply_effects: apply_effects && !session.bypass_effects(),
        }
    }
}

/// The offline renderer
///
/// Carries the base context configuration (impulse response length, render
/// length cap); sample rate and channel count come from each request.
#[derive(Debug, Clone)]
pub struct OfflineRenderer {
    base_config: ContextConfig,
}

impl Default for OfflineRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineRenderer {
    /// Renderer with the default context configuration
    pub fn new() -> Self {
        Self {
            base_config: ContextConfig::default(),
        }
    }

    /// Renderer with an explicit base configuration
    pub fn with_config(base_config: ContextConfig) -> Self {
        Self { base_config }
    }

    /// Render a request to a buffer
    ///
    /// `on_progress` is invoked at coarse per-track checkpoints with a
    /// fraction in 0..1; it carries no correctness obligation.
    pub fn render<F: FnMut(f32)>(
        &self,
        request: &RenderRequest,
        mut on_progress: F,
    ) -> Result<AudioBuffer> {
        // Unavailable buffers are skipped up front; only an empty selection
        // after filtering is an error.
        let included: Vec<&TrackConfig> = request
            .tracks
            .iter()
            .filter(|config| {
                config
                    .buffer
                    .as_ref()
                    .map(|buffer| !buffer.is_empty())
                    .unwrap_or(false)
            })
            .collect();
        if included.is_empty() {
            return Err(EngineError::NoTracksSelected);
        }

        let max_end_secs = included
            .iter()
            .map(|config| {
                config.offset_secs
                    + config.buffer.as_ref().map(AudioBuffer::duration).unwrap_or(0.0)
            })
            .fold(0.0, f64::max);
        let total_frames = (max_end_secs * request.sample_rate as f64).round() as usize;

        let config = ContextConfig {
            sample_rate: request.sample_rate,
            num_channels: request.num_channels,
            ..self.base_config.clone()
        };
        let context = ExecutionContext::offline(config, total_frames)?;
        let executor = OfflineExecutor::new(context);

        debug!(
            tracks = included.len(),
            total_frames,
            apply_effects = request.apply_effects,
            "offline render started"
        );

        let mut bus = vec![0.0f32; total_frames * request.num_channels];
        on_progress(0.0);
        for (index, track) in included.iter().enumerate() {
            let buffer = track.buffer.as_ref().unwrap();
            let settings = ChainSettings::new(
                &track.eq,
                track.volume,
                track.sends.reverb_mix,
                track.sends.delay_mix,
                !request.apply_effects,
            );
            executor.render_track(buffer, track.offset_secs, &settings, total_frames, &mut bus);
            on_progress((index + 1) as f32 / included.len() as f32);
        }

        info!(total_frames, "offline render finished");
        AudioBuffer::from_interleaved(bus, request.num_channels, request.sample_rate)
    }

    /// Render a request and encode it to in-memory WAV bytes
    pub fn render_to_wav_bytes<F: FnMut(f32)>(
        &self,
        request: &RenderRequest,
        on_progress: F,
    ) -> Result<Vec<u8>> {
        let buffer = self.render(request, on_progress)?;
        io::encode_wav(&buffer)
    }

    /// Render a request to a WAV file
    ///
    /// The render completes in memory before any bytes touch disk; a failed
    /// render leaves no partial file behind.
    pub fn render_to_wav<F: FnMut(f32)>(
        &self,
        request: &RenderRequest,
        path: &Path,
        on_progress: F,
    ) -> Result<()> {
        let buffer = self.render(request, on_progress)?;
        io::write_wav(&buffer, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::eq::ThreeBandEq;

    fn short_renderer() -> OfflineRenderer {
        OfflineRenderer::with_config(ContextConfig {
            ir_duration_secs: 0.05,
            ..ContextConfig::default()
        })
    }

    fn track_config(buffer: Option<AudioBuffer>, volume: f32) -> TrackConfig {
        TrackConfig {
            track_id: TrackId::new(),
            buffer,
            volume,
            eq: EqSettings::ThreeBand(ThreeBandEq::default()),
            sends: SendLevels::default(),
            offset_secs: 0.0,
        }
    }

    fn ramp(frames: usize, rate: u32) -> AudioBuffer {
        let samples: Vec<f32> = (0..frames)
            .map(|i| (i as f32 / frames as f32) * 0.8 - 0.4)
            .collect();
        AudioBuffer::from_interleaved(samples, 1, rate).unwrap()
    }

    #[test]
    fn test_empty_selection_is_error() {
        let request = RenderRequest {
            tracks: vec![],
            sample_rate: 8000,
            num_channels: 1,
            apply_effects: true,
        };
        let err = short_renderer().render(&request, |_| {}).unwrap_err();
        assert_eq!(err.error_code(), "NO_TRACKS_SELECTED");
    }

    #[test]
    fn test_unavailable_tracks_skipped_until_empty() {
        let request = RenderRequest {
            tracks: vec![track_config(None, 1.0), track_config(None, 1.0)],
            sample_rate: 8000,
            num_channels: 1,
            apply_effects: true,
        };
        let err = short_renderer().render(&request, |_| {}).unwrap_err();
        assert_eq!(err.error_code(), "NO_TRACKS_SELECTED");
    }

    #[test]
    fn test_unavailable_track_not_fatal() {
        let request = RenderRequest {
            tracks: vec![
                track_config(None, 1.0),
                track_config(Some(ramp(800, 8000)), 1.0),
            ],
            sample_rate: 8000,
            num_channels: 1,
            apply_effects: true,
        };
        let out = short_renderer().render(&request, |_| {}).unwrap();
        assert_eq!(out.num_frames(), 800);
    }

    #[test]
    fn test_dry_render_bit_identical_to_source() {
        let source = ramp(1000, 8000);
        let request = RenderRequest {
            tracks: vec![track_config(Some(source.clone()), 1.0)],
            sample_rate: 8000,
            num_channels: 1,
            apply_effects: false,
        };
        let rendered = short_renderer().render_to_wav_bytes(&request, |_| {}).unwrap();
        let direct = io::encode_wav(&source).unwrap();
        assert_eq!(rendered, direct);
    }

    #[test]
    fn test_render_deterministic() {
        let mut config = track_config(Some(ramp(1000, 8000)), 0.8);
        config.sends.reverb_mix = 0.3;
        config.sends.delay_mix = 0.2;
        let request = RenderRequest {
            tracks: vec![config],
            sample_rate: 8000,
            num_channels: 1,
            apply_effects: true,
        };
        let renderer = short_renderer();
        let a = renderer.render_to_wav_bytes(&request, |_| {}).unwrap();
        let b = renderer.render_to_wav_bytes(&request, |_| {}).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_progress_monotonic_and_complete() {
        let request = RenderRequest {
            tracks: vec![
                track_config(Some(ramp(400, 8000)), 1.0),
                track_config(Some(ramp(400, 8000)), 0.5),
            ],
            sample_rate: 8000,
            num_channels: 1,
            apply_effects: true,
        };
        let mut fractions = Vec::new();
        short_renderer()
            .render(&request, |fraction| fractions.push(fraction))
            .unwrap();
        assert_eq!(fractions.first(), Some(&0.0));
        assert_eq!(fractions.last(), Some(&1.0));
        assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_context_cap_surfaces_failure() {
        let renderer = OfflineRenderer::with_config(ContextConfig {
            ir_duration_secs: 0.05,
            max_render_frames: 100,
            ..ContextConfig::default()
        });
        let request = RenderRequest {
            tracks: vec![track_config(Some(ramp(800, 8000)), 1.0)],
            sample_rate: 8000,
            num_channels: 1,
            apply_effects: true,
        };
        let err = renderer.render(&request, |_| {}).unwrap_err();
        assert_eq!(err.error_code(), "CONTEXT_FAILURE");
    }

    #[test]
    fn test_volume_applied_when_dry() {
        let source = AudioBuffer::from_interleaved(vec![0.5; 400], 1, 8000).unwrap();
        let request = RenderRequest {
            tracks: vec![track_config(Some(source), 0.5)],
            sample_rate: 8000,
            num_channels: 1,
            apply_effects: false,
        };
        let out = short_renderer().render(&request, |_| {}).unwrap();
        assert!((out.samples()[200] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_offset_extends_duration() {
        let mut config = track_config(Some(ramp(800, 8000)), 1.0);
        config.offset_secs = 0.1;
        let request = RenderRequest {
            tracks: vec![config],
            sample_rate: 8000,
            num_channels: 1,
            apply_effects: true,
        };
        let out = short_renderer().render(&request, |_| {}).unwrap();
        // 0.1 s offset + 0.1 s material at 8 kHz
        assert_eq!(out.num_frames(), 1600);
    }
}
