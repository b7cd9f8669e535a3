//! Session and mix bus
//!
//! The session owns the ordered set of tracks, the live audio engine, the
//! transport, and the global A/B bypass flag. Mute/solo is session-global:
//! whenever any track's mute or solo flag changes, effective gains are
//! recomputed for every track in one synchronous pass, so no intermediate
//! inconsistent state is observable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::automation::{AutomatableParam, AutomationLane};
use crate::dsp::eq::EqSettings;
use crate::engine::buffer::AudioBuffer;
use crate::engine::context::{AudioEngine, ContextConfig};
use crate::engine::decode::{decode_base64_pcm16, ProviderFormat};
use crate::engine::transport::Transport;
use crate::error::{EngineError, Result};
use crate::graph::{ChainSettings, LiveExecutor};
use crate::dsp::MeterReading;

/// Stable track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Generate a fresh id
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The part a stem plays in the mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackRole {
    Instrumental,
    LeadVocal,
    Harmony,
    UserRecording,
}

/// Per-track send levels into the shared effects
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SendLevels {
    /// Reverb send level (0..1)
    pub reverb_mix: f32,
    /// Delay send level (0..1)
    pub delay_mix: f32,
}

/// One mixable stem
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub role: TrackRole,
    /// Decoded source material; `None` until a load succeeds. A track
    /// without a source stays in the mixer but is skipped by the graph and
    /// by export.
    pub source: Option<AudioBuffer>,
    /// Fader level (0..1)
    pub volume: f32,
    pub mute: bool,
    pub solo: bool,
    pub eq: EqSettings,
    pub sends: SendLevels,
    /// Start position on the session timeline, in seconds
    pub offset_secs: f64,
}

impl Track {
    /// Create an empty track for a role
    pub fn new(role: TrackRole) -> Self {
        Self {
            id: TrackId::new(),
            role,
            source: None,
            volume: 1.0,
            mute: false,
            solo: false,
            eq: EqSettings::default(),
            sends: SendLevels::default(),
            offset_secs: 0.0,
        }
    }

    /// Whether the track can be connected into the graph
    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    /// The track's end position on the timeline, in seconds
    pub fn end_secs(&self) -> f64 {
        self.offset_secs
            + self
                .source
                .as_ref()
                .map(AudioBuffer::duration)
                .unwrap_or(0.0)
    }
}

/// Resolve every track's effective gain in one pass
///
/// Effective gain is 0 when the track is muted, or when another track is
/// soloed and this one is not; otherwise it is the track's own volume.
/// Solo is session-global, so this is computed centrally rather than by each
/// track reasoning about its siblings.
pub fn resolve_effective_gains(tracks: &[Track]) -> HashMap<TrackId, f32> {
    let any_solo = tracks.iter().any(|track| track.solo);
    tracks
        .iter()
        .map(|track| {
            let gain = if track.mute || (any_solo && !track.solo) {
                0.0
            } else {
                track.volume
            };
            (track.id, gain)
        })
        .collect()
}

/// A session: the ordered tracks, the live graph, and the transport
#[derive(Debug)]
pub struct Session {
    tracks: Vec<Track>,
    engine: AudioEngine,
    executor: LiveExecutor,
    transport: Transport,
    master_volume: f32,
    /// A/B bypass: forces every chain's EQ and sends to pass-through without
    /// touching the stored settings
    bypass_effects: bool,
}

impl Session {
    /// Create a session with its own live engine
    pub fn new(config: ContextConfig) -> Result<Self> {
        let sample_rate = config.sample_rate;
        let engine = AudioEngine::new(config)?;
        let executor = LiveExecutor::new(engine.context().clone());
        Ok(Self {
            tracks: Vec::new(),
            engine,
            executor,
            transport: Transport::new(sample_rate),
            master_volume: 1.0,
            bypass_effects: false,
        })
    }

    // ========================================================================
    // Track management
    // ========================================================================

    /// Add an empty track, returning its id
    pub fn add_track(&mut self, role: TrackRole) -> TrackId {
        let track = Track::new(role);
        let id = track.id;
        self.tracks.push(track);
        id
    }

    /// All tracks in mixer order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Look up a track
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    /// First track with the given role
    pub fn track_id_by_role(&self, role: TrackRole) -> Option<TrackId> {
        self.tracks
            .iter()
            .find(|track| track.role == role)
            .map(|track| track.id)
    }

    /// Attach decoded source material to a track and connect its chain
    ///
    /// Reloading an already-loaded track drops its live chain so the graph
    /// rebinds to the new buffer; the monitored mix and the exported mix
    /// must never read different audio for the same track.
    pub fn load_track_source(&mut self, id: TrackId, source: AudioBuffer) -> Result<()> {
        let track = self.track_mut(id)?;
        track.source = Some(source);
        self.executor.remove_chain(id);
        debug!(%id, "track source loaded");
        self.sync_graph();
        Ok(())
    }

    /// Decode a generation payload into a track
    ///
    /// A decode failure marks the track unavailable (present-but-silent in
    /// the mixer) and is reported to the caller; it never aborts other
    /// tracks.
    pub fn load_generated(
        &mut self,
        id: TrackId,
        payload: &str,
        format: ProviderFormat,
    ) -> Result<()> {
        match decode_base64_pcm16(payload, format) {
            Ok(buffer) => self.load_track_source(id, buffer),
            Err(err) => {
                warn!(%id, error = %err, "stem decode failed; track marked unavailable");
                let track = self.track_mut(id)?;
                track.source = None;
                self.executor.remove_chain(id);
                self.sync_graph();
                Err(err)
            }
        }
    }

    // ========================================================================
    // Mix parameters
    // ========================================================================

    /// Set a track's fader volume
    pub fn set_volume(&mut self, id: TrackId, volume: f32) -> Result<()> {
        self.track_mut(id)?.volume = volume.clamp(0.0, 1.0);
        self.sync_graph();
        Ok(())
    }

    /// Set a track's mute flag; effective gains are recomputed session-wide
    pub fn set_mute(&mut self, id: TrackId, mute: bool) -> Result<()> {
        self.track_mut(id)?.mute = mute;
        self.sync_graph();
        Ok(())
    }

    /// Set a track's solo flag; effective gains are recomputed session-wide
    pub fn set_solo(&mut self, id: TrackId, solo: bool) -> Result<()> {
        self.track_mut(id)?.solo = solo;
        self.sync_graph();
        Ok(())
    }

    /// Replace a track's EQ settings
    pub fn set_eq(&mut self, id: TrackId, eq: EqSettings) -> Result<()> {
        self.track_mut(id)?.eq = eq;
        self.sync_graph();
        Ok(())
    }

    /// Set a track's send levels
    pub fn set_sends(&mut self, id: TrackId, sends: SendLevels) -> Result<()> {
        let track = self.track_mut(id)?;
        track.sends = SendLevels {
            reverb_mix: sends.reverb_mix.clamp(0.0, 1.0),
            delay_mix: sends.delay_mix.clamp(0.0, 1.0),
        };
        self.sync_graph();
        Ok(())
    }

    /// Master fader level
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Set the master fader level
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    /// A/B bypass state
    pub fn bypass_effects(&self) -> bool {
        self.bypass_effects
    }

    /// Toggle the A/B bypass
    ///
    /// Stored settings are untouched; toggling back restores the prior
    /// configuration exactly.
    pub fn set_bypass_effects(&mut self, bypass: bool) {
        self.bypass_effects = bypass;
        self.sync_graph();
    }

    /// Apply an automation lane's value at a time to its target parameter
    ///
    /// Lane values are denormalized here, at consumption time. Lanes for
    /// track parameters need a track id; the master lane ignores it.
    pub fn apply_automation(
        &mut self,
        track_id: Option<TrackId>,
        lane: &AutomationLane,
        t: f64,
    ) -> Result<()> {
        if !lane.enabled {
            return Ok(());
        }
        let value = lane.denormalized_value_at(t);
        match (lane.parameter, track_id) {
            (AutomatableParam::MasterVolume, _) => {
                self.set_master_volume(value);
                Ok(())
            }
            (AutomatableParam::Volume, Some(id)) => self.set_volume(id, value),
            (AutomatableParam::ReverbSend, Some(id)) => {
                let mut sends = self.track_mut(id)?.sends;
                sends.reverb_mix = value;
                self.set_sends(id, sends)
            }
            (AutomatableParam::DelaySend, Some(id)) => {
                let mut sends = self.track_mut(id)?.sends;
                sends.delay_mix = value;
                self.set_sends(id, sends)
            }
            (param, None) => Err(EngineError::InvalidParameter {
                param: format!("{:?}", param),
                value: "no track".to_string(),
                expected: "a track id for per-track automation".to_string(),
            }),
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start synchronized playback of all tracks
    ///
    /// Called from a user gesture; resumes the engine if it is still
    /// suspended behind the autoplay gate.
    pub fn play(&mut self) -> Result<()> {
        self.engine.ensure_running(true)?;
        self.transport.play();
        Ok(())
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.transport.pause();
    }

    /// Seek to a time in seconds, clamped to the session duration
    pub fn seek(&mut self, time_secs: f64) {
        self.transport.seek(time_secs);
    }

    /// Current playhead in seconds (consumed by lyric/timing overlays)
    pub fn current_time(&self) -> f64 {
        self.transport.current_time()
    }

    /// Whether the transport is running
    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Session duration: the latest end of any loaded track
    pub fn duration_secs(&self) -> f64 {
        self.tracks
            .iter()
            .map(Track::end_secs)
            .fold(0.0, f64::max)
    }

    // ========================================================================
    // Monitoring
    // ========================================================================

    /// Process one monitor block through the live graph
    ///
    /// Advances the transport when playing and returns the master bus block
    /// with the master volume applied. While paused the graph is idle: the
    /// block is silent and meters decay.
    pub fn process_monitor_block(&mut self, num_frames: usize) -> Vec<f32> {
        let num_channels = self.executor.context().num_channels();
        if !self.transport.is_playing() {
            self.executor.decay_meters();
            return vec![0.0; num_frames * num_channels];
        }
        let start_frame = self.transport.advance(num_frames);
        let mut bus = self.executor.process_block(start_frame, num_frames);
        for sample in &mut bus {
            *sample *= self.master_volume;
        }
        bus
    }

    /// Read a track's level meter
    pub fn meter(&mut self, id: TrackId) -> MeterReading {
        self.executor.meter_reading(id)
    }

    /// Connections into the master bus (diagnostic)
    pub fn bus_connection_count(&self) -> usize {
        self.executor.bus_connection_count()
    }

    /// The live context configuration
    pub fn context_config(&self) -> &ContextConfig {
        self.engine.context().config()
    }

    /// Tear down the live engine; the session is unusable afterwards
    pub fn dispose(&mut self) {
        self.engine.dispose();
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Chain settings for one track given its resolved gain
    pub(crate) fn chain_settings_for(&self, track: &Track, effective_gain: f32) -> ChainSettings {
        ChainSettings::new(
            &track.eq,
            effective_gain,
            track.sends.reverb_mix,
            track.sends.delay_mix,
            self.bypass_effects,
        )
    }

    /// Rebuild or patch every loaded track's chain from current settings
    ///
    /// One synchronous pass: the resolved gain map and all parameter patches
    /// are applied before returning, atomically with the triggering edit.
    /// Tracks with a connected chain are patched in place; only tracks
    /// without one carry their source buffer into the executor.
    fn sync_graph(&mut self) {
        let gains = resolve_effective_gains(&self.tracks);
        let mut patches: Vec<(TrackId, ChainSettings)> = Vec::new();
        let mut builds: Vec<(TrackId, AudioBuffer, f64, ChainSettings)> = Vec::new();
        for track in &self.tracks {
            let Some(source) = track.source.as_ref() else {
                continue;
            };
            let gain = gains.get(&track.id).copied().unwrap_or(0.0);
            let settings = self.chain_settings_for(track, gain);
            if self.executor.has_chain(track.id) {
                patches.push((track.id, settings));
            } else {
                builds.push((track.id, source.clone(), track.offset_secs, settings));
            }
        }
        for (id, settings) in patches {
            self.executor.patch_chain(id, &settings);
        }
        for (id, source, offset, settings) in builds {
            self.executor.build_chain(id, &source, offset, &settings);
        }
        self.transport.set_duration(self.duration_secs());
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|track| track.id == id)
            .ok_or_else(|| EngineError::TrackNotFound { id: id.to_string() })
    }
}
