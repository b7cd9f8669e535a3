//! Signal-chain builder and executors
//!
//! The chain description (`ChainSettings`) is pure data with no executor
//! handles. Two interchangeable executors map it onto nodes: the live
//! executor keeps persistent stateful nodes and patches parameters in place,
//! and the offline executor builds a fresh graph per render. Keeping the
//! description executor-free is what keeps the monitored mix and the exported
//! mix provably in sync.
//!
//! Topology per track, in signal order: source -> EQ cascade -> main gain ->
//! fan-out into the dry path, the shared-convolution reverb send, and the
//! feedback delay send, all three summing into the bus.

use std::collections::HashMap;

use tracing::debug;

use crate::dsp::eq::{Band, EqSettings};
use crate::dsp::{Biquad, BiquadCoeffs, ConvolutionReverb, FeedbackDelay, LevelMeter, MeterReading};
use crate::engine::buffer::AudioBuffer;
use crate::engine::context::ExecutionContext;
use crate::session::TrackId;

/// Connections each track chain makes into the bus: dry, reverb send,
/// delay send
pub const BUS_CONNECTIONS_PER_TRACK: usize = 3;

/// Frozen, executor-free description of one track's chain parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSettings {
    /// EQ stages expanded from the track's active model, in cascade order
    pub eq_stages: Vec<Band>,
    /// Effective gain after mute/solo resolution
    pub gain: f32,
    /// Reverb send level into the bus (0..1)
    pub reverb_mix: f32,
    /// Delay send level into the bus (0..1)
    pub delay_mix: f32,
    /// Pass-through mode: EQ and sends forced flat, gain still applied.
    /// Used by the A/B bypass and by dry stem export; stored track settings
    /// are never mutated.
    pub bypass: bool,
}

impl ChainSettings {
    /// Build a description from a track's stored settings
    pub fn new(eq: &EqSettings, gain: f32, reverb_mix: f32, delay_mix: f32, bypass: bool) -> Self {
        Self {
            eq_stages: eq.stages(),
            gain: gain.clamp(0.0, 1.0),
            reverb_mix: reverb_mix.clamp(0.0, 1.0),
            delay_mix: delay_mix.clamp(0.0, 1.0),
            bypass,
        }
    }

    /// Send level into the reverb path, honoring bypass
    fn effective_reverb_mix(&self) -> f32 {
        if self.bypass {
            0.0
        } else {
            self.reverb_mix
        }
    }

    /// Send level into the delay path, honoring bypass
    fn effective_delay_mix(&self) -> f32 {
        if self.bypass {
            0.0
        } else {
            self.delay_mix
        }
    }
}

/// The stateful node set for one track, owned exclusively by one executor
#[derive(Debug, Clone)]
pub struct TrackChain {
    /// Source material, already adapted to the context's rate and layout
    source: AudioBuffer,
    /// Track start position on the session timeline, in context frames
    offset_frames: usize,
    eq: Vec<Biquad>,
    gain: f32,
    reverb: ConvolutionReverb,
    reverb_mix: f32,
    delay: FeedbackDelay,
    delay_mix: f32,
}

impl TrackChain {
    /// Build the node set against a context
    pub fn new(
        context: &ExecutionContext,
        source: &AudioBuffer,
        offset_secs: f64,
        settings: &ChainSettings,
    ) -> Self {
        let sample_rate = context.sample_rate();
        let num_channels = context.num_channels();
        let mut chain = Self {
            source: source.adapted(sample_rate, num_channels),
            offset_frames: (offset_secs.max(0.0) * sample_rate as f64).round() as usize,
            eq: Vec::new(),
            gain: 0.0,
            reverb: ConvolutionReverb::new(context.impulse_response(), num_channels),
            reverb_mix: 0.0,
            delay: FeedbackDelay::new(sample_rate, num_channels),
            delay_mix: 0.0,
        };
        chain.apply_settings(context, settings);
        chain
    }

    /// Patch parameters in place; the topology and node state survive
    ///
    /// Switching between the 3-band and 5-band EQ models changes the stage
    /// count, which resizes the cascade; individual parameter edits only
    /// rewrite coefficients, so live tweaks do not click.
    pub fn apply_settings(&mut self, context: &ExecutionContext, settings: &ChainSettings) {
        let sample_rate = context.sample_rate() as f64;
        let num_channels = context.num_channels();

        if self.eq.len() != settings.eq_stages.len() {
            self.eq = settings
                .eq_stages
                .iter()
                .map(|_| Biquad::new(BiquadCoeffs::identity(), num_channels))
                .collect();
        }
        for (stage, band) in self.eq.iter_mut().zip(&settings.eq_stages) {
            stage.set_coeffs(BiquadCoeffs::calculate(
                band.band_type,
                sample_rate,
                band.frequency_hz as f64,
                band.gain_db as f64,
                band.q as f64,
            ));
            stage.enabled = band.enabled && !settings.bypass;
        }

        self.gain = settings.gain;
        self.reverb_mix = settings.effective_reverb_mix();
        self.delay_mix = settings.effective_delay_mix();
    }

    /// Process one block starting at `start_frame` on the session timeline,
    /// summing into `bus` (interleaved, context channel layout)
    ///
    /// Returns the post-gain dry signal of the block for metering.
    pub fn process_block(&mut self, start_frame: usize, num_frames: usize, bus: &mut [f32]) -> Vec<f32> {
        let num_channels = self.source.num_channels();
        let mut post_gain = vec![0.0f32; num_frames * num_channels];
        let mut frame = vec![0.0f32; num_channels];
        let mut wet = vec![0.0f32; num_channels];

        for i in 0..num_frames {
            let timeline_frame = start_frame + i;

            // Source node: one-shot, bound to the track buffer
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = if timeline_frame >= self.offset_frames {
                    self.source
                        .get(timeline_frame - self.offset_frames, ch)
                        .unwrap_or(0.0)
                } else {
                    0.0
                };
            }

            // EQ cascade
            for stage in &mut self.eq {
                stage.process_frame(&mut frame);
            }

            // Main gain
            for sample in frame.iter_mut() {
                *sample *= self.gain;
            }
            post_gain[i * num_channels..(i + 1) * num_channels].copy_from_slice(&frame);

            // Dry path into the bus
            for (ch, &sample) in frame.iter().enumerate() {
                bus[i * num_channels + ch] += sample;
            }

            // Reverb send: shared convolution, then the per-track mix gain.
            // The send nodes keep running even at zero mix so their tails
            // stay consistent when the mix is raised mid-playback.
            self.reverb.process_frame(&frame, &mut wet);
            for (ch, &sample) in wet.iter().enumerate() {
                bus[i * num_channels + ch] += sample * self.reverb_mix;
            }

            // Delay send: fixed feedback line, then the per-track mix gain
            self.delay.process_frame(&frame, &mut wet);
            for (ch, &sample) in wet.iter().enumerate() {
                bus[i * num_channels + ch] += sample * self.delay_mix;
            }
        }
        post_gain
    }
}

/// Live executor: persistent chains, parameters patched in place
///
/// `build_chain` is idempotent per `(track_id, context)`: rebuilding an
/// existing chain rebinds its source without ever duplicating the signal
/// path into the bus. Parameter-only edits go through `patch_chain`, which
/// keeps node state (filter history, send tails) intact.
#[derive(Debug)]
pub struct LiveExecutor {
    context: ExecutionContext,
    chains: HashMap<TrackId, TrackChain>,
    meters: HashMap<TrackId, LevelMeter>,
}

impl LiveExecutor {
    /// Create an executor over a live context
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            chains: HashMap::new(),
            meters: HashMap::new(),
        }
    }

    /// The executor's context
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Build the chain for a track, or rebind an existing one to `source`
    ///
    /// The source node is one-shot, so a new buffer means a new chain; the
    /// old node set is dropped and the bus keeps exactly three connections
    /// for the track. Meters survive the rebind.
    pub fn build_chain(
        &mut self,
        track_id: TrackId,
        source: &AudioBuffer,
        offset_secs: f64,
        settings: &ChainSettings,
    ) {
        debug!(?track_id, stages = settings.eq_stages.len(), "binding live chain");
        self.chains.insert(
            track_id,
            TrackChain::new(&self.context, source, offset_secs, settings),
        );
        self.meters.entry(track_id).or_default();
    }

    /// Patch an existing chain's parameters; missing chains are ignored
    pub fn patch_chain(&mut self, track_id: TrackId, settings: &ChainSettings) {
        if let Some(chain) = self.chains.get_mut(&track_id) {
            chain.apply_settings(&self.context, settings);
        }
    }

    /// Tear down the chain for an unloaded track
    pub fn remove_chain(&mut self, track_id: TrackId) {
        self.chains.remove(&track_id);
    }

    /// Whether a chain exists for a track
    pub fn has_chain(&self, track_id: TrackId) -> bool {
        self.chains.contains_key(&track_id)
    }

    /// Total connections into the master bus
    pub fn bus_connection_count(&self) -> usize {
        self.chains.len() * BUS_CONNECTIONS_PER_TRACK
    }

    /// Process one monitor block, returning the summed bus
    ///
    /// Master volume is applied by the session, not here; the bus is the raw
    /// sum of every track's three connections. Meters observe each track's
    /// post-gain signal.
    pub fn process_block(&mut self, start_frame: usize, num_frames: usize) -> Vec<f32> {
        let num_channels = self.context.num_channels();
        let mut bus = vec![0.0f32; num_frames * num_channels];
        for (track_id, chain) in self.chains.iter_mut() {
            let post_gain = chain.process_block(start_frame, num_frames, &mut bus);
            if let Some(meter) = self.meters.get_mut(track_id) {
                meter.update(&post_gain);
            }
        }
        bus
    }

    /// Decay every meter one tick; used while the transport is idle
    pub fn decay_meters(&mut self) {
        for meter in self.meters.values_mut() {
            meter.decay();
        }
    }

    /// Read a track's meter; tracks without a signal path decay to zero
    pub fn meter_reading(&mut self, track_id: TrackId) -> MeterReading {
        match self.meters.get_mut(&track_id) {
            Some(meter) => {
                if !self.chains.contains_key(&track_id) {
                    meter.decay();
                }
                meter.read()
            }
            None => MeterReading::default(),
        }
    }
}

/// Offline executor: a fresh graph per render against an isolated context
#[derive(Debug)]
pub struct OfflineExecutor {
    context: ExecutionContext,
}

impl OfflineExecutor {
    /// Create an executor over an offline context
    pub fn new(context: ExecutionContext) -> Self {
        Self { context }
    }

    /// The executor's context
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Render one track's chain across `total_frames`, summing into `bus`
    pub fn render_track(
        &self,
        source: &AudioBuffer,
        offset_secs: f64,
        settings: &ChainSettings,
        total_frames: usize,
        bus: &mut [f32],
    ) {
        let mut chain = TrackChain::new(&self.context, source, offset_secs, settings);
        chain.process_block(0, total_frames, bus);
    }
}
