//! Execution contexts
//!
//! One live context is created per session and exclusively owned by it; every
//! offline render builds its own isolated context. Both carry the shared
//! reverb impulse response, generated once per context and read-only
//! thereafter, so concurrent track chains may reference it simultaneously.

use std::sync::Arc;

use rand::Rng;
use rand_pcg::Pcg32;
use tracing::debug;

use crate::error::{EngineError, Result};

/// Fixed seed for impulse-response noise; identical contexts must render
/// byte-identical output.
const IR_SEED: u64 = 0x5EED_0A01;

/// Configuration shared by live and offline contexts
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Processing sample rate in Hz
    pub sample_rate: u32,
    /// Output channel count (1 = mono, 2 = stereo)
    pub num_channels: usize,
    /// Reverb impulse response length in seconds
    pub ir_duration_secs: f64,
    /// Hard cap on offline render length, in frames. Exceeding it maps to
    /// `ContextFailure` rather than attempting an allocation that would
    /// exhaust the host.
    pub max_render_frames: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            num_channels: 2,
            ir_duration_secs: 1.5,
            // Two hours at 44.1 kHz, matching the longest importable stem
            max_render_frames: 44_100 * 2 * 60 * 60,
        }
    }
}

/// An execution context: sample rate, channel layout, and the shared
/// impulse response
///
/// Pure data plus the IR; the live executor and the offline renderer each map
/// the same chain descriptions onto a context of their own.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    config: ContextConfig,
    impulse_response: Arc<Vec<f32>>,
}

impl ExecutionContext {
    /// Create a context, generating the shared impulse response once
    pub fn new(config: ContextConfig) -> Result<Self> {
        if config.sample_rate == 0 || config.num_channels == 0 {
            return Err(EngineError::ContextFailure {
                reason: format!(
                    "invalid context shape: {} Hz, {} channels",
                    config.sample_rate, config.num_channels
                ),
            });
        }
        let impulse_response = Arc::new(generate_impulse_response(
            config.sample_rate,
            config.ir_duration_secs,
        ));
        debug!(
            sample_rate = config.sample_rate,
            ir_len = impulse_response.len(),
            "execution context created"
        );
        Ok(Self {
            config,
            impulse_response,
        })
    }

    /// Create an isolated offline context sized to `total_frames`
    ///
    /// Fails with `ContextFailure` when the requested length exceeds the
    /// configured cap; the caller surfaces this and does not retry.
    pub fn offline(config: ContextConfig, total_frames: usize) -> Result<Self> {
        if total_frames > config.max_render_frames {
            return Err(EngineError::ContextFailure {
                reason: format!(
                    "render length {} frames exceeds limit of {}",
                    total_frames, config.max_render_frames
                ),
            });
        }
        Self::new(config)
    }

    /// Processing sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Output channel count
    pub fn num_channels(&self) -> usize {
        self.config.num_channels
    }

    /// Context configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Shared reverb impulse response (mono, read-only)
    pub fn impulse_response(&self) -> Arc<Vec<f32>> {
        Arc::clone(&self.impulse_response)
    }
}

/// Generate the shared reverb impulse response: exponentially decaying noise
///
/// The noise source is a fixed-seed PCG so two contexts with the same
/// configuration produce the same IR, keeping offline renders deterministic.
fn generate_impulse_response(sample_rate: u32, duration_secs: f64) -> Vec<f32> {
    let len = ((sample_rate as f64 * duration_secs) as usize).max(1);
    let mut rng = Pcg32::new(IR_SEED, 0xa02b_dbf7_bb3c_0a7);
    let decay_rate = 6.0 / duration_secs.max(1e-3);

    let mut ir: Vec<f32> = (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let envelope = (-decay_rate * t).exp() as f32;
            rng.gen_range(-1.0f32..1.0) * envelope
        })
        .collect();

    // Normalize to unit energy so the wet level tracks the send gain
    let energy: f32 = ir.iter().map(|s| s * s).sum();
    if energy > 0.0 {
        let scale = 1.0 / energy.sqrt();
        for s in &mut ir {
            *s *= scale;
        }
    }
    ir
}

/// Live engine run state
///
/// Browsers gate audio output behind a user gesture; the engine starts
/// suspended and resumes on the first interaction. A rejected resume is
/// retried transparently on the next one, never surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Suspended,
    Running,
    Disposed,
}

/// The live audio engine: one per session, explicitly disposed on session end
#[derive(Debug)]
pub struct AudioEngine {
    context: ExecutionContext,
    state: EngineState,
}

impl AudioEngine {
    /// Create the engine and its live context
    pub fn new(config: ContextConfig) -> Result<Self> {
        Ok(Self {
            context: ExecutionContext::new(config)?,
            state: EngineState::Suspended,
        })
    }

    /// The live execution context
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Current run state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Resume the engine, gated on a user gesture
    ///
    /// Returns `ResumeFailure` when called outside a gesture while still
    /// suspended; callers retry on the next interaction.
    pub fn ensure_running(&mut self, user_gesture: bool) -> Result<()> {
        match self.state {
            EngineState::Running => Ok(()),
            EngineState::Disposed => Err(EngineError::ContextFailure {
                reason: "engine already disposed".to_string(),
            }),
            EngineState::Suspended => {
                if user_gesture {
                    self.state = EngineState::Running;
                    debug!("audio engine resumed");
                    Ok(())
                } else {
                    Err(EngineError::ResumeFailure)
                }
            }
        }
    }

    /// Tear the engine down; further use fails with `ContextFailure`
    pub fn dispose(&mut self) {
        self.state = EngineState::Disposed;
        debug!("audio engine disposed");
    }
}
