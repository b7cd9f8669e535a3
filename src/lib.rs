//! Stemmix - Multitrack Stem Mixing Engine
//!
//! Stemmix assembles independently generated stems (instrumental, lead vocal,
//! harmony, user recordings) into a live mixable signal graph and re-renders
//! the identical topology offline to exportable WAV files.
//!
//! # Architecture
//!
//! The engine is built from a few layers:
//! - `engine`: buffers, PCM decode, WAV I/O, execution contexts, transport
//! - `dsp`: biquad EQ, convolution reverb, feedback delay, level metering
//! - `automation`: time-varying parameter curves
//! - `graph`: the per-track signal-chain description and its executors
//! - `session`: track ownership, mute/solo resolution, the live mix bus
//! - `render`: deterministic offline rendering to PCM16 WAV
//!
//! The signal-chain description is pure data; a live executor patches
//! persistent nodes in place while the offline renderer rebuilds the same
//! topology against an isolated non-real-time context, so the monitored mix
//! and the exported mix stay provably in sync.

pub mod automation;
pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod generate;
pub mod graph;
pub mod preset;
pub mod render;
pub mod session;

pub use error::{EngineError, Result};
