//! Audio buffer type shared by the live graph and the offline renderer

use crate::error::{EngineError, Result};

/// Interleaved audio buffer
///
/// Samples are stored in interleaved format: [L0, R0, L1, R1, ...]
/// This matches the PCM payloads delivered by the generation providers and
/// the WAV container used for export.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved sample data
    samples: Vec<f32>,
    /// Number of channels (1 = mono, 2 = stereo)
    num_channels: usize,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer with the given shape
    pub fn new(num_channels: usize, num_frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; num_channels * num_frames],
            num_channels,
            sample_rate,
        }
    }

    /// Create a buffer from existing interleaved samples
    pub fn from_interleaved(samples: Vec<f32>, num_channels: usize, sample_rate: u32) -> Result<Self> {
        if num_channels == 0 {
            return Err(EngineError::InvalidAudio {
                reason: "channel count must be at least 1".to_string(),
            });
        }
        if samples.len() % num_channels != 0 {
            return Err(EngineError::InvalidAudio {
                reason: format!(
                    "sample count {} is not divisible by channel count {}",
                    samples.len(),
                    num_channels
                ),
            });
        }
        Ok(Self {
            samples,
            num_channels,
            sample_rate,
        })
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.num_channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Check whether the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get a reference to all interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get a sample at the given frame and channel
    pub fn get(&self, frame: usize, channel: usize) -> Option<f32> {
        if frame < self.num_frames() && channel < self.num_channels {
            Some(self.samples[frame * self.num_channels + channel])
        } else {
            None
        }
    }

    /// Set a sample at the given frame and channel
    pub fn set(&mut self, frame: usize, channel: usize, value: f32) {
        if frame < self.num_frames() && channel < self.num_channels {
            self.samples[frame * self.num_channels + channel] = value;
        }
    }

    /// Check if buffer contains valid audio (no NaN/Inf)
    pub fn is_valid(&self) -> bool {
        self.samples.iter().all(|&s| s.is_finite() && s.abs() <= 16.0)
    }

    /// Calculate RMS level in dB for a channel
    pub fn rms_db(&self, channel: usize) -> f64 {
        if channel >= self.num_channels || self.is_empty() {
            return f64::NEG_INFINITY;
        }

        let sum_sq: f64 = self
            .samples
            .iter()
            .skip(channel)
            .step_by(self.num_channels)
            .map(|&s| (s as f64).powi(2))
            .sum();

        let rms = (sum_sq / self.num_frames() as f64).sqrt();

        if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Calculate peak level in dB for a channel
    pub fn peak_db(&self, channel: usize) -> f64 {
        if channel >= self.num_channels {
            return f64::NEG_INFINITY;
        }

        let peak: f32 = self
            .samples
            .iter()
            .skip(channel)
            .step_by(self.num_channels)
            .map(|&s| s.abs())
            .fold(0.0f32, f32::max);

        if peak > 0.0 {
            20.0 * (peak as f64).log10()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Convert the buffer to a target shape for graph playback
    ///
    /// Resamples with linear interpolation when the sample rate differs and
    /// remaps channels (mono is duplicated, stereo is averaged down).
    pub fn adapted(&self, sample_rate: u32, num_channels: usize) -> AudioBuffer {
        let remapped = self.remap_channels(num_channels);
        if remapped.sample_rate == sample_rate {
            return remapped;
        }
        remapped.resampled(sample_rate)
    }

    fn remap_channels(&self, num_channels: usize) -> AudioBuffer {
        if num_channels == self.num_channels {
            return self.clone();
        }
        let frames = self.num_frames();
        let mut out = AudioBuffer::new(num_channels, frames, self.sample_rate);
        for frame in 0..frames {
            // Average the source channels down to one value; mono sources are
            // spread across every target channel, extra target channels get
            // the downmix.
            let mixed: f32 = (0..self.num_channels)
                .map(|ch| self.samples[frame * self.num_channels + ch])
                .sum::<f32>()
                / self.num_channels as f32;
            for ch in 0..num_channels {
                let value = if ch < self.num_channels && num_channels >= self.num_channels {
                    self.samples[frame * self.num_channels + ch]
                } else if self.num_channels == 1 {
                    self.samples[frame]
                } else {
                    mixed
                };
                out.samples[frame * num_channels + ch] = value;
            }
        }
        out
    }

    /// Linear-interpolation resample to a target rate
    fn resampled(&self, target_rate: u32) -> AudioBuffer {
        let src_frames = self.num_frames();
        if src_frames == 0 {
            return AudioBuffer::new(self.num_channels, 0, target_rate);
        }
        let ratio = self.sample_rate as f64 / target_rate as f64;
        let dst_frames = (src_frames as f64 / ratio).round() as usize;
        let mut out = AudioBuffer::new(self.num_channels, dst_frames, target_rate);
        for frame in 0..dst_frames {
            let src_pos = frame as f64 * ratio;
            let i0 = src_pos.floor() as usize;
            let i1 = (i0 + 1).min(src_frames - 1);
            let frac = (src_pos - i0 as f64) as f32;
            for ch in 0..self.num_channels {
                let s0 = self.samples[i0 * self.num_channels + ch];
                let s1 = self.samples[i1 * self.num_channels + ch];
                out.samples[frame * self.num_channels + ch] = s0 + (s1 - s0) * frac;
            }
        }
        out
    }
}
