//! Session transport
//!
//! All tracks start and stop in a single synchronized transport action; there
//! is no per-track transport. The playhead is always clamped to
//! `[0, duration]`.

use tracing::debug;

/// Transport state and playhead for one session
#[derive(Debug, Clone)]
pub struct Transport {
    playing: bool,
    /// Playhead position in seconds
    current_time: f64,
    /// Session duration in seconds (max over tracks of offset + duration)
    duration_secs: f64,
    sample_rate: u32,
}

impl Transport {
    /// Create a stopped transport at time zero
    pub fn new(sample_rate: u32) -> Self {
        Self {
            playing: false,
            current_time: 0.0,
            duration_secs: 0.0,
            sample_rate,
        }
    }

    /// Whether the transport is running
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current playhead position in seconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Session duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Update the session duration, re-clamping the playhead
    pub fn set_duration(&mut self, duration_secs: f64) {
        self.duration_secs = duration_secs.max(0.0);
        self.current_time = self.current_time.clamp(0.0, self.duration_secs);
    }

    /// Start playback from the current position
    pub fn play(&mut self) {
        if !self.playing {
            self.playing = true;
            debug!(position = self.current_time, "transport play");
        }
    }

    /// Pause playback, keeping the position
    pub fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            debug!(position = self.current_time, "transport pause");
        }
    }

    /// Seek to a position in seconds, clamped to the session duration
    pub fn seek(&mut self, time_secs: f64) {
        self.current_time = time_secs.clamp(0.0, self.duration_secs);
    }

    /// Advance the playhead by a processed block
    ///
    /// Stops at the end of the session. Returns the playhead position, in
    /// frames, at the start of the block.
    pub fn advance(&mut self, num_frames: usize) -> usize {
        let start_frame = (self.current_time * self.sample_rate as f64).round() as usize;
        if self.playing {
            self.current_time += num_frames as f64 / self.sample_rate as f64;
            if self.current_time >= self.duration_secs {
                self.current_time = self.duration_secs;
                self.playing = false;
                debug!("transport reached end of session");
            }
        }
        start_frame
    }
}
