//! Feedback delay send
//!
//! Fixed echo: 300 ms delay time, 0.4 feedback gain. The per-track delay mix
//! is applied outside this node, at the send gain into the bus.

/// Fixed delay time in milliseconds
pub const DELAY_TIME_MS: f32 = 300.0;

/// Fixed feedback gain
pub const FEEDBACK_GAIN: f32 = 0.4;

/// A feedback delay line with fixed timing
#[derive(Debug, Clone)]
pub struct FeedbackDelay {
    /// Circular delay buffer, one ring per channel
    buffers: Vec<Vec<f32>>,
    write_pos: usize,
}

impl FeedbackDelay {
    /// Create a delay line for the given sample rate and channel count
    pub fn new(sample_rate: u32, num_channels: usize) -> Self {
        let delay_samples = ((DELAY_TIME_MS / 1000.0 * sample_rate as f32) as usize).max(1);
        Self {
            buffers: vec![vec![0.0; delay_samples]; num_channels],
            write_pos: 0,
        }
    }

    /// Delay length in samples
    pub fn delay_samples(&self) -> usize {
        self.buffers[0].len()
    }

    /// Clear the delay buffers
    pub fn reset(&mut self) {
        for ring in &mut self.buffers {
            ring.iter_mut().for_each(|s| *s = 0.0);
        }
        self.write_pos = 0;
    }

    /// Process one interleaved frame, writing the wet signal to `out`
    ///
    /// y[n] = x[n - D]; the buffer is refilled with x[n] + feedback * y[n].
    pub fn process_frame(&mut self, frame: &[f32], out: &mut [f32]) {
        for (ch, (&input, wet)) in frame.iter().zip(out.iter_mut()).enumerate() {
            let ring = &mut self.buffers[ch];
            let delayed = ring[self.write_pos];
            ring[self.write_pos] = input + FEEDBACK_GAIN * delayed;
            *wet = delayed;
        }
        self.write_pos = (self.write_pos + 1) % self.buffers[0].len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_length() {
        let delay = FeedbackDelay::new(1000, 1);
        // 300 ms at 1 kHz
        assert_eq!(delay.delay_samples(), 300);
    }

    #[test]
    fn test_first_echo_after_delay_time() {
        let mut delay = FeedbackDelay::new(100, 1);
        let d = delay.delay_samples();
        let mut out = [0.0f32];
        for i in 0..(d * 3) {
            let input = if i == 0 { 1.0 } else { 0.0 };
            delay.process_frame(&[input], &mut out);
            if i == d {
                assert_eq!(out[0], 1.0, "first echo at one delay period");
            } else if i == 2 * d {
                assert!((out[0] - FEEDBACK_GAIN).abs() < 1e-6, "second echo attenuated");
            } else if i < d {
                assert_eq!(out[0], 0.0);
            }
        }
    }

    #[test]
    fn test_reset_silences_tail() {
        let mut delay = FeedbackDelay::new(100, 2);
        let mut out = [0.0f32; 2];
        delay.process_frame(&[1.0, 1.0], &mut out);
        delay.reset();
        for _ in 0..delay.delay_samples() * 2 {
            delay.process_frame(&[0.0, 0.0], &mut out);
            assert_eq!(out, [0.0, 0.0]);
        }
    }
}
