//! Convolution reverb send
//!
//! Convolves the send signal with the context's shared impulse response. The
//! IR is read-only and shared between every track chain in a context; each
//! chain owns its own input history.
//!
//! Direct form: per-sample cost grows linearly with the IR length, so a
//! 1.5 s IR at 44.1 kHz costs ~66k multiplies per sample per channel.
//! Offline rendering and short IRs absorb that; driving the live monitor
//! path with long IRs needs a partitioned FFT convolution here instead.

use std::sync::Arc;

/// Direct-form convolution against a shared mono impulse response
#[derive(Debug, Clone)]
pub struct ConvolutionReverb {
    impulse_response: Arc<Vec<f32>>,
    /// Circular input history, one ring per channel
    history: Vec<Vec<f32>>,
    write_pos: usize,
}

impl ConvolutionReverb {
    /// Create a reverb for the given channel count
    pub fn new(impulse_response: Arc<Vec<f32>>, num_channels: usize) -> Self {
        let len = impulse_response.len().max(1);
        Self {
            impulse_response,
            history: vec![vec![0.0; len]; num_channels],
            write_pos: 0,
        }
    }

    /// Clear the input history
    pub fn reset(&mut self) {
        for ring in &mut self.history {
            ring.iter_mut().for_each(|s| *s = 0.0);
        }
        self.write_pos = 0;
    }

    /// Convolve one interleaved frame, writing the wet signal to `out`
    pub fn process_frame(&mut self, frame: &[f32], out: &mut [f32]) {
        let ir = self.impulse_response.as_slice();
        let len = self.history[0].len();
        for (ch, (&input, wet)) in frame.iter().zip(out.iter_mut()).enumerate() {
            let ring = &mut self.history[ch];
            ring[self.write_pos] = input;
            let mut acc = 0.0f32;
            // ir[k] pairs with the input written k frames ago
            for (k, &tap) in ir.iter().enumerate() {
                let idx = (self.write_pos + len - k) % len;
                acc += tap * ring[idx];
            }
            *wet = acc;
        }
        self.write_pos = (self.write_pos + 1) % len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_reproduces_ir() {
        let ir = Arc::new(vec![0.5, 0.25, 0.125]);
        let mut reverb = ConvolutionReverb::new(ir, 1);
        let mut outputs = Vec::new();
        for i in 0..4 {
            let input = if i == 0 { 1.0 } else { 0.0 };
            let mut out = [0.0f32];
            reverb.process_frame(&[input], &mut out);
            outputs.push(out[0]);
        }
        assert_eq!(outputs, vec![0.5, 0.25, 0.125, 0.0]);
    }

    #[test]
    fn test_silence_in_silence_out() {
        let ir = Arc::new(vec![0.5; 64]);
        let mut reverb = ConvolutionReverb::new(ir, 2);
        let mut out = [0.0f32; 2];
        for _ in 0..128 {
            reverb.process_frame(&[0.0, 0.0], &mut out);
            assert_eq!(out, [0.0, 0.0]);
        }
    }

    #[test]
    fn test_reset_clears_tail() {
        let ir = Arc::new(vec![1.0, 1.0, 1.0]);
        let mut reverb = ConvolutionReverb::new(ir, 1);
        let mut out = [0.0f32];
        reverb.process_frame(&[1.0], &mut out);
        reverb.reset();
        reverb.process_frame(&[0.0], &mut out);
        assert_eq!(out[0], 0.0);
    }
}
