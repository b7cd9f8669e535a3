//! Biquad filter primitives for the EQ cascade
//!
//! Coefficients follow the Audio EQ Cookbook formulas.
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html

use std::f64::consts::PI;

use crate::dsp::eq::BandType;

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Unity-gain pass-through coefficients
    pub fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Calculate coefficients for one EQ band
    pub fn calculate(band_type: BandType, sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        // Clamp frequency below Nyquist
        let freq = frequency.clamp(20.0, sample_rate / 2.0 - 1.0);
        let q = q.clamp(0.1, 10.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);
        let a = (10.0_f64).powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match band_type {
            BandType::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            BandType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            BandType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Per-channel biquad filter state (Direct Form I)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output =
            c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// A multichannel biquad filter stage
///
/// Coefficients are patched in place on parameter changes; filter history is
/// kept so live updates do not click.
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
    /// Disabled stages pass audio through untouched
    pub enabled: bool,
}

impl Biquad {
    /// Create a stage for the given channel count
    pub fn new(coeffs: BiquadCoeffs, num_channels: usize) -> Self {
        Self {
            coeffs,
            states: vec![BiquadState::default(); num_channels],
            enabled: true,
        }
    }

    /// Replace the coefficients without resetting filter history
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    /// Current coefficients
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = BiquadState::default();
        }
    }

    /// Filter one interleaved frame in place
    #[inline]
    pub fn process_frame(&mut self, frame: &mut [f32]) {
        if !self.enabled {
            return;
        }
        for (ch, sample) in frame.iter_mut().enumerate() {
            *sample = self.states[ch].process(*sample as f64, &self.coeffs) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passthrough() {
        let mut biquad = Biquad::new(BiquadCoeffs::identity(), 1);
        let mut frame = [0.25f32];
        biquad.process_frame(&mut frame);
        assert!((frame[0] - 0.25).abs() < 1e-7);
    }

    #[test]
    fn test_zero_gain_peaking_is_identity() {
        let coeffs = BiquadCoeffs::calculate(BandType::Peaking, 44100.0, 1000.0, 0.0, 1.0);
        let mut biquad = Biquad::new(coeffs, 1);
        let mut frame = [0.5f32];
        biquad.process_frame(&mut frame);
        assert!((frame[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_peaking_boost_raises_level() {
        // +6 dB at 1 kHz should raise the RMS of a 1 kHz sine
        let coeffs = BiquadCoeffs::calculate(BandType::Peaking, 44100.0, 1000.0, 6.0, 1.0);
        let mut biquad = Biquad::new(coeffs, 1);
        let mut energy_in = 0.0f64;
        let mut energy_out = 0.0f64;
        for i in 0..4410 {
            let t = i as f64 / 44100.0;
            let input = (2.0 * std::f64::consts::PI * 1000.0 * t).sin() as f32;
            let mut frame = [input];
            biquad.process_frame(&mut frame);
            energy_in += (input as f64).powi(2);
            energy_out += (frame[0] as f64).powi(2);
        }
        assert!(energy_out > energy_in * 2.0);
    }

    #[test]
    fn test_disabled_stage_passes_through() {
        let coeffs = BiquadCoeffs::calculate(BandType::LowShelf, 44100.0, 320.0, -10.0, 0.707);
        let mut biquad = Biquad::new(coeffs, 2);
        biquad.enabled = false;
        let mut frame = [0.3f32, -0.3];
        biquad.process_frame(&mut frame);
        assert_eq!(frame, [0.3, -0.3]);
    }
}
