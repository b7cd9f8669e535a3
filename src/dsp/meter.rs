//! Per-track level metering
//!
//! Non-authoritative visual feedback: each monitored track gets one scalar
//! per poll representing short-window energy. A track with no signal path
//! decays to zero rather than erroring, and metering never blocks transport.

/// Smoothing factor applied to the RMS estimate per block
const RMS_SMOOTHING: f32 = 0.6;

/// Peak falloff multiplier per decay tick
const PEAK_DECAY: f32 = 0.85;

/// A meter reading for one track
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterReading {
    /// Instantaneous peak, decayed between blocks (0..1)
    pub peak: f32,
    /// Smoothed RMS energy (0..1)
    pub rms: f32,
}

/// Post-gain level meter for one track
#[derive(Debug, Clone, Default)]
pub struct LevelMeter {
    peak: f32,
    rms: f32,
}

impl LevelMeter {
    /// Create a silent meter
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one processed block of interleaved samples
    pub fn update(&mut self, block: &[f32]) {
        if block.is_empty() {
            self.decay();
            return;
        }
        let block_peak = block.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        let block_rms =
            (block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32).sqrt();

        self.peak = block_peak.max(self.peak * PEAK_DECAY);
        self.rms = self.rms * RMS_SMOOTHING + block_rms * (1.0 - RMS_SMOOTHING);
    }

    /// Decay toward zero; called when the track has no signal path
    pub fn decay(&mut self) {
        self.peak *= PEAK_DECAY;
        self.rms *= RMS_SMOOTHING;
        if self.peak < 1e-5 {
            self.peak = 0.0;
        }
        if self.rms < 1e-5 {
            self.rms = 0.0;
        }
    }

    /// Current reading
    pub fn read(&self) -> MeterReading {
        MeterReading {
            peak: self.peak,
            rms: self.rms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_tracks_signal() {
        let mut meter = LevelMeter::new();
        meter.update(&[0.5, -0.5, 0.5, -0.5]);
        let reading = meter.read();
        assert_eq!(reading.peak, 0.5);
        assert!(reading.rms > 0.0);
    }

    #[test]
    fn test_meter_decays_to_zero() {
        let mut meter = LevelMeter::new();
        meter.update(&[1.0; 64]);
        for _ in 0..200 {
            meter.decay();
        }
        assert_eq!(meter.read(), MeterReading::default());
    }

    #[test]
    fn test_peak_holds_then_falls() {
        let mut meter = LevelMeter::new();
        meter.update(&[0.9]);
        let first = meter.read().peak;
        meter.update(&[0.1]);
        let second = meter.read().peak;
        assert!(second < first);
        assert!(second > 0.1, "peak falls gradually, not instantly");
    }

    #[test]
    fn test_empty_block_decays() {
        let mut meter = LevelMeter::new();
        meter.update(&[0.8]);
        meter.update(&[]);
        assert!(meter.read().peak < 0.8);
    }
}
