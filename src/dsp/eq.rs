//! EQ models and the frequency-response approximation
//!
//! Two independently stored EQ models exist per track: a 3-band coarse model
//! with fixed corner frequencies and a 5-band parametric model. The coarse
//! model can be derived from the parametric one through a lossy fold, never
//! the other way around, and the two are never reconciled; export always uses
//! whichever model is active.
//!
//! The response math here approximates the biquads for visualization and the
//! coarse fold only; the audible filtering is done by `dsp::biquad` with the
//! same (frequency, gain, Q, type) parameters.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Maximum number of parametric bands
pub const MAX_BANDS: usize = 5;

/// Fixed corner frequencies for the 3-band coarse model
pub const THREE_BAND_LOW_HZ: f32 = 320.0;
pub const THREE_BAND_MID_HZ: f32 = 1000.0;
pub const THREE_BAND_HIGH_HZ: f32 = 3200.0;

const THREE_BAND_GAIN_RANGE: f32 = 10.0;
const FIVE_BAND_GAIN_RANGE: f32 = 12.0;

/// Filter type for EQ bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandType {
    /// Boost/cut below the corner frequency
    LowShelf,
    /// Bell curve boost/cut
    #[default]
    Peaking,
    /// Boost/cut above the corner frequency
    HighShelf,
}

/// Single parametric EQ band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Center/corner frequency in Hz (20-20000)
    pub frequency_hz: f32,
    /// Gain in dB (-12 to +12)
    pub gain_db: f32,
    /// Q factor (0.1 to 10.0)
    pub q: f32,
    /// Filter type
    pub band_type: BandType,
    /// Whether this band contributes to the cascade
    pub enabled: bool,
}

impl Default for Band {
    fn default() -> Self {
        Self {
            frequency_hz: 1000.0,
            gain_db: 0.0,
            q: 1.0,
            band_type: BandType::Peaking,
            enabled: true,
        }
    }
}

impl Band {
    /// Create a band, clamping all parameters into range
    pub fn new(frequency_hz: f32, gain_db: f32, q: f32, band_type: BandType) -> Self {
        let mut band = Self {
            frequency_hz,
            gain_db,
            q,
            band_type,
            enabled: true,
        };
        band.clamp();
        band
    }

    /// Clamp frequency, gain, and Q into their valid ranges
    pub fn clamp(&mut self) {
        self.frequency_hz = self.frequency_hz.clamp(20.0, 20_000.0);
        self.gain_db = self.gain_db.clamp(-FIVE_BAND_GAIN_RANGE, FIVE_BAND_GAIN_RANGE);
        self.q = self.q.clamp(0.1, 10.0);
    }
}

/// Stable identifier for a parametric band
///
/// Band identity survives edits and insertions so UI selection never desyncs
/// from the band list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BandId(u64);

/// Arena of parametric bands, insertion-ordered
///
/// Bands are never re-sorted; the cascade processes them in the order they
/// were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandSet {
    bands: Vec<(BandId, Band)>,
    next_id: u64,
}

impl BandSet {
    /// Create an empty band set
    pub fn new() -> Self {
        Self::default()
    }

    /// The default 5-band layout: low shelf, three peaks, high shelf
    pub fn default_five_band() -> Self {
        let mut set = Self::new();
        set.add(Band::new(100.0, 0.0, 0.707, BandType::LowShelf)).ok();
        set.add(Band::new(400.0, 0.0, 1.0, BandType::Peaking)).ok();
        set.add(Band::new(1200.0, 0.0, 1.0, BandType::Peaking)).ok();
        set.add(Band::new(3500.0, 0.0, 1.0, BandType::Peaking)).ok();
        set.add(Band::new(10_000.0, 0.0, 0.707, BandType::HighShelf)).ok();
        set
    }

    /// Add a band, returning its stable id
    pub fn add(&mut self, mut band: Band) -> Result<BandId> {
        if self.bands.len() >= MAX_BANDS {
            return Err(EngineError::InvalidParameter {
                param: "bands".to_string(),
                value: (self.bands.len() + 1).to_string(),
                expected: format!("at most {} bands", MAX_BANDS),
            });
        }
        band.clamp();
        let id = BandId(self.next_id);
        self.next_id += 1;
        self.bands.push((id, band));
        Ok(id)
    }

    /// Remove a band by id
    pub fn remove(&mut self, id: BandId) -> Result<Band> {
        let index = self
            .bands
            .iter()
            .position(|(band_id, _)| *band_id == id)
            .ok_or_else(|| EngineError::InvalidParameter {
                param: "band_id".to_string(),
                value: format!("{:?}", id),
                expected: "an existing band".to_string(),
            })?;
        Ok(self.bands.remove(index).1)
    }

    /// Get a band by id
    pub fn get(&self, id: BandId) -> Option<&Band> {
        self.bands
            .iter()
            .find(|(band_id, _)| *band_id == id)
            .map(|(_, band)| band)
    }

    /// Apply an edit to a band, re-clamping its parameters afterwards
    pub fn update<F: FnOnce(&mut Band)>(&mut self, id: BandId, edit: F) -> Result<()> {
        let band = self
            .bands
            .iter_mut()
            .find(|(band_id, _)| *band_id == id)
            .map(|(_, band)| band)
            .ok_or_else(|| EngineError::InvalidParameter {
                param: "band_id".to_string(),
                value: format!("{:?}", id),
                expected: "an existing band".to_string(),
            })?;
        edit(band);
        band.clamp();
        Ok(())
    }

    /// Iterate bands in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (BandId, &Band)> {
        self.bands.iter().map(|(id, band)| (*id, band))
    }

    /// Number of bands
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Whether the set holds no bands
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

/// 3-band coarse EQ with fixed corner frequencies
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreeBandEq {
    low_gain_db: f32,
    mid_gain_db: f32,
    high_gain_db: f32,
}

impl ThreeBandEq {
    /// Create a coarse EQ, clamping each gain to ±10 dB
    pub fn new(low_gain_db: f32, mid_gain_db: f32, high_gain_db: f32) -> Self {
        let mut eq = Self::default();
        eq.set_low_gain_db(low_gain_db);
        eq.set_mid_gain_db(mid_gain_db);
        eq.set_high_gain_db(high_gain_db);
        eq
    }

    pub fn low_gain_db(&self) -> f32 {
        self.low_gain_db
    }

    pub fn mid_gain_db(&self) -> f32 {
        self.mid_gain_db
    }

    pub fn high_gain_db(&self) -> f32 {
        self.high_gain_db
    }

    pub fn set_low_gain_db(&mut self, gain_db: f32) {
        self.low_gain_db = gain_db.clamp(-THREE_BAND_GAIN_RANGE, THREE_BAND_GAIN_RANGE);
    }

    pub fn set_mid_gain_db(&mut self, gain_db: f32) {
        self.mid_gain_db = gain_db.clamp(-THREE_BAND_GAIN_RANGE, THREE_BAND_GAIN_RANGE);
    }

    pub fn set_high_gain_db(&mut self, gain_db: f32) {
        self.high_gain_db = gain_db.clamp(-THREE_BAND_GAIN_RANGE, THREE_BAND_GAIN_RANGE);
    }
}

/// The active EQ model for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum EqSettings {
    ThreeBand(ThreeBandEq),
    FiveBand(BandSet),
}

impl Default for EqSettings {
    fn default() -> Self {
        EqSettings::ThreeBand(ThreeBandEq::default())
    }
}

impl EqSettings {
    /// Expand the active model into the ordered stage list the cascade runs
    pub fn stages(&self) -> Vec<Band> {
        match self {
            EqSettings::ThreeBand(eq) => vec![
                Band::new(THREE_BAND_LOW_HZ, eq.low_gain_db(), 0.707, BandType::LowShelf),
                Band::new(THREE_BAND_MID_HZ, eq.mid_gain_db(), 0.8, BandType::Peaking),
                Band::new(THREE_BAND_HIGH_HZ, eq.high_gain_db(), 0.707, BandType::HighShelf),
            ],
            EqSettings::FiveBand(bands) => bands.iter().map(|(_, band)| *band).collect(),
        }
    }
}

/// Approximate one band's response in dB at a frequency
///
/// Shelves hold their gain on one side of the corner and roll off on the
/// other; peaks are a bell in log2-frequency space. This tracks the biquads
/// closely enough for the visual curve and the coarse fold.
pub fn band_response_db(frequency_hz: f32, band: &Band) -> f32 {
    let ratio = frequency_hz / band.frequency_hz;
    if ratio <= 0.0 {
        return 0.0;
    }
    let log_ratio = ratio.log2();
    let rolloff = (-(log_ratio * band.q).powi(2) * 2.0).exp();
    match band.band_type {
        BandType::LowShelf => {
            if ratio < 1.0 {
                band.gain_db
            } else {
                band.gain_db * rolloff
            }
        }
        BandType::HighShelf => {
            if ratio > 1.0 {
                band.gain_db
            } else {
                band.gain_db * rolloff
            }
        }
        BandType::Peaking => band.gain_db * rolloff,
    }
}

/// Combined response of all enabled bands, clamped to ±12 dB for display
pub fn combined_response_db<'a, I>(frequency_hz: f32, bands: I) -> f32
where
    I: IntoIterator<Item = &'a Band>,
{
    let sum: f32 = bands
        .into_iter()
        .filter(|band| band.enabled)
        .map(|band| band_response_db(frequency_hz, band))
        .sum();
    sum.clamp(-FIVE_BAND_GAIN_RANGE, FIVE_BAND_GAIN_RANGE)
}

/// Fold the parametric model down to the coarse 3-band model
///
/// Enabled bands are grouped by frequency (< 500 Hz, 500-2000 Hz, > 2000 Hz)
/// and each group's gain is averaged; an empty group folds to 0. The fold
/// only drives the coarse display; export never uses it.
pub fn fold_to_three_band(bands: &BandSet) -> ThreeBandEq {
    let mut sums = [0.0f32; 3];
    let mut counts = [0usize; 3];
    for (_, band) in bands.iter() {
        if !band.enabled {
            continue;
        }
        let group = if band.frequency_hz < 500.0 {
            0
        } else if band.frequency_hz <= 2000.0 {
            1
        } else {
            2
        };
        sums[group] += band.gain_db;
        counts[group] += 1;
    }
    let avg = |group: usize| {
        if counts[group] == 0 {
            0.0
        } else {
            sums[group] / counts[group] as f32
        }
    };
    ThreeBandEq::new(avg(0), avg(1), avg(2))
}
