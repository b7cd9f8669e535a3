//! DSP building blocks for the per-track signal chain
//!
//! The effect set is fixed: an EQ cascade (3-band coarse or 5-band
//! parametric), one convolution reverb send, and one feedback delay send.

pub mod biquad;
pub mod delay;
pub mod eq;
pub mod meter;
pub mod reverb;

pub use biquad::{Biquad, BiquadCoeffs};
pub use delay::FeedbackDelay;
pub use eq::{
    band_response_db, combined_response_db, fold_to_three_band, Band, BandId, BandSet,
    BandType, EqSettings, ThreeBandEq,
};
pub use meter::{LevelMeter, MeterReading};
pub use reverb::ConvolutionReverb;
