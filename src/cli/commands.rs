//! CLI command implementations

use std::path::{Path, PathBuf};

use tracing::info;

use crate::dsp::eq::EqSettings;
use crate::engine::io;
use crate::error::Result;
use crate::render::{OfflineRenderer, RenderRequest, TrackConfig};
use crate::session::{SendLevels, TrackId};

/// Mix WAV stems into one output file.
pub fn render(
    inputs: &[PathBuf],
    output: &Path,
    sample_rate: u32,
    channels: usize,
    dry: bool,
) -> Result<()> {
    info!(stems = inputs.len(), output = %output.display(), "render requested");

    let mut tracks = Vec::with_capacity(inputs.len());
    for input in inputs {
        let buffer = io::load_wav(input)?;
        println!(
            "Loaded stem: {} ({:.2} s, {} ch @ {} Hz)",
            input.display(),
            buffer.duration(),
            buffer.num_channels(),
            buffer.sample_rate()
        );
        tracks.push(TrackConfig {
            track_id: TrackId::new(),
            buffer: Some(buffer),
            volume: 1.0,
            eq: EqSettings::default(),
            sends: SendLevels::default(),
            offset_secs: 0.0,
        });
    }

    let request = RenderRequest {
        tracks,
        sample_rate,
        num_channels: channels,
        apply_effects: !dry,
    };
    let renderer = OfflineRenderer::new();
    renderer.render_to_wav(&request, output, |fraction| {
        info!(percent = (fraction * 100.0) as u32, "render progress");
    })?;

    println!("Mix written: {}", output.display());
    Ok(())
}

/// Print duration and level statistics for one stem.
pub fn probe(input: &Path) -> Result<()> {
    let buffer = io::load_wav(input)?;

    println!("File: {}", input.display());
    println!("Duration: {:.3} s", buffer.duration());
    println!("Sample rate: {} Hz", buffer.sample_rate());
    println!("Channels: {}", buffer.num_channels());
    for channel in 0..buffer.num_channels() {
        println!(
            "  ch {}: peak {:.2} dBFS, rms {:.2} dBFS",
            channel,
            buffer.peak_db(channel),
            buffer.rms_db(channel)
        );
    }

    Ok(())
}
