//! Sample rate conversion using rubato
//!
//! Every decoded input is normalized to the engine rate before planning
//! windows and blends, so frame arithmetic is uniform across tracks.

use rubato::{FastFixedIn, Resampler as RubatoResampler};
use tracing::debug;

use crate::audio::buffer::CHANNELS;
use crate::error::{Error, Result};

/// Engine-wide working sample rate
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Resample interleaved stereo audio to [`TARGET_SAMPLE_RATE`]
///
/// Returns a copy when the input is already at the target rate.
pub fn to_engine_rate(input: &[f32], input_rate: u32) -> Result<Vec<f32>> {
    if input_rate == TARGET_SAMPLE_RATE {
        return Ok(input.to_vec());
    }
    if input.is_empty() {
        return Ok(Vec::new());
    }

    debug!(
        "Resampling from {}Hz to {}Hz",
        input_rate, TARGET_SAMPLE_RATE
    );

    let planar_input = deinterleave(input);
    let input_frames = planar_input[0].len();

    let mut resampler = FastFixedIn::<f32>::new(
        TARGET_SAMPLE_RATE as f64 / input_rate as f64,
        1.0,
        rubato::PolynomialDegree::Septic,
        input_frames,
        CHANNELS,
    )
    .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

    let planar_output = resampler
        .process(&planar_input, None)
        .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

    Ok(interleave(&planar_output))
}

fn deinterleave(input: &[f32]) -> Vec<Vec<f32>> {
    let frames = input.len() / CHANNELS;
    let mut planar = vec![Vec::with_capacity(frames); CHANNELS];
    for frame in input.chunks_exact(CHANNELS) {
        for (channel, &sample) in frame.iter().enumerate() {
            planar[channel].push(sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map_or(0, |c| c.len());
    let mut interleaved = Vec::with_capacity(frames * CHANNELS);
    for i in 0..frames {
        for channel in planar {
            interleaved.push(channel[i]);
        }
    }
    interleaved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_identity() {
        let input = vec![0.1, -0.1, 0.2, -0.2];
        assert_eq!(to_engine_rate(&input, TARGET_SAMPLE_RATE).unwrap(), input);
    }

    #[test]
    fn test_resample_changes_frame_count() {
        // One second of 48kHz silence becomes roughly one second at 44.1kHz
        let input = vec![0.0f32; 48000 * CHANNELS];
        let output = to_engine_rate(&input, 48000).unwrap();
        let frames = output.len() / CHANNELS;
        assert!((frames as i64 - 44100).unsigned_abs() < 500, "{frames}");
    }

    #[test]
    fn test_interleave_round_trip() {
        let input = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(interleave(&deinterleave(&input)), input);
    }
}
