//! Integrated loudness measurement and normalization
//!
//! EBU R128 / ITU-R BS.1770 integrated loudness: K-weighting (a high shelf
//! modelling head diffraction followed by a high-pass), mean square over
//! 400 ms blocks with 75% overlap, then two-stage gating (absolute −70
//! LUFS, relative −10 LU) before averaging.
//!
//! The final render pass measures the full output once and applies a flat
//! gain toward the configured target, clamped to sane limits so a broken
//! measurement can never produce a deafening or silent file.

use tracing::debug;

use crate::audio::buffer::{AudioBuffer, CHANNELS};

/// Gain clamp bounds in dB, matching usual auto-gain staging limits
const MIN_GAIN_DB: f64 = -24.0;
const MAX_GAIN_DB: f64 = 12.0;

/// Absolute gate threshold from BS.1770
const ABSOLUTE_GATE_LUFS: f64 = -70.0;

/// Relative gate offset in LU
const RELATIVE_GATE_LU: f64 = -10.0;

/// Measurement block length and hop (400 ms, 75% overlap)
const BLOCK_SECONDS: f64 = 0.4;
const HOP_SECONDS: f64 = 0.1;

/// One second-order IIR section (direct form I)
#[derive(Debug, Clone)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// K-weighting stage 1: high shelf (+4 dB above ~1.5 kHz)
///
/// Coefficients derived from the BS.1770 analog prototype for an arbitrary
/// sample rate (the standard only tabulates 48 kHz).
fn shelf_filter(sample_rate: f64) -> Biquad {
    let f0 = 1681.974450955533;
    let gain_db = 3.999843853973347;
    let q = 0.7071752369554196;

    let k = (std::f64::consts::PI * f0 / sample_rate).tan();
    let vh = 10f64.powf(gain_db / 20.0);
    let vb = vh.powf(0.4996667741545416);
    let a0 = 1.0 + k / q + k * k;

    Biquad {
        b0: (vh + vb * k / q + k * k) / a0,
        b1: 2.0 * (k * k - vh) / a0,
        b2: (vh - vb * k / q + k * k) / a0,
        a1: 2.0 * (k * k - 1.0) / a0,
        a2: (1.0 - k / q + k * k) / a0,
        x1: 0.0,
        x2: 0.0,
        y1: 0.0,
        y2: 0.0,
    }
}

/// K-weighting stage 2: high-pass (rolls off below ~38 Hz)
fn highpass_filter(sample_rate: f64) -> Biquad {
    let f0 = 38.13547087602444;
    let q = 0.5003270373238773;

    let k = (std::f64::consts::PI * f0 / sample_rate).tan();
    let a0 = 1.0 + k / q + k * k;

    Biquad {
        b0: 1.0,
        b1: -2.0,
        b2: 1.0,
        a1: 2.0 * (k * k - 1.0) / a0,
        a2: (1.0 - k / q + k * k) / a0,
        x1: 0.0,
        x2: 0.0,
        y1: 0.0,
        y2: 0.0,
    }
}

/// Measure integrated loudness in LUFS
///
/// Returns None for silence or inputs shorter than one 400 ms block, where
/// integrated loudness is undefined.
pub fn measure_integrated_lufs(buffer: &AudioBuffer) -> Option<f64> {
    let sample_rate = buffer.sample_rate as f64;
    let frames = buffer.frames();
    let block_frames = (BLOCK_SECONDS * sample_rate) as usize;
    let hop_frames = (HOP_SECONDS * sample_rate) as usize;
    if frames < block_frames || block_frames == 0 {
        return None;
    }

    // K-weight each channel independently
    let mut weighted = vec![0.0f64; buffer.samples.len()];
    for channel in 0..CHANNELS {
        let mut shelf = shelf_filter(sample_rate);
        let mut highpass = highpass_filter(sample_rate);
        for frame in 0..frames {
            let idx = frame * CHANNELS + channel;
            let x = buffer.samples[idx] as f64;
            weighted[idx] = highpass.process(shelf.process(x));
        }
    }

    // Mean-square energy per 400ms block, channels summed (unity weights
    // for stereo per BS.1770)
    let mut block_powers = Vec::new();
    let mut start = 0;
    while start + block_frames <= frames {
        let mut sum = 0.0f64;
        for frame in start..start + block_frames {
            for channel in 0..CHANNELS {
                let s = weighted[frame * CHANNELS + channel];
                sum += s * s;
            }
        }
        block_powers.push(sum / block_frames as f64);
        start += hop_frames;
    }

    let block_loudness = |power: f64| -0.691 + 10.0 * power.max(f64::MIN_POSITIVE).log10();

    // Absolute gate at -70 LUFS
    let above_absolute: Vec<f64> = block_powers
        .iter()
        .copied()
        .filter(|&p| block_loudness(p) > ABSOLUTE_GATE_LUFS)
        .collect();
    if above_absolute.is_empty() {
        return None;
    }

    // Relative gate 10 LU under the absolute-gated mean
    let mean_power = above_absolute.iter().sum::<f64>() / above_absolute.len() as f64;
    let relative_threshold = block_loudness(mean_power) + RELATIVE_GATE_LU;

    let gated: Vec<f64> = above_absolute
        .into_iter()
        .filter(|&p| block_loudness(p) > relative_threshold)
        .collect();
    if gated.is_empty() {
        return None;
    }

    let integrated_power = gated.iter().sum::<f64>() / gated.len() as f64;
    Some(block_loudness(integrated_power))
}

/// Gain in dB required to move `measured` to `target`, clamped
pub fn gain_to_target_db(measured_lufs: f64, target_lufs: f64) -> f64 {
    (target_lufs - measured_lufs).clamp(MIN_GAIN_DB, MAX_GAIN_DB)
}

/// Normalize a buffer toward the target integrated loudness, in place
///
/// Silent or too-short buffers are left untouched. The applied gain is
/// additionally limited so the peak never exceeds full scale.
pub fn normalize_to_lufs(buffer: &mut AudioBuffer, target_lufs: f64) {
    let Some(measured) = measure_integrated_lufs(buffer) else {
        debug!("Loudness undefined (silence or too short); skipping normalization");
        return;
    };

    let gain_db = gain_to_target_db(measured, target_lufs);
    let mut gain = 10f64.powf(gain_db / 20.0) as f32;

    // Never push the peak past full scale
    let peak = buffer.peak();
    if peak * gain > 1.0 {
        gain = 1.0 / peak;
    }

    debug!(
        "Normalizing {:.2} LUFS -> target {:.2} LUFS (gain {:.2} dB)",
        measured, target_lufs, gain_db
    );

    for sample in &mut buffer.samples {
        *sample *= gain;
    }
}
