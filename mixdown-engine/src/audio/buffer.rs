//! In-memory audio buffer
//!
//! Interleaved stereo f32 samples ([L, R, L, R, ...]) at a fixed sample
//! rate. Every buffer is owned by exactly one render job; nothing here is
//! shared across jobs.

/// Channels are always stereo inside the engine
pub const CHANNELS: usize = 2;

/// Interleaved stereo f32 audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples, length is always a multiple of 2
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap interleaved stereo samples; truncates a trailing half-frame
    pub fn new(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        if samples.len() % CHANNELS != 0 {
            samples.truncate(samples.len() - 1);
        }
        Self {
            samples,
            sample_rate,
        }
    }

    /// A silent buffer of the given length in frames
    pub fn silent(frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; frames * CHANNELS],
            sample_rate,
        }
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Copy out a frame-range window, zero-padding past the end
    ///
    /// `start_frame` beyond the buffer yields pure silence of the requested
    /// length; a window that runs off the end is padded with silence. This
    /// is the "missing audio is silent, not an error" rule the renderer
    /// relies on.
    pub fn window(&self, start_frame: usize, frames: usize) -> AudioBuffer {
        let mut samples = vec![0.0f32; frames * CHANNELS];
        let total = self.frames();
        if start_frame < total {
            let available = (total - start_frame).min(frames);
            let src_start = start_frame * CHANNELS;
            let src_end = src_start + available * CHANNELS;
            samples[..available * CHANNELS].copy_from_slice(&self.samples[src_start..src_end]);
        }
        AudioBuffer {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}
