//! WAV encoding using hound
//!
//! The engine's output contract is "rendered byte buffer with a MIME type";
//! WAV keeps the render loss-free for whatever encoder sits downstream.

use std::io::Cursor;

use crate::audio::buffer::AudioBuffer;
use crate::error::{Error, Result};

/// MIME type of encoded output
pub const OUTPUT_MIME_TYPE: &str = "audio/wav";

/// Encode a buffer as 32-bit float WAV bytes
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Encode(format!("WAV writer init failed: {}", e)))?;
        for &sample in &buffer.samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Encode(format!("WAV write failed: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::Encode(format!("WAV finalize failed: {}", e)))?;
    }
    Ok(cursor.into_inner())
}
