//! Audio decoding using symphonia
//!
//! Decodes collaborator-supplied byte buffers (the storage layer hands the
//! engine fully-fetched bytes, never file handles) into interleaved stereo
//! f32 at the engine rate.
//!
//! # Supported formats
//!
//! Per Cargo.toml symphonia features: MP3, FLAC, AAC, MP4/M4A, Vorbis, WAV.
//!
//! # Sample format
//!
//! - Output: stereo f32, interleaved [L, R, L, R, ...]
//! - Mono inputs: duplicated to stereo
//! - Multi-channel inputs: front left/right taken, other channels dropped

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::audio::buffer::AudioBuffer;
use crate::audio::resample;
use crate::error::{Error, Result};

/// Decode an in-memory audio file into a stereo engine-rate buffer
///
/// `extension_hint` helps symphonia's probe when the container has no
/// recognizable magic (e.g. raw AAC); pass the original filename extension
/// when known.
pub fn decode_bytes(bytes: Vec<u8>, extension_hint: Option<&str>) -> Result<AudioBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(format!("Unrecognized audio format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let native_sample_rate = codec_params.sample_rate.unwrap_or(resample::TARGET_SAMPLE_RATE);
    let native_channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("Unsupported codec: {}", e)))?;

    let mut interleaved_stereo: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::Decode(format!("Packet read failed: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Recoverable corruption: skip the packet, keep decoding
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(Error::Decode(format!("Decode failed: {}", e))),
        };

        let spec = *decoded.spec();
        let packet_channels = spec.channels.count();
        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
        });
        buf.copy_interleaved_ref(decoded);

        extend_as_stereo(&mut interleaved_stereo, buf.samples(), packet_channels);
    }

    if interleaved_stereo.is_empty() {
        return Err(Error::Decode("Decoded zero audio frames".to_string()));
    }

    debug!(
        "Decoded {} frames at {}Hz ({} channels)",
        interleaved_stereo.len() / 2,
        native_sample_rate,
        native_channels
    );

    let samples = resample::to_engine_rate(&interleaved_stereo, native_sample_rate)?;
    Ok(AudioBuffer::new(samples, resample::TARGET_SAMPLE_RATE))
}

/// Append interleaved samples of arbitrary channel count as stereo
fn extend_as_stereo(out: &mut Vec<f32>, samples: &[f32], channels: usize) {
    match channels {
        0 => {}
        1 => {
            for &s in samples {
                out.push(s);
                out.push(s);
            }
        }
        _ => {
            for frame in samples.chunks_exact(channels) {
                out.push(frame[0]);
                out.push(frame[1]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small WAV file in memory for decode tests
    fn wav_bytes(frames: usize, channels: u16, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                let value = (i as f32 / frames as f32).sin() * 0.5;
                for _ in 0..channels {
                    writer.write_sample(value).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_stereo_wav() {
        let bytes = wav_bytes(4410, 2, 44100);
        let buffer = decode_bytes(bytes, Some("wav")).unwrap();
        assert_eq!(buffer.sample_rate, 44100);
        assert_eq!(buffer.frames(), 4410);
    }

    #[test]
    fn test_decode_mono_duplicates_to_stereo() {
        let bytes = wav_bytes(1000, 1, 44100);
        let buffer = decode_bytes(bytes, Some("wav")).unwrap();
        assert_eq!(buffer.frames(), 1000);
        // Left and right channels identical
        for frame in buffer.samples.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn test_decode_resamples_to_engine_rate() {
        let bytes = wav_bytes(48000, 2, 48000);
        let buffer = decode_bytes(bytes, Some("wav")).unwrap();
        assert_eq!(buffer.sample_rate, 44100);
        assert!((buffer.frames() as i64 - 44100).unsigned_abs() < 500);
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let err = decode_bytes(vec![0u8; 256], None).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
