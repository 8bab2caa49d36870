//! Audio buffer type and offline decode/encode
//!
//! The engine works on fully-materialized, interleaved stereo f32 buffers.
//! Decode turns collaborator-supplied bytes into buffers before rendering
//! begins; encode turns the final buffer into the WAV bytes handed back to
//! storage.

pub mod buffer;
pub mod decode;
pub mod encode;
pub mod resample;

pub use buffer::AudioBuffer;
pub use decode::decode_bytes;
pub use encode::{encode_wav, OUTPUT_MIME_TYPE};
pub use resample::TARGET_SAMPLE_RATE;
