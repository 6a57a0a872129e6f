//! Utility modules for voxcheck

pub mod audio_decoder;

pub use audio_decoder::{decode_audio_bytes, DecodeError, Waveform, TARGET_SAMPLE_RATE};
