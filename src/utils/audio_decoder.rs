//! Audio Decoding Utilities
//!
//! **Purpose:** Decode an encoded audio payload (MP3 in the reference
//! deployment) to mono f32 PCM at the canonical sample rate.
//!
//! Uses symphonia for format-agnostic decoding and rubato for resampling.
//! All downstream feature thresholds assume [`TARGET_SAMPLE_RATE`], so every
//! decode ends with a resample when the source rate differs.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Canonical sample rate for all decoded audio (Hz)
///
/// Feature thresholds are calibrated against this rate; decoding to any other
/// rate would shift them.
pub const TARGET_SAMPLE_RATE: u32 = 22050;

/// Decoding errors
///
/// All variants are caller-attributable (bad payload), distinct from internal
/// pipeline failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not parsable as audio
    #[error("Unsupported or corrupt audio: {0}")]
    InvalidAudio(String),

    /// Payload decoded to zero samples
    #[error("Audio stream contains no samples")]
    Empty,

    /// Sample rate conversion failed
    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Decoded mono waveform at the canonical sample rate
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz (always [`TARGET_SAMPLE_RATE`] when produced by
    /// [`decode_audio_bytes`])
    pub sample_rate: u32,
}

impl Waveform {
    /// Total duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode encoded audio bytes to a mono waveform at [`TARGET_SAMPLE_RATE`]
///
/// **Algorithm:**
/// 1. Probe the in-memory byte stream with symphonia (MP3 hint)
/// 2. Find the default audio track and create a decoder for its codec
/// 3. Decode all packets, averaging channels to mono
/// 4. Resample to the canonical rate when the source rate differs
///
/// The staging cursor over the payload is request-scoped and dropped on every
/// exit path.
///
/// # Errors
/// * `DecodeError::InvalidAudio` - bytes are not valid/parsable audio
/// * `DecodeError::Empty` - decoding produced zero samples
pub fn decode_audio_bytes(bytes: &[u8]) -> Result<Waveform, DecodeError> {
    tracing::debug!(payload_bytes = bytes.len(), "Decoding audio payload");

    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::InvalidAudio(format!("probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::InvalidAudio("no audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::InvalidAudio("sample rate unknown".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::InvalidAudio(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                // End of stream
                break;
            }
            Err(e) => {
                return Err(DecodeError::InvalidAudio(format!("error reading packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // Recoverable frame error (e.g. leading junk before the first
                // MP3 sync word); skip the packet
                tracing::debug!(error = %e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => {
                return Err(DecodeError::InvalidAudio(format!("decode failed: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        // Reallocate the staging buffer when a packet exceeds its capacity
        let needed = decoded.capacity() * channels;
        let buf = match &mut sample_buf {
            Some(buf) if buf.capacity() >= needed => buf,
            slot => slot.insert(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)),
        };
        buf.copy_interleaved_ref(decoded);

        // Average channels to mono
        for frame in buf.samples().chunks_exact(channels) {
            samples.push(frame.iter().sum::<f32>() / channels as f32);
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::Empty);
    }

    let samples = if sample_rate == TARGET_SAMPLE_RATE {
        samples
    } else {
        resample_mono(&samples, sample_rate, TARGET_SAMPLE_RATE)?
    };

    let waveform = Waveform {
        samples,
        sample_rate: TARGET_SAMPLE_RATE,
    };

    tracing::debug!(
        total_samples = waveform.samples.len(),
        source_rate = sample_rate,
        duration_seconds = format!("{:.2}", waveform.duration_seconds()),
        "Audio decoding complete"
    );

    Ok(waveform)
}

/// Resample mono audio to the target rate using rubato
///
/// Uses `FastFixedIn` (good quality/performance tradeoff) with the whole clip
/// as a single chunk; clips are short so streaming chunks are unnecessary.
fn resample_mono(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>, DecodeError> {
    tracing::debug!(
        input_rate = input_rate,
        output_rate = output_rate,
        "Resampling to canonical rate"
    );

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0, // fixed ratio, no runtime changes
        PolynomialDegree::Septic,
        input.len(),
        1,
    )
    .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let mut output = resampler
        .process(&[input.to_vec()], None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

    Ok(output.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Render a mono 16-bit WAV into memory (symphonia probes by content, so
    /// the MP3 hint does not prevent WAV fixtures from decoding)
    fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_garbage_bytes() {
        let result = decode_audio_bytes(&[0x00, 0x01, 0x02, 0x03, 0xff, 0xfe]);
        assert!(matches!(result, Err(DecodeError::InvalidAudio(_)) | Err(DecodeError::Empty)));
    }

    #[test]
    fn test_decode_empty_payload() {
        let result = decode_audio_bytes(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_wav_at_canonical_rate() {
        let samples: Vec<f32> = (0..TARGET_SAMPLE_RATE)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / TARGET_SAMPLE_RATE as f32).sin() * 0.5)
            .collect();
        let bytes = wav_bytes(&samples, TARGET_SAMPLE_RATE);

        let waveform = decode_audio_bytes(&bytes).unwrap();
        assert_eq!(waveform.sample_rate, TARGET_SAMPLE_RATE);
        assert!((waveform.duration_seconds() - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_decode_resamples_to_canonical_rate() {
        // 0.5s of 440Hz at 44.1kHz must come back at 22.05kHz, same duration
        let source_rate = 44100;
        let samples: Vec<f32> = (0..source_rate / 2)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / source_rate as f32).sin() * 0.5)
            .collect();
        let bytes = wav_bytes(&samples, source_rate);

        let waveform = decode_audio_bytes(&bytes).unwrap();
        assert_eq!(waveform.sample_rate, TARGET_SAMPLE_RATE);
        assert!((waveform.duration_seconds() - 0.5).abs() < 0.05);
    }
}
