//! Acoustic feature extraction
//!
//! **Purpose:** Compute the fixed 5-dimensional feature vector consumed by the
//! classifier and the explanation synthesizer.
//!
//! The extraction contract is total: any computation that would divide by zero
//! or index an empty buffer degrades to a 0 sentinel instead of erroring, so
//! the classifier always receives a complete vector for any waveform.

use rustfft::{num_complex::Complex, FftPlanner};
use thiserror::Error;

use crate::utils::Waveform;

/// Analysis frame length in samples
const FRAME_LEN: usize = 2048;

/// Hop between analysis frames in samples
const HOP_LEN: usize = 512;

/// Energy threshold for silence classification, in dB below peak RMS
const SILENCE_TOP_DB: f64 = 20.0;

/// Floor applied to power-spectrum bins before the geometric mean
const POWER_FLOOR: f64 = 1e-10;

/// Pitch candidate search range (Hz)
const PITCH_FMIN: f64 = 150.0;
const PITCH_FMAX: f64 = 4000.0;

/// Feature extraction errors
///
/// The production extractor never fails; the variant exists so the pipeline's
/// degraded-fallback branch is exercisable through the trait seam.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Unexpected internal failure during extraction
    #[error("Feature extraction failed: {0}")]
    Internal(String),
}

/// The 5 acoustic features, in fixed model-input order
///
/// Invariants: `silence_ratio` in [0,1], `duration >= 0`, all fields finite.
/// A zero-length waveform yields the all-zero sentinel vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    /// Mean per-frame fraction of sign changes; noisiness proxy
    pub zero_crossing_rate: f64,
    /// Mean per-frame geometric/arithmetic power-spectrum ratio
    pub spectral_flatness: f64,
    /// Std deviation of magnitude-filtered pitch estimates (Hz)
    pub pitch_std: f64,
    /// Fraction of total duration below the energy threshold
    pub silence_ratio: f64,
    /// Total waveform length in seconds
    pub duration: f64,
}

impl FeatureVector {
    /// Degenerate sentinel for a zero-length waveform
    pub fn zero() -> Self {
        Self {
            zero_crossing_rate: 0.0,
            spectral_flatness: 0.0,
            pitch_std: 0.0,
            silence_ratio: 0.0,
            duration: 0.0,
        }
    }

    /// Model-input order: [zcr, flatness, pitch_std, silence_ratio, duration]
    pub fn to_array(&self) -> [f64; 5] {
        [
            self.zero_crossing_rate,
            self.spectral_flatness,
            self.pitch_std,
            self.silence_ratio,
            self.duration,
        ]
    }
}

/// Extraction seam for the pipeline
///
/// The orchestrator depends on this trait rather than the concrete extractor
/// so internal-failure handling is testable with an injected failing impl.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, waveform: &Waveform) -> Result<FeatureVector, ExtractError>;
}

/// Production extractor operating directly on the decoded signal
pub struct SignalFeatureExtractor;

impl FeatureExtractor for SignalFeatureExtractor {
    /// Compute all five features
    ///
    /// **Algorithm:**
    /// 1. Frame the signal (2048-sample frames, 512-sample hop)
    /// 2. Zero-crossing rate: mean per-frame sign-change fraction
    /// 3. One Hann-windowed FFT pass per frame; magnitude spectra are shared
    ///    by spectral flatness and pitch tracking
    /// 4. Pitch std: spectral-peak candidates filtered by the clip-wide median
    ///    bin magnitude; 0 when no candidate survives
    /// 5. Silence ratio: frames more than 20 dB below peak RMS count as silent
    fn extract(&self, waveform: &Waveform) -> Result<FeatureVector, ExtractError> {
        let samples = &waveform.samples;
        if samples.is_empty() {
            return Ok(FeatureVector::zero());
        }

        let duration = waveform.duration_seconds();
        let frames = frame_starts(samples.len());

        let zero_crossing_rate = mean_zero_crossing_rate(samples, &frames);

        let spectra = magnitude_spectra(samples, &frames);
        let spectral_flatness = mean_spectral_flatness(&spectra);
        let pitch_std = pitch_std(&spectra, waveform.sample_rate);

        let silence_ratio = silence_ratio(samples, &frames, waveform.sample_rate, duration);

        let features = FeatureVector {
            zero_crossing_rate: finite_or_zero(zero_crossing_rate),
            spectral_flatness: finite_or_zero(spectral_flatness),
            pitch_std: finite_or_zero(pitch_std),
            silence_ratio: finite_or_zero(silence_ratio).clamp(0.0, 1.0),
            duration,
        };

        tracing::debug!(
            zcr = format!("{:.4}", features.zero_crossing_rate),
            flatness = format!("{:.4}", features.spectral_flatness),
            pitch_std = format!("{:.2}", features.pitch_std),
            silence_ratio = format!("{:.3}", features.silence_ratio),
            duration = format!("{:.2}", features.duration),
            "Extracted feature vector"
        );

        Ok(features)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Frame start offsets covering the whole signal (last frame zero-padded)
fn frame_starts(len: usize) -> Vec<usize> {
    (0..len).step_by(HOP_LEN).collect()
}

/// Frame contents at `start`, zero-padded to `FRAME_LEN`
fn frame_at(samples: &[f32], start: usize) -> Vec<f32> {
    let end = (start + FRAME_LEN).min(samples.len());
    let mut frame = samples[start..end].to_vec();
    frame.resize(FRAME_LEN, 0.0);
    frame
}

/// Mean over frames of the fraction of adjacent sample pairs changing sign
fn mean_zero_crossing_rate(samples: &[f32], frames: &[usize]) -> f64 {
    if frames.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for &start in frames {
        let frame = frame_at(samples, start);
        let crossings = frame
            .windows(2)
            .filter(|pair| (pair[0] < 0.0) != (pair[1] < 0.0))
            .count();
        total += crossings as f64 / FRAME_LEN as f64;
    }
    total / frames.len() as f64
}

/// Hann-windowed magnitude spectrum per frame (bins 0..=FRAME_LEN/2)
fn magnitude_spectra(samples: &[f32], frames: &[usize]) -> Vec<Vec<f64>> {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_LEN);

    let window: Vec<f32> = (0..FRAME_LEN)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / FRAME_LEN as f32;
            0.5 * (1.0 - x.cos())
        })
        .collect();

    let mut spectra = Vec::with_capacity(frames.len());
    let mut buffer = vec![Complex::new(0.0f32, 0.0f32); FRAME_LEN];

    for &start in frames {
        let frame = frame_at(samples, start);
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(frame[i] * window[i], 0.0);
        }
        fft.process(&mut buffer);

        let magnitudes: Vec<f64> = buffer[..FRAME_LEN / 2 + 1]
            .iter()
            .map(|c| c.norm() as f64)
            .collect();
        spectra.push(magnitudes);
    }

    spectra
}

/// Mean over frames of geometric/arithmetic mean ratio of the power spectrum
fn mean_spectral_flatness(spectra: &[Vec<f64>]) -> f64 {
    if spectra.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for magnitudes in spectra {
        if magnitudes.is_empty() {
            continue;
        }
        let n = magnitudes.len() as f64;
        let mut log_sum = 0.0;
        let mut linear_sum = 0.0;
        for &m in magnitudes {
            let power = (m * m).max(POWER_FLOOR);
            log_sum += power.ln();
            linear_sum += power;
        }
        let geometric = (log_sum / n).exp();
        let arithmetic = linear_sum / n;
        if arithmetic > 0.0 {
            total += geometric / arithmetic;
        }
    }
    total / spectra.len() as f64
}

/// Standard deviation of spectral-peak pitch estimates
///
/// Each frame contributes its local spectral maxima within the pitch search
/// range, refined by parabolic interpolation. Candidates whose magnitude does
/// not exceed the median bin magnitude across the whole clip are discarded;
/// if none survive the result is 0 (degenerate case, never an error).
fn pitch_std(spectra: &[Vec<f64>], sample_rate: u32) -> f64 {
    let bin_hz = sample_rate as f64 / FRAME_LEN as f64;
    let min_bin = ((PITCH_FMIN / bin_hz).floor() as usize).max(1);
    let max_bin = (PITCH_FMAX / bin_hz).ceil() as usize;

    // Clip-wide median over all bin magnitudes
    let mut all_magnitudes: Vec<f64> = spectra.iter().flatten().copied().collect();
    if all_magnitudes.is_empty() {
        return 0.0;
    }
    all_magnitudes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = all_magnitudes[all_magnitudes.len() / 2];

    let mut pitches: Vec<f64> = Vec::new();
    for magnitudes in spectra {
        let upper = max_bin.min(magnitudes.len().saturating_sub(1));
        for bin in min_bin..upper {
            let m = magnitudes[bin];
            if m <= median || m <= magnitudes[bin - 1] || m < magnitudes[bin + 1] {
                continue;
            }
            // Parabolic interpolation around the peak bin
            let a = magnitudes[bin - 1];
            let b = m;
            let c = magnitudes[bin + 1];
            let denom = a - 2.0 * b + c;
            let offset = if denom.abs() > f64::EPSILON {
                (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
            } else {
                0.0
            };
            pitches.push((bin as f64 + offset) * bin_hz);
        }
    }

    if pitches.is_empty() {
        return 0.0;
    }

    let n = pitches.len() as f64;
    let mean = pitches.iter().sum::<f64>() / n;
    let variance = pitches.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// `1 - non_silent_duration / total_duration` via frame RMS thresholding
///
/// A frame is non-silent when its RMS is within [`SILENCE_TOP_DB`] of the clip
/// peak RMS. A clip whose peak is zero is entirely silent; a zero total
/// duration yields 0 (no division by zero).
fn silence_ratio(samples: &[f32], frames: &[usize], sample_rate: u32, total_duration: f64) -> f64 {
    if total_duration <= 0.0 || frames.is_empty() {
        return 0.0;
    }

    let rms_per_frame: Vec<f64> = frames
        .iter()
        .map(|&start| {
            let frame = frame_at(samples, start);
            let sum_squares: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum_squares / FRAME_LEN as f64).sqrt()
        })
        .collect();

    let peak = rms_per_frame.iter().cloned().fold(0.0f64, f64::max);
    if peak <= 0.0 {
        return 1.0;
    }

    let threshold = peak * 10f64.powf(-SILENCE_TOP_DB / 20.0);
    let non_silent_frames = rms_per_frame.iter().filter(|&&rms| rms > threshold).count();

    let non_silent_duration =
        (non_silent_frames as f64 * HOP_LEN as f64 / sample_rate as f64).min(total_duration);

    (1.0 - non_silent_duration / total_duration).clamp(0.0, 1.0)
}
