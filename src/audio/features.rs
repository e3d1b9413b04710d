//! Display features derived from the rolling window.
//!
//! The presentation shell polls [`FeatureExtractor::extract`] on its own tick
//! to get a waveform slice, a spectrogram grid and an input level.  All three
//! come from one copy of the window taken under the buffer lock, so they
//! describe the same instant; the FFT runs after the lock is released.
//!
//! # Example
//!
//! ```rust
//! use pitch_relay::audio::{FeatureExtractor, SharedSampleBuffer};
//! use pitch_relay::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let buffer = SharedSampleBuffer::new(config.audio.buffer_len);
//! let extractor = FeatureExtractor::from_config(&config);
//!
//! let frame = extractor.extract(&buffer);
//! assert_eq!(frame.waveform.len(), 1_000);
//! assert_eq!(frame.level, 0.0);
//! assert!(frame.spectrogram.db.iter().all(|v| v.is_finite()));
//! ```

use crate::config::{AppConfig, LevelMeter};

use super::buffer::SharedSampleBuffer;
use super::spectrogram::{Spectrogram, Stft};

/// Full-scale magnitude of a signed 16-bit sample.
const FULL_SCALE: f32 = 32_768.0;

// ---------------------------------------------------------------------------
// FeatureFrame
// ---------------------------------------------------------------------------

/// One poll's worth of display data.  Owned by the caller; never written
/// back into the core.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    /// The newest `waveform_len` samples, unmodified.
    pub waveform: Vec<i16>,
    /// Decimated dB grid over the whole window.
    pub spectrogram: Spectrogram,
    /// Input level in `[0.0, 1.0]`.
    pub level: f32,
}

// ---------------------------------------------------------------------------
// Level metering
// ---------------------------------------------------------------------------

/// `max(|s|) / 32768`, in `[0.0, 1.0]`.  Zero for an empty slice.
pub fn peak_level(samples: &[i16]) -> f32 {
    let peak = samples
        .iter()
        .map(|&s| (s as i32).unsigned_abs())
        .max()
        .unwrap_or(0);
    (peak as f32 / FULL_SCALE).min(1.0)
}

/// `mean(|s|) / 32768`, in `[0.0, 1.0]`.  Zero for an empty slice.
///
/// Kept for configurations that prefer the averaged VU-style reading.
pub fn mean_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples
        .iter()
        .map(|&s| (s as i32).unsigned_abs() as u64)
        .sum();
    (sum as f32 / samples.len() as f32 / FULL_SCALE).min(1.0)
}

// ---------------------------------------------------------------------------
// FeatureExtractor
// ---------------------------------------------------------------------------

/// Computes [`FeatureFrame`]s from a [`SharedSampleBuffer`].
pub struct FeatureExtractor {
    stft: Stft,
    waveform_len: usize,
    meter: LevelMeter,
}

impl FeatureExtractor {
    pub fn new(stft: Stft, waveform_len: usize, meter: LevelMeter) -> Self {
        Self {
            stft,
            waveform_len,
            meter,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Stft::new(config.spectrogram.clone(), config.audio.sample_rate),
            config.audio.waveform_len,
            config.audio.level_meter,
        )
    }

    /// Snapshot the whole window once and derive all three features from it.
    pub fn extract(&self, buffer: &SharedSampleBuffer) -> FeatureFrame {
        let window = buffer.snapshot(buffer.capacity());
        let tail = tail(&window, self.waveform_len);

        FeatureFrame {
            waveform: tail.to_vec(),
            spectrogram: self.stft.compute(&window),
            level: self.level_of(tail),
        }
    }

    /// The newest `waveform_len` samples.
    pub fn waveform(&self, buffer: &SharedSampleBuffer) -> Vec<i16> {
        buffer.snapshot(self.waveform_len)
    }

    /// Spectrogram of the entire window.
    pub fn spectrogram(&self, buffer: &SharedSampleBuffer) -> Spectrogram {
        let window = buffer.snapshot(buffer.capacity());
        self.stft.compute(&window)
    }

    /// Level over the waveform window using the configured meter.
    pub fn level(&self, buffer: &SharedSampleBuffer) -> f32 {
        self.level_of(&buffer.snapshot(self.waveform_len))
    }

    fn level_of(&self, samples: &[i16]) -> f32 {
        match self.meter {
            LevelMeter::Peak => peak_level(samples),
            LevelMeter::Mean => mean_level(samples),
        }
    }
}

fn tail(samples: &[i16], len: usize) -> &[i16] {
    &samples[samples.len().saturating_sub(len)..]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(meter: LevelMeter) -> (FeatureExtractor, SharedSampleBuffer) {
        let mut config = AppConfig::default();
        config.audio.level_meter = meter;
        (
            FeatureExtractor::from_config(&config),
            SharedSampleBuffer::new(config.audio.buffer_len),
        )
    }

    #[test]
    fn silence_gives_zero_level_and_finite_grid() {
        let (ex, buf) = extractor(LevelMeter::Peak);
        let frame = ex.extract(&buf);

        assert_eq!(frame.level, 0.0);
        assert_eq!(frame.waveform, vec![0; 1_000]);
        assert!(!frame.spectrogram.is_empty());
        assert!(frame.spectrogram.db.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn waveform_is_newest_samples_unmodified() {
        let (ex, buf) = extractor(LevelMeter::Peak);
        let ramp: Vec<i16> = (0..2_000).collect();
        buf.push(&ramp);

        let wave = ex.waveform(&buf);
        assert_eq!(wave.len(), 1_000);
        assert_eq!(wave.first(), Some(&1_000));
        assert_eq!(wave.last(), Some(&1_999));
        assert_eq!(ex.extract(&buf).waveform, wave);
    }

    #[test]
    fn peak_level_full_scale_negative_is_one() {
        assert_eq!(peak_level(&[0, i16::MIN, 5]), 1.0);
    }

    #[test]
    fn peak_level_half_scale() {
        assert!((peak_level(&[100, -16_384, 200]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn peak_level_empty_is_zero() {
        assert_eq!(peak_level(&[]), 0.0);
        assert_eq!(mean_level(&[]), 0.0);
    }

    #[test]
    fn mean_level_averages_magnitudes() {
        let level = mean_level(&[16_384, -16_384, 0, 0]);
        assert!((level - 0.25).abs() < 1e-6);
    }

    #[test]
    fn level_only_looks_at_waveform_window() {
        let (ex, buf) = extractor(LevelMeter::Peak);
        buf.push(&[30_000]);
        buf.push(&vec![0; 1_000]);
        assert_eq!(ex.level(&buf), 0.0);

        buf.push(&[-8_192]);
        assert!((ex.level(&buf) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn mean_meter_is_selectable() {
        let (ex, buf) = extractor(LevelMeter::Mean);
        buf.push(&vec![16_384; 1_000]);
        assert!((ex.extract(&buf).level - 0.5).abs() < 1e-6);
    }

    #[test]
    fn spectrogram_accessor_matches_extract() {
        let (ex, buf) = extractor(LevelMeter::Peak);
        let noise: Vec<i16> = (0..44_100).map(|i| ((i * 7_919) % 2_001 - 1_000) as i16).collect();
        buf.push(&noise);
        assert_eq!(ex.spectrogram(&buf), ex.extract(&buf).spectrogram);
    }
}
