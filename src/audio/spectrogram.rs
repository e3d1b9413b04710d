//! Short-time Fourier transform of the rolling window, scaled to decibels
//! and decimated for display.
//!
//! Each segment is mean-removed, multiplied by a periodic Tukey window
//! (α = 0.25) and transformed with `realfft`.  Power is density-scaled
//! (`|X|² / (fs · Σw²)`, doubled for the interior one-sided bins), converted
//! with `10·log10(p + ε)` and clamped to the configured dB range.  Only the
//! rows and columns that survive decimation are computed.

use std::f32::consts::PI;
use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};

use crate::config::SpectrogramConfig;

// ---------------------------------------------------------------------------
// Spectrogram
// ---------------------------------------------------------------------------

/// Decimated dB magnitude grid, row-major over (frequency, time).
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// Number of frequency rows after decimation.
    pub bins: usize,
    /// Number of time columns after decimation.
    pub frames: usize,
    /// `bins * frames` values in dB, each within `[db_floor, db_ceiling]`.
    pub db: Vec<f32>,
    /// Frequency spacing between adjacent rows in Hz.
    pub bin_hz: f32,
    /// Time spacing between adjacent columns in seconds.
    pub frame_secs: f32,
}

impl Spectrogram {
    /// Value at frequency row `bin`, time column `frame`.
    pub fn get(&self, bin: usize, frame: usize) -> Option<f32> {
        if bin >= self.bins || frame >= self.frames {
            return None;
        }
        self.db.get(bin * self.frames + frame).copied()
    }

    /// One frequency row across all time columns.
    pub fn row(&self, bin: usize) -> &[f32] {
        if bin >= self.bins {
            return &[];
        }
        &self.db[bin * self.frames..(bin + 1) * self.frames]
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Stft
// ---------------------------------------------------------------------------

/// Planned STFT for a fixed segment length.
pub struct Stft {
    config: SpectrogramConfig,
    sample_rate: u32,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    /// `1 / (fs · Σw²)`.
    density_scale: f32,
}

impl Stft {
    pub fn new(config: SpectrogramConfig, sample_rate: u32) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.segment_len);
        let window = tukey_periodic(config.segment_len, 0.25);
        let energy: f32 = window.iter().map(|w| w * w).sum();
        let density_scale = 1.0 / (sample_rate.max(1) as f32 * energy.max(f32::MIN_POSITIVE));

        Self {
            config,
            sample_rate,
            fft,
            window,
            density_scale,
        }
    }

    /// Transform `samples` into a decimated dB grid.
    ///
    /// A window shorter than one segment is zero-padded into a single frame.
    pub fn compute(&self, samples: &[i16]) -> Spectrogram {
        let seg = self.config.segment_len;
        let step = seg - self.config.overlap();
        let total_frames = if samples.len() <= seg {
            1
        } else {
            (samples.len() - self.config.overlap()) / step
        };
        let total_bins = seg / 2 + 1;

        let kept_bins: Vec<usize> = (0..total_bins).step_by(self.config.freq_stride).collect();
        let kept_frames: Vec<usize> = (0..total_frames).step_by(self.config.time_stride).collect();

        let mut db = vec![self.config.db_floor; kept_bins.len() * kept_frames.len()];
        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();

        for (col, &frame) in kept_frames.iter().enumerate() {
            let start = frame * step;
            let end = (start + seg).min(samples.len());
            let segment = &samples[start.min(end)..end];

            self.fill_segment(segment, &mut input);
            if let Err(e) = self.fft.process(&mut input, &mut spectrum) {
                log::warn!("spectrogram: fft failed on frame {frame}: {e}");
                continue;
            }

            for (row, &bin) in kept_bins.iter().enumerate() {
                let one_sided = if bin == 0 || (seg % 2 == 0 && bin == total_bins - 1) {
                    1.0
                } else {
                    2.0
                };
                let power = spectrum[bin].norm_sqr() * self.density_scale * one_sided;
                db[row * kept_frames.len() + col] = self.to_db(power);
            }
        }

        Spectrogram {
            bins: kept_bins.len(),
            frames: kept_frames.len(),
            db,
            bin_hz: self.sample_rate as f32 / seg as f32 * self.config.freq_stride as f32,
            frame_secs: step as f32 / self.sample_rate.max(1) as f32
                * self.config.time_stride as f32,
        }
    }

    /// Mean-removed, windowed copy of `segment`, zero-padded to full length.
    fn fill_segment(&self, segment: &[i16], input: &mut [f32]) {
        let mean = if segment.is_empty() {
            0.0
        } else {
            segment.iter().map(|&s| s as f32).sum::<f32>() / segment.len() as f32
        };
        for (i, slot) in input.iter_mut().enumerate() {
            *slot = match segment.get(i) {
                Some(&s) => (s as f32 - mean) * self.window[i],
                None => 0.0,
            };
        }
    }

    fn to_db(&self, power: f32) -> f32 {
        let db = 10.0 * (power as f64 + self.config.epsilon).log10();
        let db = db as f32;
        if db.is_nan() {
            return self.config.db_floor;
        }
        db.clamp(self.config.db_floor, self.config.db_ceiling)
    }
}

/// Periodic (DFT-even) Tukey window with taper fraction `alpha`.
fn tukey_periodic(len: usize, alpha: f32) -> Vec<f32> {
    // Periodic = symmetric window of len + 1 with the last point dropped.
    let m = len + 1;
    let denom = (m - 1) as f32;
    let width = (alpha * denom / 2.0).floor() as usize;

    (0..len)
        .map(|n| {
            let x = n as f32;
            if n <= width {
                0.5 * (1.0 + (PI * (-1.0 + 2.0 * x / alpha / denom)).cos())
            } else if n < m - width - 1 {
                1.0
            } else {
                0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * x / alpha / denom)).cos())
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
