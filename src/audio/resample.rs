//! Sample conversion for playback.
//!
//! Captures are 16-bit mono at the device rate; output devices usually want
//! interleaved `f32` at their own rate.  This module provides the three
//! conversion steps:
//!
//! 1. [`i16_to_f32`] — scale to `[-1.0, 1.0)`.
//! 2. [`resample`] — linear interpolation between any two rates.
//! 3. [`mono_to_interleaved`] — duplicate each sample across output channels.

// ---------------------------------------------------------------------------
// i16_to_f32
// ---------------------------------------------------------------------------

/// Scale signed 16-bit samples to `f32` in `[-1.0, 1.0)`.
pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32_768.0).collect()
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample `samples` from `source_rate` Hz to `target_rate` Hz using linear
/// interpolation.
///
/// * Equal rates return an unchanged copy.
/// * Empty input or a zero rate returns an empty vector.
///
/// The output length is `ceil(samples.len() * target_rate / source_rate)`.
///
/// # Example
///
/// ```rust
/// use pitch_relay::audio::resample;
///
/// let lo = vec![0.5_f32; 441];
/// let hi = resample(&lo, 44_100, 88_200);
/// assert_eq!(hi.len(), 882);
/// ```
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate {
        return samples.to_vec();
    }

    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac as f32) + samples[idx + 1] * frac as f32
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// mono_to_interleaved
// ---------------------------------------------------------------------------

/// Copy each mono sample into every one of `channels` interleaved slots.
///
/// `channels == 0` yields an empty vector.
pub fn mono_to_interleaved(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => samples
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(n as usize))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i16_scaling_bounds() {
        let out = i16_to_f32(&[i16::MIN, 0, i16::MAX]);
        assert_eq!(out[0], -1.0);
        assert_eq!(out[1], 0.0);
        assert!(out[2] < 1.0 && out[2] > 0.999);
    }

    #[test]
    fn resample_same_rate_is_copy() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(resample(&input, 44_100, 44_100), input);
    }

    #[test]
    fn resample_empty_and_zero_rate() {
        assert!(resample(&[], 44_100, 48_000).is_empty());
        assert!(resample(&[0.5], 0, 48_000).is_empty());
    }

    #[test]
    fn resample_downsample_length() {
        let input = vec![0.0_f32; 480];
        assert_eq!(resample(&input, 48_000, 16_000).len(), 160);
    }

    #[test]
    fn resample_interpolates_midpoints() {
        let out = resample(&[0.0, 1.0], 1, 2);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn interleave_duplicates_per_channel() {
        let out = mono_to_interleaved(&[0.1, 0.2], 2);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
        assert_eq!(mono_to_interleaved(&[0.1], 1), vec![0.1]);
        assert!(mono_to_interleaved(&[0.1], 0).is_empty());
    }
}
