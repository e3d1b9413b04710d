//! Audio side of the core — byte decoding → rolling window → display features,
//! plus capture playback.
//!
//! # Pipeline
//!
//! ```text
//! serial bytes → PcmDecoder → SharedSampleBuffer ─┬─▶ FeatureExtractor → FeatureFrame
//!                                                 └─▶ (recording chunks)
//! capture → resample → Playback (cpal)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use pitch_relay::audio::{FeatureExtractor, PcmDecoder, SharedSampleBuffer};
//! use pitch_relay::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let buffer = SharedSampleBuffer::new(config.audio.buffer_len);
//! let mut decoder = PcmDecoder::new(config.audio.byte_order);
//!
//! buffer.push(&decoder.decode(&[0x00, 0x40, 0x00, 0xC0]));
//! let frame = FeatureExtractor::from_config(&config).extract(&buffer);
//! assert!((frame.level - 0.5).abs() < 1e-6);
//! ```

pub mod buffer;
pub mod decoder;
pub mod features;
pub mod playback;
pub mod resample;
pub mod spectrogram;

pub use buffer::{SampleBuffer, SharedSampleBuffer};
pub use decoder::PcmDecoder;
pub use features::{mean_level, peak_level, FeatureExtractor, FeatureFrame};
pub use playback::{CpalPlayback, Playback, PlaybackError};
pub use resample::{i16_to_f32, mono_to_interleaved, resample};
pub use spectrogram::{Spectrogram, Stft};

#[cfg(test)]
pub use playback::MockPlayback;
