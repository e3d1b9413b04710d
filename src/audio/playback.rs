//! Capture playback via `cpal`.
//!
//! [`Playback`] is the seam the recording controller hands finished captures
//! to.  [`CpalPlayback`] is the production implementation: it opens the
//! default output device on a dedicated thread (a `cpal::Stream` is not
//! `Send`), plays the capture once and drops the stream when done.

use std::sync::{mpsc, Arc};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::resample::{i16_to_f32, mono_to_interleaved, resample};

/// Extra time the stream is kept alive after the last sample so the device
/// buffer drains.
const DRAIN_MARGIN: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors that can occur while starting playback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("failed to query default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn playback thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error("playback thread exited before the stream started")]
    Aborted,
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Something that can play a mono 16-bit capture.
///
/// `play` must return once playback has *started*; it must not block for the
/// length of the capture.
pub trait Playback: Send + Sync {
    fn play(&self, capture: Arc<[i16]>, sample_rate: u32) -> Result<(), PlaybackError>;
}

// ---------------------------------------------------------------------------
// CpalPlayback
// ---------------------------------------------------------------------------

/// Plays captures on the system default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalPlayback;

impl CpalPlayback {
    pub fn new() -> Self {
        Self
    }
}

impl Playback for CpalPlayback {
    fn play(&self, capture: Arc<[i16]>, sample_rate: u32) -> Result<(), PlaybackError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), PlaybackError>>();

        std::thread::Builder::new()
            .name("playback".into())
            .spawn(move || match start_stream(&capture, sample_rate) {
                Ok((stream, duration)) => {
                    let _ = ready_tx.send(Ok(()));
                    std::thread::sleep(duration + DRAIN_MARGIN);
                    drop(stream);
                    log::debug!("playback: finished after {:.2}s", duration.as_secs_f32());
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        ready_rx.recv().unwrap_or(Err(PlaybackError::Aborted))
    }
}

/// Build and start an output stream for `capture`.  Returns the live stream
/// and the playback duration.
fn start_stream(
    capture: &[i16],
    sample_rate: u32,
) -> Result<(cpal::Stream, Duration), PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(PlaybackError::NoDevice)?;

    let supported = device.default_output_config()?;
    let channels = supported.channels();
    let output_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    let mono = resample(&i16_to_f32(capture), sample_rate, output_rate);
    let duration = Duration::from_secs_f64(mono.len() as f64 / output_rate.max(1) as f64);
    let data = mono_to_interleaved(&mono, channels);
    let mut pos = 0usize;

    let stream = device.build_output_stream(
        &config,
        move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let n = out.len().min(data.len() - pos);
            out[..n].copy_from_slice(&data[pos..pos + n]);
            out[n..].iter_mut().for_each(|s| *s = 0.0);
            pos += n;
        },
        |err: cpal::StreamError| {
            log::error!("cpal output stream error: {err}");
        },
        None,
    )?;

    stream.play()?;
    log::info!(
        "playback: {} samples @ {} Hz → {} Hz, {} ch",
        capture.len(),
        sample_rate,
        output_rate,
        channels
    );
    Ok((stream, duration))
}

// ---------------------------------------------------------------------------
// MockPlayback  (test-only)
// ---------------------------------------------------------------------------

/// A test double that records what it was asked to play.
#[cfg(test)]
#[derive(Default)]
pub struct MockPlayback {
    pub played: std::sync::Mutex<Vec<Vec<i16>>>,
    pub fail: bool,
}

#[cfg(test)]
impl MockPlayback {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn played(&self) -> Vec<Vec<i16>> {
        self.played.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Playback for MockPlayback {
    fn play(&self, capture: Arc<[i16]>, _sample_rate: u32) -> Result<(), PlaybackError> {
        if self.fail {
            return Err(PlaybackError::NoDevice);
        }
        self.played.lock().unwrap().push(capture.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
