//! The collaborator surface the presentation shell talks to.
//!
//! [`Controller`] owns nothing the ingestion task needs exclusively; it holds
//! handles to the shared link, window and recording session plus the
//! injected storage / playback / discovery collaborators.  Every call is
//! bounded and never panics on device or storage trouble: failures become
//! [`StatusEvent`]s on the status channel and are also returned to the caller.
//!
//! ```text
//! shell ──set_pitch / apply_preset──▶ Controller ──Command──▶ DeviceLink
//! shell ◀──get_waveform_snapshot──── Controller ◀──snapshot── SharedSampleBuffer
//! shell ──start / stop / play──────▶ Controller ──▶ RecordingSession
//!                                          └──persist──▶ CaptureStore
//!                                          └──play─────▶ Playback
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinError;

use crate::audio::{
    CpalPlayback, FeatureExtractor, FeatureFrame, PcmDecoder, Playback, SharedSampleBuffer,
    Spectrogram,
};
use crate::config::AppConfig;
use crate::device::{
    Command, Delivery, DeviceLink, GlobPorts, LinkStatus, PortEnumerator, PortOpener, Preset,
    SerialOpener, UnknownPreset,
};
use crate::recording::{CaptureStore, RecordingState, SharedSession, StopOutcome, WavStore};

use super::ingest::{connection_lost, lock_link, IngestionLoop, SharedLink};
use super::state::{emit, ControlState, StatusEvent, StatusSender, PITCH_MAX, PITCH_MIN};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// External dependencies of the core, injectable for tests.
pub struct Collaborators {
    pub opener: Box<dyn PortOpener>,
    pub ports: Arc<dyn PortEnumerator>,
    pub store: Arc<dyn CaptureStore>,
    pub playback: Arc<dyn Playback>,
}

impl Collaborators {
    /// Real serial ports, WAV files on disk and the default output device.
    pub fn system(config: &AppConfig) -> Self {
        Self {
            opener: Box::new(SerialOpener::from_config(&config.device)),
            ports: Arc::new(GlobPorts::new(config.device.port_pattern())),
            store: Arc::new(WavStore::from_config(config)),
            playback: Arc::new(CpalPlayback::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller {
    link: SharedLink,
    buffer: SharedSampleBuffer,
    session: SharedSession,
    extractor: FeatureExtractor,
    controls: Mutex<ControlState>,
    ports: Arc<dyn PortEnumerator>,
    port_pattern: String,
    store: Arc<dyn CaptureStore>,
    playback: Arc<dyn Playback>,
    sample_rate: u32,
    status: StatusSender,
}

impl Controller {
    /// Build the controller and the ingestion loop that feeds it.  Both share
    /// one link, one window and one recording session.  The link starts
    /// disconnected; call [`reconnect`](Self::reconnect) to look for a device.
    pub fn assemble(
        config: &AppConfig,
        collaborators: Collaborators,
        status: StatusSender,
    ) -> (Self, IngestionLoop) {
        let link: SharedLink = Arc::new(Mutex::new(DeviceLink::new(
            collaborators.opener,
            config.device.max_read_bytes,
        )));
        let buffer = SharedSampleBuffer::new(config.audio.buffer_len);
        let session = SharedSession::new();

        let ingest = IngestionLoop::new(
            Arc::clone(&link),
            buffer.clone(),
            session.clone(),
            PcmDecoder::new(config.audio.byte_order),
            status.clone(),
        );

        let controller = Self {
            link,
            buffer,
            session,
            extractor: FeatureExtractor::from_config(config),
            controls: Mutex::new(ControlState::default()),
            ports: collaborators.ports,
            port_pattern: config.device.port_pattern(),
            store: collaborators.store,
            playback: collaborators.playback,
            sample_rate: config.audio.sample_rate,
            status,
        };
        (controller, ingest)
    }

    // -- features -----------------------------------------------------------

    pub fn get_waveform_snapshot(&self) -> Vec<i16> {
        self.extractor.waveform(&self.buffer)
    }

    pub fn get_spectrogram_frame(&self) -> Spectrogram {
        self.extractor.spectrogram(&self.buffer)
    }

    pub fn get_peak_level(&self) -> f32 {
        self.extractor.level(&self.buffer)
    }

    /// All three features from a single snapshot.
    pub fn extract_frame(&self) -> FeatureFrame {
        self.extractor.extract(&self.buffer)
    }

    // -- parameters ---------------------------------------------------------

    /// Send `PITCH <factor>` with `factor` clamped to `[0.5, 2.0]`.
    /// A non-finite `factor` is ignored and nothing changes.
    pub fn set_pitch(&self, factor: f32) -> Delivery {
        if !factor.is_finite() {
            log::warn!("controller: ignoring pitch {factor}");
            return Delivery::Skipped;
        }
        let factor = factor.clamp(PITCH_MIN, PITCH_MAX);
        self.controls().pitch = factor;
        self.send(&Command::pitch(factor))
    }

    /// Send `REVERB <mix>` with `mix` clamped to `[0.0, 1.0]`.
    /// A non-finite `mix` is ignored and nothing changes.
    pub fn set_reverb(&self, mix: f32) -> Delivery {
        if !mix.is_finite() {
            log::warn!("controller: ignoring reverb {mix}");
            return Delivery::Skipped;
        }
        let mix = mix.clamp(0.0, 1.0);
        self.controls().reverb = mix;
        self.send(&Command::reverb(mix))
    }

    /// Look up a preset by name and apply it.
    pub fn apply_preset(&self, name: &str) -> Result<Delivery, UnknownPreset> {
        let preset: Preset = name.parse()?;
        Ok(self.apply(preset))
    }

    pub fn apply(&self, preset: Preset) -> Delivery {
        {
            let mut controls = self.controls();
            match preset {
                Preset::LowVoice | Preset::HighVoice => {
                    if let Some(pitch) = preset.command().arg {
                        controls.pitch = pitch;
                    }
                }
                Preset::Reset => controls.reset(),
                Preset::Robot => {}
            }
        }
        log::info!("controller: preset {}", preset.label());
        self.send(&preset.command())
    }

    /// Last values sent (or attempted) for the sliders.
    pub fn control_state(&self) -> ControlState {
        *self.controls()
    }

    // -- recording ----------------------------------------------------------

    pub fn start_recording(&self) -> StatusEvent {
        let event = if self.session.lock().start() {
            StatusEvent::RecordingStarted
        } else {
            StatusEvent::AlreadyRecording
        };
        self.report(event)
    }

    /// Finish the current recording and persist it.  A failed write keeps
    /// the capture in memory for playback.
    pub fn stop_recording(&self) -> StatusEvent {
        let outcome = self.session.lock().stop();
        let event = match outcome {
            StopOutcome::NotRecording => StatusEvent::NotRecording,
            StopOutcome::Empty => StatusEvent::NothingRecorded,
            StopOutcome::Finalized(capture) => match self.store.persist(&capture) {
                Ok(path) => StatusEvent::RecordingSaved {
                    path,
                    samples: capture.len(),
                },
                Err(e) => StatusEvent::RecordingSaveFailed {
                    reason: e.to_string(),
                    samples: capture.len(),
                },
            },
        };
        self.report(event)
    }

    /// Play the last capture, stopping an active recording first.
    pub fn play_last_recording(&self) -> StatusEvent {
        if self.session.is_recording() {
            self.stop_recording();
        }

        let Some(capture) = self.session.lock().last_capture() else {
            return self.report(StatusEvent::NothingToPlay);
        };

        let samples = capture.len();
        let event = match self.playback.play(capture, self.sample_rate) {
            Ok(()) => StatusEvent::Playing { samples },
            Err(e) => StatusEvent::PlaybackFailed {
                reason: e.to_string(),
            },
        };
        self.report(event)
    }

    pub fn recording_state(&self) -> RecordingState {
        self.session.lock().state()
    }

    // -- link ---------------------------------------------------------------

    pub fn connection_status(&self) -> LinkStatus {
        lock_link(&self.link).status()
    }

    pub fn port(&self) -> Option<String> {
        lock_link(&self.link).port().map(str::to_string)
    }

    /// Drop any connection and adopt the first discovered port that opens.
    ///
    /// Discovery and the open attempts run without the link lock, so the
    /// ingestion tick keeps polling (and finds no connection) meanwhile.
    pub fn reconnect(&self) -> StatusEvent {
        let opener = {
            let mut link = lock_link(&self.link);
            link.disconnect();
            link.opener()
        };

        let candidates = self.ports.candidates();
        log::info!("controller: candidates {candidates:?}");

        for port in candidates {
            match opener.open(&port) {
                Ok(conn) => {
                    lock_link(&self.link).adopt(&port, conn);
                    return self.report(StatusEvent::Connected { port });
                }
                Err(e) => log::warn!("controller: {e}"),
            }
        }
        self.report(StatusEvent::NoDevice {
            pattern: self.port_pattern.clone(),
        })
    }

    // -- internals ----------------------------------------------------------

    fn controls(&self) -> MutexGuard<'_, ControlState> {
        self.controls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A failed write is reported on the status channel and counts as
    /// skipped; the link is disconnected by then.
    fn send(&self, command: &Command) -> Delivery {
        let result = lock_link(&self.link).send_command(command);
        match result {
            Ok(delivery) => delivery,
            Err(e) => {
                emit(&self.status, connection_lost(&e));
                Delivery::Skipped
            }
        }
    }

    fn report(&self, event: StatusEvent) -> StatusEvent {
        emit(&self.status, event.clone());
        event
    }
}

// ---------------------------------------------------------------------------
// offload
// ---------------------------------------------------------------------------

/// Run `f` against `controller` on tokio's blocking pool.
///
/// Controller calls are synchronous and some are slow (full-window STFT,
/// WAV writes, port opens); async callers go through here so the runtime
/// never stalls.
pub async fn offload<T, F>(controller: &Arc<Controller>, f: F) -> Result<T, JoinError>
where
    F: FnOnce(&Controller) -> T + Send + 'static,
    T: Send + 'static,
{
    let controller = Arc::clone(controller);
    tokio::task::spawn_blocking(move || f(&controller)).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
