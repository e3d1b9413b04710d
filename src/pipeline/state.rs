//! Status events and the control values the shell displays.
//!
//! [`StatusEvent`] is everything the core tells the presentation shell that
//! is not a polled feature: link changes, recording results and the expected
//! empty states ("nothing to play").  Events travel over a
//! `tokio::sync::mpsc` unbounded channel so they can be sent from both the
//! ingestion task and synchronous controller calls.
//!
//! [`ControlState`] mirrors the last pitch / reverb values sent to the
//! device, so a slider can be redrawn after a preset or a reset.

use std::path::PathBuf;

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// StatusEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// The link adopted `port`.
    Connected { port: String },
    /// Discovery found no port that would open.
    NoDevice { pattern: String },
    /// A read or write failed; the link is now disconnected.
    ConnectionLost { port: String, reason: String },

    RecordingStarted,
    /// Already recording; `start_recording` changed nothing.
    AlreadyRecording,
    /// Not recording; `stop_recording` changed nothing.
    NotRecording,
    /// Recording ended without any audio; no file was written.
    NothingRecorded,
    RecordingSaved { path: PathBuf, samples: usize },
    /// The capture could not be written but is still available for playback.
    RecordingSaveFailed { reason: String, samples: usize },

    Playing { samples: usize },
    NothingToPlay,
    PlaybackFailed { reason: String },
}

impl StatusEvent {
    /// One-line message for a status bar.
    pub fn message(&self) -> String {
        match self {
            StatusEvent::Connected { port } => format!("Connected to {port}"),
            StatusEvent::NoDevice { pattern } => format!("No device found ({pattern})"),
            StatusEvent::ConnectionLost { port, reason } => {
                format!("Connection to {port} lost: {reason}")
            }
            StatusEvent::RecordingStarted => "Recording".into(),
            StatusEvent::AlreadyRecording => "Already recording".into(),
            StatusEvent::NotRecording => "Not recording".into(),
            StatusEvent::NothingRecorded => "Nothing recorded".into(),
            StatusEvent::RecordingSaved { path, .. } => format!("Saved {}", path.display()),
            StatusEvent::RecordingSaveFailed { reason, .. } => {
                format!("Could not save recording: {reason}")
            }
            StatusEvent::Playing { samples } => format!("Playing {samples} samples"),
            StatusEvent::NothingToPlay => "Nothing to play".into(),
            StatusEvent::PlaybackFailed { reason } => format!("Playback failed: {reason}"),
        }
    }

    /// Whether the event reports a failure rather than an expected state.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StatusEvent::ConnectionLost { .. }
                | StatusEvent::RecordingSaveFailed { .. }
                | StatusEvent::PlaybackFailed { .. }
        )
    }
}

pub type StatusSender = mpsc::UnboundedSender<StatusEvent>;
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusEvent>;

pub fn status_channel() -> (StatusSender, StatusReceiver) {
    mpsc::unbounded_channel()
}

/// Send `event`, logging it.  A closed channel only means nobody is
/// listening.
pub(crate) fn emit(tx: &StatusSender, event: StatusEvent) {
    if event.is_error() {
        log::warn!("status: {}", event.message());
    } else {
        log::info!("status: {}", event.message());
    }
    let _ = tx.send(event);
}

// ---------------------------------------------------------------------------
// ControlState
// ---------------------------------------------------------------------------

pub const PITCH_MIN: f32 = 0.5;
pub const PITCH_MAX: f32 = 2.0;
pub const NEUTRAL_PITCH: f32 = 1.0;
pub const NEUTRAL_REVERB: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub pitch: f32,
    pub reverb: f32,
}

impl ControlState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            pitch: NEUTRAL_PITCH,
            reverb: NEUTRAL_REVERB,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_flagged() {
        assert!(StatusEvent::ConnectionLost {
            port: "p".into(),
            reason: "r".into()
        }
        .is_error());
        assert!(!StatusEvent::NothingToPlay.is_error());
        assert!(!StatusEvent::NotRecording.is_error());
    }

    #[test]
    fn messages() {
        assert_eq!(StatusEvent::NothingToPlay.message(), "Nothing to play");
        assert_eq!(
            StatusEvent::Connected {
                port: "/dev/ttyACM0".into()
            }
            .message(),
            "Connected to /dev/ttyACM0"
        );
    }

    #[test]
    fn control_state_defaults_to_neutral() {
        let mut c = ControlState::default();
        assert_eq!(c.pitch, 1.0);
        assert_eq!(c.reverb, 0.0);
        c.pitch = 2.0;
        c.reverb = 0.7;
        c.reset();
        assert_eq!(c, ControlState::default());
    }

    #[test]
    fn emit_survives_closed_channel() {
        let (tx, rx) = status_channel();
        drop(rx);
        emit(&tx, StatusEvent::RecordingStarted);
    }

    #[test]
    fn sender_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StatusSender>();
    }
}
