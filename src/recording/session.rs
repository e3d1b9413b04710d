//! Recording state machine.
//!
//! ```text
//! Idle ──start──▶ Recording ──stop──▶ Idle
//!                     │
//!                  ingest (copies chunks)
//! ```
//!
//! `stop` concatenates the chunks into the *last capture*, which survives
//! until the next non-empty recording replaces it.  Calls that do not fit the
//! current state are no-ops and say so in their return value.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

impl RecordingState {
    pub fn label(&self) -> &'static str {
        match self {
            RecordingState::Idle => "Idle",
            RecordingState::Recording => "Recording",
        }
    }
}

/// What [`RecordingSession::stop`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Chunks were concatenated into a new last capture.
    Finalized(Arc<[i16]>),
    /// Recording ended with nothing captured; the previous capture is kept.
    Empty,
    /// Not recording; nothing changed.
    NotRecording,
}

#[derive(Debug, Default)]
pub struct RecordingSession {
    state: RecordingState,
    chunks: Vec<Vec<i16>>,
    last_capture: Option<Arc<[i16]>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Enter `Recording` with an empty chunk list.  Returns `false` (and
    /// changes nothing) when already recording.
    pub fn start(&mut self) -> bool {
        if self.is_recording() {
            return false;
        }
        self.chunks.clear();
        self.state = RecordingState::Recording;
        true
    }

    /// Copy `chunk` into the session while recording.  Returns whether it
    /// was kept.
    pub fn ingest(&mut self, chunk: &[i16]) -> bool {
        if !self.is_recording() || chunk.is_empty() {
            return false;
        }
        self.chunks.push(chunk.to_vec());
        true
    }

    /// Leave `Recording`, concatenating the chunks in arrival order.
    pub fn stop(&mut self) -> StopOutcome {
        if !self.is_recording() {
            return StopOutcome::NotRecording;
        }
        self.state = RecordingState::Idle;

        if self.chunks.is_empty() {
            return StopOutcome::Empty;
        }

        let capture: Arc<[i16]> = Arc::from(self.chunks.concat());
        self.chunks.clear();
        self.last_capture = Some(Arc::clone(&capture));
        StopOutcome::Finalized(capture)
    }

    /// The most recent finalized capture, if any.
    pub fn last_capture(&self) -> Option<Arc<[i16]>> {
        self.last_capture.clone()
    }

    /// Samples accumulated in the current recording.
    pub fn pending_samples(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// SharedSession
// ---------------------------------------------------------------------------

/// Thread-safe handle shared by the ingestion tick and the controller.
#[derive(Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<RecordingSession>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, RecordingSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ingest(&self, chunk: &[i16]) -> bool {
        self.lock().ingest(chunk)
    }

    pub fn is_recording(&self) -> bool {
        self.lock().is_recording()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_without_capture() {
        let s = RecordingSession::new();
        assert_eq!(s.state(), RecordingState::Idle);
        assert!(s.last_capture().is_none());
    }

    #[test]
    fn chunks_concatenate_in_order() {
        let mut s = RecordingSession::new();
        assert!(s.start());
        assert!(s.ingest(&[1, 2]));
        assert!(s.ingest(&[3, 4, 5]));
        assert_eq!(s.pending_samples(), 5);

        match s.stop() {
            StopOutcome::Finalized(c) => assert_eq!(&*c, &[1, 2, 3, 4, 5]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(s.pending_samples(), 0);
        assert_eq!(s.last_capture().as_deref(), Some(&[1, 2, 3, 4, 5][..]));
    }

    #[test]
    fn ingest_while_idle_is_ignored() {
        let mut s = RecordingSession::new();
        assert!(!s.ingest(&[1, 2, 3]));
        s.start();
        assert_eq!(s.pending_samples(), 0);
    }

    #[test]
    fn second_stop_is_noop_and_keeps_capture() {
        let mut s = RecordingSession::new();
        s.start();
        s.ingest(&[7, 8]);
        s.stop();

        assert_eq!(s.stop(), StopOutcome::NotRecording);
        assert_eq!(s.last_capture().as_deref(), Some(&[7, 8][..]));
    }

    #[test]
    fn empty_recording_keeps_previous_capture() {
        let mut s = RecordingSession::new();
        s.start();
        s.ingest(&[1]);
        s.stop();

        s.start();
        assert_eq!(s.stop(), StopOutcome::Empty);
        assert_eq!(s.last_capture().as_deref(), Some(&[1][..]));
        assert!(!s.is_recording());
    }

    #[test]
    fn start_while_recording_is_noop() {
        let mut s = RecordingSession::new();
        s.start();
        s.ingest(&[1, 2]);
        assert!(!s.start());
        assert_eq!(s.pending_samples(), 2);
    }

    #[test]
    fn restart_clears_previous_chunks() {
        let mut s = RecordingSession::new();
        s.start();
        s.ingest(&[1, 2]);
        s.stop();
        s.start();
        s.ingest(&[3]);
        match s.stop() {
            StopOutcome::Finalized(c) => assert_eq!(&*c, &[3]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ingest_copies_caller_data() {
        let mut s = RecordingSession::new();
        s.start();
        let mut chunk = vec![1i16, 2, 3];
        s.ingest(&chunk);
        chunk.iter_mut().for_each(|v| *v = 0);
        match s.stop() {
            StopOutcome::Finalized(c) => assert_eq!(&*c, &[1, 2, 3]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
