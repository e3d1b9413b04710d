//! Recording of the live stream into discrete captures.
//!
//! [`RecordingSession`] is the in-memory state machine fed by the ingestion
//! loop; [`CaptureStore`] is where finished captures go (WAV files by
//! default).

pub mod session;
pub mod storage;

pub use session::{RecordingSession, RecordingState, SharedSession, StopOutcome};
pub use storage::{CaptureStore, StorageError, WavStore};

#[cfg(test)]
pub use storage::MockStore;
