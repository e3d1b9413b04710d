//! Ingestion loop — device bytes → rolling window + active recording.
//!
//! [`IngestionLoop`] owns the stream decoder and drives one bounded unit of
//! work per tick:
//!
//! ```text
//! tick
//!   └─▶ link.poll_read()           (non-blocking)
//!         ├─ Ok(empty)  → Idle
//!         ├─ Ok(bytes)  → decode → buffer.push → session.ingest   [Ingested]
//!         └─ Err        → reset decoder, emit ConnectionLost      [LinkLost]
//! ```
//!
//! It never connects or reconnects; that is an administrative action on the
//! [`Controller`](super::Controller).  When the link generation changes
//! (a reconnect happened) any half sample held by the decoder is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::audio::{PcmDecoder, SharedSampleBuffer};
use crate::device::{DeviceError, DeviceLink};
use crate::recording::SharedSession;

use super::state::{emit, StatusEvent, StatusSender};

// ---------------------------------------------------------------------------
// SharedLink
// ---------------------------------------------------------------------------

/// The device link shared by the ingestion task (reads) and the controller
/// (writes, reconnects).
pub type SharedLink = Arc<Mutex<DeviceLink>>;

pub(crate) fn lock_link(link: &SharedLink) -> MutexGuard<'_, DeviceLink> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn connection_lost(err: &DeviceError) -> StatusEvent {
    match err {
        DeviceError::ConnectionLost { port, source } => StatusEvent::ConnectionLost {
            port: port.clone(),
            reason: source.to_string(),
        },
        other => StatusEvent::ConnectionLost {
            port: String::new(),
            reason: other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// TickOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No complete sample arrived (no data, no link, or a lone odd byte).
    Idle,
    /// `samples` new samples entered the window.
    Ingested { samples: usize },
    /// The link failed during this tick.
    LinkLost,
}

// ---------------------------------------------------------------------------
// IngestionLoop
// ---------------------------------------------------------------------------

pub struct IngestionLoop {
    link: SharedLink,
    buffer: SharedSampleBuffer,
    session: SharedSession,
    decoder: PcmDecoder,
    generation: u64,
    status: StatusSender,
}

impl IngestionLoop {
    pub fn new(
        link: SharedLink,
        buffer: SharedSampleBuffer,
        session: SharedSession,
        decoder: PcmDecoder,
        status: StatusSender,
    ) -> Self {
        let generation = lock_link(&link).generation();
        Self {
            link,
            buffer,
            session,
            decoder,
            generation,
            status,
        }
    }

    /// One poll of the device.
    pub fn tick(&mut self) -> TickOutcome {
        let (read, generation) = {
            let mut link = lock_link(&self.link);
            (link.poll_read(), link.generation())
        };

        if generation != self.generation {
            self.decoder.reset();
            self.generation = generation;
        }

        match read {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return TickOutcome::Idle;
                }
                let samples = self.decoder.decode(&bytes);
                if samples.is_empty() {
                    return TickOutcome::Idle;
                }
                self.buffer.push(&samples);
                self.session.ingest(&samples);
                log::trace!("ingest: {} bytes → {} samples", bytes.len(), samples.len());
                TickOutcome::Ingested {
                    samples: samples.len(),
                }
            }
            Err(e) => {
                self.decoder.reset();
                emit(&self.status, connection_lost(&e));
                TickOutcome::LinkLost
            }
        }
    }

    /// Tick every `period` until `shutdown` turns `true` or its sender is
    /// dropped.  Late ticks are skipped rather than bunched up.
    pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!("ingest: polling every {} ms", period.as_millis());
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        log::info!("ingest: stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
