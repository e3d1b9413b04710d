//! Runtime wiring of the core: the ingestion loop, the collaborator surface
//! and the status channel between them and the presentation shell.
//!
//! # Architecture
//!
//! ```text
//!             ingest tick (10 ms)                 feature tick (50 ms)
//!                    │                                    │
//!                    ▼                                    ▼
//! DeviceLink ──▶ IngestionLoop ──push──▶ SharedSampleBuffer ◀──snapshot── Controller
//!     ▲                 └──ingest──▶ SharedSession ◀──start/stop/play──────┘  │
//!     └──────────────────────── send / reconnect ─────────────────────────────┘
//!
//! StatusEvent (mpsc) ──▶ shell
//! ```
//!
//! The two ticks share state only through short critical sections; neither
//! holds a lock while computing.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pitch_relay::config::AppConfig;
//! use pitch_relay::pipeline::{status_channel, Collaborators, Controller};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let (status_tx, mut status_rx) = status_channel();
//!     let (controller, ingest) =
//!         Controller::assemble(&config, Collaborators::system(&config), status_tx);
//!
//!     controller.reconnect();
//!
//!     let (_stop_tx, stop_rx) = watch::channel(false);
//!     tokio::spawn(ingest.run(config.timing.ingest_tick(), stop_rx));
//!
//!     while let Some(event) = status_rx.recv().await {
//!         println!("{}", event.message());
//!     }
//! }
//! ```

pub mod controller;
pub mod ingest;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{offload, Collaborators, Controller};
pub use ingest::{IngestionLoop, SharedLink, TickOutcome};
pub use state::{
    status_channel, ControlState, StatusEvent, StatusReceiver, StatusSender, NEUTRAL_PITCH,
    NEUTRAL_REVERB, PITCH_MAX, PITCH_MIN,
};
