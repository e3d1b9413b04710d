//! Host-side core for a serial pitch/reverb voice effect device.
//!
//! The device streams raw 16-bit PCM over a serial link and accepts
//! one-line text commands.  This crate keeps a fixed-length rolling window
//! of that stream, derives display features from it, records and replays
//! captures, and relays parameter changes back to the device.

pub mod audio;
pub mod config;
pub mod device;
pub mod pipeline;
pub mod recording;
