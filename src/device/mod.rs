//! Device side of the core — port discovery, the serial link and the
//! outbound command protocol.
//!
//! ```text
//! PortEnumerator ──candidates──▶ DeviceLink ──poll_read──▶ raw PCM bytes
//!                                    ▲
//!        Command::encode ──line──────┘ send
//! ```

pub mod command;
pub mod discovery;
pub mod link;

#[cfg(test)]
pub mod mock;

pub use command::{encode, Command, Preset, UnknownPreset, Verb};
pub use discovery::{GlobPorts, PortEnumerator};
pub use link::{
    Connection, Delivery, DeviceError, DeviceLink, LinkState, LinkStatus, PortOpener,
    SerialOpener,
};
