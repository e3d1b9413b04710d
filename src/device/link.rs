//! Ownership of the serial connection to the device.
//!
//! [`DeviceLink`] holds at most one open [`Connection`].  Reads are polled
//! without blocking; writes are bounded by the port's timeout.  Any I/O
//! failure drops the handle immediately, so the next `send` is a silent
//! no-op and the next `poll_read` returns nothing until an explicit
//! reconnect.
//!
//! ```text
//! Disconnected ──connect ok──▶ Connected ──io error──▶ Faulted
//!      ▲                                                  │
//!      └──────────────── connect / disconnect ◀───────────┘
//! ```
//!
//! `Faulted` carries the failure reason for the status line but behaves
//! exactly like `Disconnected`.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use serialport::SerialPort;
use thiserror::Error;

use super::command::Command;
use crate::config::DeviceConfig;

// ---------------------------------------------------------------------------
// DeviceError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("connection to {port} lost: {source}")]
    ConnectionLost {
        port: String,
        #[source]
        source: io::Error,
    },
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// The operations the link needs from an open port.
pub trait Connection: Send {
    /// Bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `bytes` completely and flush.
    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl Connection for Box<dyn SerialPort> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }
}

// ---------------------------------------------------------------------------
// PortOpener
// ---------------------------------------------------------------------------

/// Opens a named port.  Injected so the link can be tested without hardware.
pub trait PortOpener: Send + Sync {
    fn open(&self, port: &str) -> Result<Box<dyn Connection>, DeviceError>;
}

/// Opens real serial ports with `serialport`.
#[derive(Debug, Clone)]
pub struct SerialOpener {
    baud_rate: u32,
    timeout: Duration,
}

impl SerialOpener {
    pub fn new(baud_rate: u32, timeout: Duration) -> Self {
        Self { baud_rate, timeout }
    }

    pub fn from_config(config: &DeviceConfig) -> Self {
        Self::new(config.baud_rate, config.write_timeout())
    }
}

impl PortOpener for SerialOpener {
    fn open(&self, port: &str) -> Result<Box<dyn Connection>, DeviceError> {
        let handle = serialport::new(port, self.baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|source| DeviceError::Open {
                port: port.to_string(),
                source,
            })?;
        Ok(Box::new(handle))
    }
}

// ---------------------------------------------------------------------------
// LinkState / LinkStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected { port: String },
    /// The last connection failed; no handle is held.
    Faulted { port: String, reason: String },
}

/// What the presentation shell needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    Disconnected,
}

impl LinkStatus {
    pub fn label(self) -> &'static str {
        match self {
            LinkStatus::Connected => "Connected",
            LinkStatus::Disconnected => "Disconnected",
        }
    }
}

/// Result of a [`DeviceLink::send`] that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No connection; nothing was written.
    Skipped,
}

// ---------------------------------------------------------------------------
// DeviceLink
// ---------------------------------------------------------------------------

pub struct DeviceLink {
    opener: Arc<dyn PortOpener>,
    conn: Option<Box<dyn Connection>>,
    state: LinkState,
    /// Bumped on every successful connect so stream consumers can tell a
    /// fresh byte stream from a continuing one.
    generation: u64,
    read_buf: Vec<u8>,
}

impl DeviceLink {
    pub fn new(opener: Box<dyn PortOpener>, max_read_bytes: usize) -> Self {
        Self {
            opener: Arc::from(opener),
            conn: None,
            state: LinkState::Disconnected,
            generation: 0,
            read_buf: vec![0; max_read_bytes.max(2)],
        }
    }

    pub fn from_config(config: &DeviceConfig) -> Self {
        Self::new(
            Box::new(SerialOpener::from_config(config)),
            config.max_read_bytes,
        )
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn status(&self) -> LinkStatus {
        match self.state {
            LinkState::Connected { .. } => LinkStatus::Connected,
            _ => LinkStatus::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status() == LinkStatus::Connected
    }

    pub fn port(&self) -> Option<&str> {
        match &self.state {
            LinkState::Connected { port } => Some(port),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Handle to the opener, for callers that open ports without holding
    /// the link (see [`adopt`](Self::adopt)).
    pub fn opener(&self) -> Arc<dyn PortOpener> {
        Arc::clone(&self.opener)
    }

    /// Open exactly `port`, replacing any current connection on success.
    pub fn connect(&mut self, port: &str) -> Result<(), DeviceError> {
        let conn = self.opener.open(port)?;
        self.adopt(port, conn);
        Ok(())
    }

    /// Take ownership of an already opened `conn` to `port`, replacing any
    /// current connection.
    pub fn adopt(&mut self, port: &str, conn: Box<dyn Connection>) {
        self.conn = Some(conn);
        self.state = LinkState::Connected {
            port: port.to_string(),
        };
        self.generation += 1;
        log::info!("device: connected to {port}");
    }

    pub fn disconnect(&mut self) {
        if self.conn.take().is_some() {
            log::info!("device: disconnected");
        }
        self.state = LinkState::Disconnected;
    }

    /// Write `bytes` and flush.
    ///
    /// Without a connection this is a silent no-op returning
    /// [`Delivery::Skipped`].  A write failure drops the connection and is
    /// returned once; later calls are skipped.
    pub fn send(&mut self, bytes: &[u8]) -> Result<Delivery, DeviceError> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(Delivery::Skipped);
        };
        match conn.write_line(bytes) {
            Ok(()) => Ok(Delivery::Sent),
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Encode and [`send`](Self::send) `command`.  A non-finite argument is
    /// never written; the command is skipped instead.
    pub fn send_command(&mut self, command: &Command) -> Result<Delivery, DeviceError> {
        if !command.is_finite() {
            log::warn!("device: dropping {} with non-finite argument", command.verb);
            return Ok(Delivery::Skipped);
        }
        let line = command.encode();
        log::debug!("device: → {}", line.trim_end());
        self.send(line.as_bytes())
    }

    /// Return whatever bytes are available right now, possibly none.
    ///
    /// `Ok` with an empty vector means "no data yet" (or no connection);
    /// `Err` means the link just failed and is now disconnected.
    pub fn poll_read(&mut self) -> Result<Vec<u8>, DeviceError> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(Vec::new());
        };

        let available = match conn.bytes_available() {
            Ok(n) => n,
            Err(e) => return Err(self.fault(e)),
        };
        if available == 0 {
            return Ok(Vec::new());
        }

        let want = available.min(self.read_buf.len());
        match conn.read(&mut self.read_buf[..want]) {
            Ok(n) => Ok(self.read_buf[..n].to_vec()),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(self.fault(e)),
        }
    }

    fn fault(&mut self, source: io::Error) -> DeviceError {
        self.conn = None;
        let port = match std::mem::replace(&mut self.state, LinkState::Disconnected) {
            LinkState::Connected { port } | LinkState::Faulted { port, .. } => port,
            LinkState::Disconnected => String::new(),
        };
        log::warn!("device: connection to {port} lost: {source}");
        self.state = LinkState::Faulted {
            port: port.clone(),
            reason: source.to_string(),
        };
        DeviceError::ConnectionLost { port, source }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{MockDevice, MockOpener};

    fn link_with(device: &MockDevice, ports: &[&str]) -> DeviceLink {
        DeviceLink::new(Box::new(MockOpener::new(device.clone(), ports)), 1_024)
    }

    #[test]
    fn starts_disconnected() {
        let device = MockDevice::new();
        let link = link_with(&device, &["/dev/ttyACM0"]);
        assert_eq!(link.status(), LinkStatus::Disconnected);
        assert_eq!(link.generation(), 0);
    }

    #[test]
    fn send_while_disconnected_is_silent_noop() {
        let device = MockDevice::new();
        let mut link = link_with(&device, &["/dev/ttyACM0"]);

        let result = link.send(b"PITCH 1.00\n");
        assert!(matches!(result, Ok(Delivery::Skipped)));
        assert!(device.written().is_empty());
    }

    #[test]
    fn poll_read_while_disconnected_is_empty() {
        let device = MockDevice::new();
        device.feed(&[1, 2, 3]);
        let mut link = link_with(&device, &[]);
        assert!(link.poll_read().unwrap().is_empty());
    }

    #[test]
    fn send_writes_encoded_command() {
        let device = MockDevice::new();
        let mut link = link_with(&device, &["/dev/ttyACM0"]);
        link.connect("/dev/ttyACM0").unwrap();

        let delivery = link.send_command(&Command::pitch(0.5)).unwrap();
        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(device.written(), b"PITCH 0.50\n".to_vec());
    }

    #[test]
    fn non_finite_command_is_never_written() {
        let device = MockDevice::new();
        let mut link = link_with(&device, &["/dev/ttyACM0"]);
        link.connect("/dev/ttyACM0").unwrap();

        let delivery = link.send_command(&Command::pitch(f32::NAN)).unwrap();
        assert_eq!(delivery, Delivery::Skipped);
        assert!(device.written().is_empty());
        assert!(link.is_connected());
    }

    #[test]
    fn write_failure_faults_once_then_skips() {
        let device = MockDevice::new();
        let mut link = link_with(&device, &["/dev/ttyACM0"]);
        link.connect("/dev/ttyACM0").unwrap();
        device.fail_writes();

        let first = link.send(b"RESET\n");
        assert!(matches!(first, Err(DeviceError::ConnectionLost { .. })));
        assert_eq!(link.status(), LinkStatus::Disconnected);
        assert!(matches!(link.state(), LinkState::Faulted { .. }));

        let second = link.send(b"RESET\n");
        assert!(matches!(second, Ok(Delivery::Skipped)));
    }

    #[test]
    fn poll_read_returns_available_bytes() {
        let device = MockDevice::new();
        let mut link = link_with(&device, &["/dev/ttyACM0"]);
        link.connect("/dev/ttyACM0").unwrap();

        assert!(link.poll_read().unwrap().is_empty());
        device.feed(&[0x00, 0x7F, 0x01]);
        assert_eq!(link.poll_read().unwrap(), vec![0x00, 0x7F, 0x01]);
        assert!(link.poll_read().unwrap().is_empty());
    }

    #[test]
    fn poll_read_is_bounded_by_read_size() {
        let device = MockDevice::new();
        let mut link = DeviceLink::new(Box::new(MockOpener::new(device.clone(), &["p"])), 4);
        link.connect("p").unwrap();

        device.feed(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(link.poll_read().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(link.poll_read().unwrap(), vec![5, 6]);
    }

    #[test]
    fn read_failure_faults_link() {
        let device = MockDevice::new();
        let mut link = link_with(&device, &["/dev/ttyACM0"]);
        link.connect("/dev/ttyACM0").unwrap();
        device.fail_reads();

        assert!(link.poll_read().is_err());
        assert!(!link.is_connected());
        assert!(link.poll_read().unwrap().is_empty());
    }

    #[test]
    fn adopt_uses_connection_opened_elsewhere() {
        let device = MockDevice::new();
        let mut link = link_with(&device, &["/dev/ttyACM0"]);

        let conn = link.opener().open("/dev/ttyACM0").unwrap();
        link.adopt("/dev/ttyACM0", conn);

        assert_eq!(link.port(), Some("/dev/ttyACM0"));
        assert_eq!(link.generation(), 1);
        link.send(b"RESET\n").unwrap();
        assert_eq!(device.written_lines(), vec!["RESET"]);
    }

    #[test]
    fn reconnect_after_fault_bumps_generation() {
        let device = MockDevice::new();
        let mut link = link_with(&device, &["/dev/ttyACM0"]);
        link.connect("/dev/ttyACM0").unwrap();
        device.fail_writes();
        let _ = link.send(b"x");

        device.heal();
        link.connect("/dev/ttyACM0").unwrap();
        assert_eq!(link.generation(), 2);
        assert!(link.is_connected());
    }

    #[test]
    fn failed_connect_leaves_link_disconnected() {
        let device = MockDevice::new();
        let mut link = link_with(&device, &[]);
        let err = link.connect("COM3").unwrap_err();
        assert!(matches!(err, DeviceError::Open { .. }));
        assert_eq!(link.status(), LinkStatus::Disconnected);
        assert_eq!(link.generation(), 0);
    }
}
