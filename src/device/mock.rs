//! In-memory stand-ins for a serial device (test-only).
//!
//! [`MockDevice`] is a cloneable handle to the far end of the wire: tests
//! feed inbound bytes, inspect written lines and inject I/O failures.
//! [`MockOpener`] hands out connections to it for an allow-list of port
//! names.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use super::link::{Connection, DeviceError, PortOpener};

#[derive(Default)]
struct DeviceState {
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    fail_writes: bool,
    fail_reads: bool,
}

#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self, bytes: &[u8]) {
        self.state.lock().unwrap().inbound.extend(bytes.iter().copied());
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written())
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    pub fn fail_reads(&self) {
        self.state.lock().unwrap().fail_reads = true;
    }

    pub fn heal(&self) {
        let mut st = self.state.lock().unwrap();
        st.fail_writes = false;
        st.fail_reads = false;
    }
}

struct MockConnection {
    device: MockDevice,
}

impl Connection for MockConnection {
    fn bytes_available(&mut self) -> io::Result<usize> {
        let st = self.device.state.lock().unwrap();
        if st.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        Ok(st.inbound.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut st = self.device.state.lock().unwrap();
        let n = buf.len().min(st.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = st.inbound.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut st = self.device.state.lock().unwrap();
        if st.fail_writes {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out"));
        }
        st.written.extend_from_slice(bytes);
        Ok(())
    }
}

pub struct MockOpener {
    device: MockDevice,
    openable: Vec<String>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl MockOpener {
    pub fn new(device: MockDevice, openable: &[&str]) -> Self {
        Self {
            device,
            openable: openable.iter().map(|s| s.to_string()).collect(),
            attempts: Arc::default(),
        }
    }

    /// Every port name `open` was called with, in order.
    pub fn attempts_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.attempts)
    }
}

impl PortOpener for MockOpener {
    fn open(&self, port: &str) -> Result<Box<dyn Connection>, DeviceError> {
        self.attempts.lock().unwrap().push(port.to_string());
        if !self.openable.iter().any(|p| p == port) {
            return Err(DeviceError::Open {
                port: port.to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "not present"),
            });
        }
        Ok(Box::new(MockConnection {
            device: self.device.clone(),
        }))
    }
}
