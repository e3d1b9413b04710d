//! Serial port discovery.
//!
//! The link never hard-codes OS detection; it asks a [`PortEnumerator`] for
//! candidates.  [`GlobPorts`] is the production implementation and expands a
//! filesystem glob (`/dev/ttyACM*`, `/dev/tty.usbmodem*`).  On Windows,
//! where `COM*` ports are not files, it falls back to the port list reported
//! by `serialport` filtered through the same pattern.

use glob::Pattern;

/// Source of candidate port names, tried in the order returned.
pub trait PortEnumerator: Send + Sync {
    /// Zero or more port names.  Enumeration failures yield an empty list.
    fn candidates(&self) -> Vec<String>;
}

impl<F> PortEnumerator for F
where
    F: Fn() -> Vec<String> + Send + Sync,
{
    fn candidates(&self) -> Vec<String> {
        self()
    }
}

// ---------------------------------------------------------------------------
// GlobPorts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GlobPorts {
    pattern: String,
}

impl GlobPorts {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    fn from_filesystem(&self) -> Vec<String> {
        match glob::glob(&self.pattern) {
            Ok(paths) => paths
                .filter_map(|entry| entry.ok())
                .map(|path| path.to_string_lossy().into_owned())
                .collect(),
            Err(e) => {
                log::warn!("discovery: invalid port pattern {:?}: {e}", self.pattern);
                Vec::new()
            }
        }
    }

    fn from_serialport(&self) -> Vec<String> {
        let pattern = match Pattern::new(&self.pattern) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("discovery: invalid port pattern {:?}: {e}", self.pattern);
                return Vec::new();
            }
        };
        match serialport::available_ports() {
            Ok(ports) => ports
                .into_iter()
                .map(|p| p.port_name)
                .filter(|name| pattern.matches(name))
                .collect(),
            Err(e) => {
                log::warn!("discovery: port enumeration failed: {e}");
                Vec::new()
            }
        }
    }
}

impl PortEnumerator for GlobPorts {
    fn candidates(&self) -> Vec<String> {
        let mut ports = self.from_filesystem();
        if ports.is_empty() && cfg!(target_os = "windows") {
            ports = self.from_serialport();
        }
        ports.sort();
        log::debug!("discovery: {:?} → {:?}", self.pattern, ports);
        ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn closures_are_enumerators() {
        let fixed = || vec!["/dev/ttyACM0".to_string()];
        assert_eq!(fixed.candidates(), vec!["/dev/ttyACM0"]);
    }

    #[test]
    fn glob_lists_matching_files_sorted() {
        let dir = tempdir().expect("temp dir");
        for name in ["ttyACM1", "ttyACM0", "ttyS0"] {
            std::fs::write(dir.path().join(name), b"").expect("touch");
        }

        let pattern = format!("{}/ttyACM*", dir.path().display());
        let ports = GlobPorts::new(pattern).candidates();

        assert_eq!(ports.len(), 2);
        assert!(ports[0].ends_with("ttyACM0"));
        assert!(ports[1].ends_with("ttyACM1"));
    }

    #[test]
    fn no_match_is_empty() {
        let dir = tempdir().expect("temp dir");
        let pattern = format!("{}/tty.usbmodem*", dir.path().display());
        assert!(GlobPorts::new(pattern).candidates().is_empty());
    }

    #[test]
    fn invalid_pattern_is_empty_not_error() {
        assert!(GlobPorts::new("[").candidates().is_empty());
    }
}
