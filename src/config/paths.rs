//! Where settings and recordings live on disk.
//!
//! | Platform | `settings.toml`                                   | recordings                                   |
//! |----------|---------------------------------------------------|----------------------------------------------|
//! | Linux    | `~/.config/pitch-relay/`                          | `~/.local/share/pitch-relay/recordings/`     |
//! | macOS    | `~/Library/Application Support/pitch-relay/`      | same directory, `recordings/`                |
//! | Windows  | `%APPDATA%\pitch-relay\`                          | `%LOCALAPPDATA%\pitch-relay\recordings\`     |
//!
//! Setting `PITCH_RELAY_HOME` puts both under one directory instead, which
//! is handy for portable installs and for running several hosts side by side.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the platform directories.
pub const HOME_ENV: &str = "PITCH_RELAY_HOME";

const APP_DIR: &str = "pitch-relay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    /// Default target of [`WavStore`](crate::recording::WavStore).
    pub recordings_dir: PathBuf,
}

impl AppPaths {
    /// `PITCH_RELAY_HOME` if set, otherwise the platform directories.
    /// Missing platform directories fall back to the working directory.
    pub fn new() -> Self {
        match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => Self::under(Path::new(&home)),
            _ => Self::platform(),
        }
    }

    /// Everything below a single `root`.
    pub fn under(root: &Path) -> Self {
        Self::layout(root.to_path_buf(), root.to_path_buf())
    }

    fn platform() -> Self {
        let config_root = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_root = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::layout(config_root.join(APP_DIR), data_root.join(APP_DIR))
    }

    fn layout(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            settings_file: config_dir.join("settings.toml"),
            recordings_dir: data_dir.join("recordings"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_layout_is_namespaced() {
        let paths = AppPaths::platform();
        assert!(paths.config_dir.ends_with(APP_DIR));
        assert_eq!(paths.settings_file, paths.config_dir.join("settings.toml"));
        assert!(paths.recordings_dir.ends_with(Path::new(APP_DIR).join("recordings")));
    }

    #[test]
    fn under_root_keeps_everything_together() {
        let root = Path::new("/tmp/relay-home");
        let paths = AppPaths::under(root);
        assert_eq!(paths.config_dir, root);
        assert_eq!(paths.settings_file, root.join("settings.toml"));
        assert_eq!(paths.recordings_dir, root.join("recordings"));
    }
}
