//! Persistence of finished captures as WAV files.
//!
//! [`WavStore`] writes mono 16-bit PCM with `hound`, naming each file
//! `<prefix>_<YYYYmmdd_HHMMSS_mmm>.wav`.  If that name is already taken a
//! numeric suffix is appended, so two captures never share a file.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot create recordings directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

/// Destination for finalized captures.
pub trait CaptureStore: Send + Sync {
    /// Persist `samples` and return where they went.
    fn persist(&self, samples: &[i16]) -> Result<PathBuf, StorageError>;
}

// ---------------------------------------------------------------------------
// WavStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WavStore {
    dir: PathBuf,
    prefix: String,
    sample_rate: u32,
}

impl WavStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            sample_rate,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.recording.output_dir(),
            config.recording.file_prefix.clone(),
            config.audio.sample_rate,
        )
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    /// First free `<prefix>_<timestamp>[_n].wav` in the output directory.
    fn next_path(&self) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let base = format!("{}_{}", self.prefix, timestamp);

        let mut path = self.dir.join(format!("{base}.wav"));
        let mut n = 2;
        while path.exists() {
            path = self.dir.join(format!("{base}_{n}.wav"));
            n += 1;
        }
        path
    }

    fn write(&self, path: &Path, samples: &[i16]) -> Result<(), hound::Error> {
        let mut writer = WavWriter::create(path, self.spec())?;
        for &s in samples {
            writer.write_sample(s)?;
        }
        writer.finalize()
    }
}

impl CaptureStore for WavStore {
    fn persist(&self, samples: &[i16]) -> Result<PathBuf, StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.next_path();
        write_or_discard(&path, |p| self.write(p, samples)).map_err(|source| {
            StorageError::Write {
                path: path.clone(),
                source,
            }
        })?;

        log::info!("recording: wrote {} samples to {}", samples.len(), path.display());
        Ok(path)
    }
}

/// Run `write` against `path`; if it fails, remove whatever it left there
/// so a failed save never leaves a truncated file behind.
fn write_or_discard<F>(path: &Path, write: F) -> Result<(), hound::Error>
where
    F: FnOnce(&Path) -> Result<(), hound::Error>,
{
    let result = write(path);
    if result.is_err() && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("recording: could not remove partial {}: {e}", path.display());
        }
    }
    result
}

// ---------------------------------------------------------------------------
// MockStore  (test-only)
// ---------------------------------------------------------------------------

/// Keeps persisted captures in memory, or fails every write.
#[cfg(test)]
#[derive(Default)]
pub struct MockStore {
    pub saved: std::sync::Mutex<Vec<Vec<i16>>>,
    pub fail: bool,
}

#[cfg(test)]
impl MockStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<Vec<i16>> {
        self.saved.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl CaptureStore for MockStore {
    fn persist(&self, samples: &[i16]) -> Result<PathBuf, StorageError> {
        if self.fail {
            return Err(StorageError::CreateDir {
                path: PathBuf::from("/nonexistent"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        let mut saved = self.saved.lock().unwrap();
        saved.push(samples.to_vec());
        Ok(PathBuf::from(format!("mock_{}.wav", saved.len())))
    }
}
