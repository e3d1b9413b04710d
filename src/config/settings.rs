//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every field carries `#[serde(default)]` at the struct level, so a partial
//! `settings.toml` only overrides what it names.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ByteOrder
// ---------------------------------------------------------------------------

/// Byte order of the 16-bit PCM samples streamed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Low byte first (ARM microcontrollers, the default).
    Little,
    /// High byte first.
    Big,
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::Little
    }
}

// ---------------------------------------------------------------------------
// LevelMeter
// ---------------------------------------------------------------------------

/// Selects how the input level scalar is computed.
///
/// | Variant | Formula                          |
/// |---------|----------------------------------|
/// | Peak    | `max(|s|) / 32768`               |
/// | Mean    | `mean(|s|) / 32768` (legacy VU)  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelMeter {
    /// Peak detection over the waveform window.
    Peak,
    /// Mean absolute amplitude over the waveform window.
    Mean,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::Peak
    }
}

// ---------------------------------------------------------------------------
// DeviceConfig
// ---------------------------------------------------------------------------

/// Serial link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Baud rate the device firmware opens its serial port with.
    pub baud_rate: u32,
    /// Glob pattern used for port discovery.  `None` selects the platform
    /// default (see [`DeviceConfig::default_port_pattern`]).
    pub port_pattern: Option<String>,
    /// Upper bound on a single command write, in milliseconds.
    pub write_timeout_ms: u64,
    /// Maximum number of bytes pulled from the port in one poll.
    pub max_read_bytes: usize,
}

impl DeviceConfig {
    /// Platform glob for USB serial devices.
    pub fn default_port_pattern() -> &'static str {
        if cfg!(target_os = "windows") {
            "COM*"
        } else if cfg!(target_os = "macos") {
            "/dev/tty.usbmodem*"
        } else {
            "/dev/ttyACM*"
        }
    }

    /// The pattern in effect: the configured one or the platform default.
    pub fn port_pattern(&self) -> String {
        self.port_pattern
            .clone()
            .unwrap_or_else(|| Self::default_port_pattern().to_string())
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            baud_rate: 921_600,
            port_pattern: None,
            write_timeout_ms: 50,
            max_read_bytes: 64 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for the rolling sample window and level metering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Nominal sample rate of the device stream in Hz.
    pub sample_rate: u32,
    /// Capacity of the rolling window in samples (~1 s at 44.1 kHz).
    pub buffer_len: usize,
    /// Number of trailing samples in the waveform snapshot and the level
    /// meter window.
    pub waveform_len: usize,
    /// Byte order of the inbound PCM stream.
    pub byte_order: ByteOrder,
    /// Level metering policy.
    pub level_meter: LevelMeter,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_len: 44_100,
            waveform_len: 1_000,
            byte_order: ByteOrder::default(),
            level_meter: LevelMeter::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// SpectrogramConfig
// ---------------------------------------------------------------------------

/// Short-time Fourier transform and display scaling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Samples per STFT segment.
    pub segment_len: usize,
    /// Samples shared by consecutive segments.  `None` means `segment_len / 8`.
    pub overlap: Option<usize>,
    /// Keep every n-th frequency row.
    pub freq_stride: usize,
    /// Keep every n-th time column.
    pub time_stride: usize,
    /// Lower clamp of the dB scale.
    pub db_floor: f32,
    /// Upper clamp of the dB scale.
    pub db_ceiling: f32,
    /// Added to power before the logarithm.
    pub epsilon: f64,
}

impl SpectrogramConfig {
    /// The overlap in effect, always strictly less than `segment_len`.
    pub fn overlap(&self) -> usize {
        self.overlap
            .unwrap_or(self.segment_len / 8)
            .min(self.segment_len.saturating_sub(1))
    }
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            segment_len: 1_024,
            overlap: None,
            freq_stride: 4,
            time_stride: 2,
            db_floor: -40.0,
            db_ceiling: 40.0,
            epsilon: 1e-12,
        }
    }
}

// ---------------------------------------------------------------------------
// TimingConfig
// ---------------------------------------------------------------------------

/// Periods of the two independent ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Device polling period in milliseconds.
    pub ingest_tick_ms: u64,
    /// Feature extraction period in milliseconds.
    pub feature_tick_ms: u64,
}

impl TimingConfig {
    pub fn ingest_tick(&self) -> Duration {
        Duration::from_millis(self.ingest_tick_ms)
    }

    pub fn feature_tick(&self) -> Duration {
        Duration::from_millis(self.feature_tick_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ingest_tick_ms: 10,
            feature_tick_ms: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingConfig
// ---------------------------------------------------------------------------

/// Where finished captures are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Output directory.  `None` uses [`AppPaths::recordings_dir`].
    pub output_dir: Option<PathBuf>,
    /// File name stem placed before the timestamp.
    pub file_prefix: String,
}

impl RecordingConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().recordings_dir)
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            file_prefix: "recording".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use pitch_relay::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial link settings.
    pub device: DeviceConfig,
    /// Rolling window / metering settings.
    pub audio: AudioConfig,
    /// STFT settings.
    pub spectrogram: SpectrogramConfig,
    /// Tick periods.
    pub timing: TimingConfig,
    /// Capture persistence.
    pub recording: RecordingConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the ring buffer and STFT cannot run with.
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        let spec = &self.spectrogram;

        ensure!(audio.sample_rate > 0, "audio.sample_rate must be > 0");
        ensure!(audio.buffer_len > 0, "audio.buffer_len must be > 0");
        ensure!(
            audio.waveform_len > 0 && audio.waveform_len <= audio.buffer_len,
            "audio.waveform_len must be in 1..={}",
            audio.buffer_len
        );
        ensure!(spec.segment_len > 1, "spectrogram.segment_len must be > 1");
        ensure!(
            spec.freq_stride > 0 && spec.time_stride > 0,
            "spectrogram strides must be > 0"
        );
        ensure!(
            spec.db_floor < spec.db_ceiling,
            "spectrogram.db_floor must be below db_ceiling"
        );
        ensure!(spec.epsilon > 0.0, "spectrogram.epsilon must be > 0");
        ensure!(
            self.timing.ingest_tick_ms > 0 && self.timing.feature_tick_ms > 0,
            "tick periods must be > 0"
        );
        ensure!(self.device.max_read_bytes >= 2, "device.max_read_bytes must be >= 2");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.device.baud_rate, loaded.device.baud_rate);
        assert_eq!(original.device.port_pattern, loaded.device.port_pattern);
        assert_eq!(original.audio.buffer_len, loaded.audio.buffer_len);
        assert_eq!(original.audio.byte_order, loaded.audio.byte_order);
        assert_eq!(original.audio.level_meter, loaded.audio.level_meter);
        assert_eq!(original.spectrogram.segment_len, loaded.spectrogram.segment_len);
        assert_eq!(original.spectrogram.db_floor, loaded.spectrogram.db_floor);
        assert_eq!(original.timing.ingest_tick_ms, loaded.timing.ingest_tick_ms);
        assert_eq!(original.recording.file_prefix, loaded.recording.file_prefix);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.device.baud_rate, 921_600);
        assert_eq!(config.audio.sample_rate, 44_100);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.device.baud_rate, 921_600);
        assert!(cfg.device.port_pattern.is_none());
        assert_eq!(cfg.audio.buffer_len, 44_100);
        assert_eq!(cfg.audio.waveform_len, 1_000);
        assert_eq!(cfg.audio.byte_order, ByteOrder::Little);
        assert_eq!(cfg.audio.level_meter, LevelMeter::Peak);
        assert_eq!(cfg.spectrogram.segment_len, 1_024);
        assert_eq!(cfg.spectrogram.overlap(), 128);
        assert_eq!(cfg.spectrogram.freq_stride, 4);
        assert_eq!(cfg.spectrogram.time_stride, 2);
        assert_eq!(cfg.timing.ingest_tick_ms, 10);
        assert_eq!(cfg.timing.feature_tick_ms, 50);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[device]\nport_pattern = \"/dev/ttyUSB*\"\n\n[audio]\nlevel_meter = \"mean\"\n",
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.device.port_pattern(), "/dev/ttyUSB*");
        assert_eq!(cfg.device.baud_rate, 921_600);
        assert_eq!(cfg.audio.level_meter, LevelMeter::Mean);
        assert_eq!(cfg.audio.buffer_len, 44_100);
    }

    #[test]
    fn invalid_waveform_len_rejected() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[audio]\nbuffer_len = 100\nwaveform_len = 200\n").expect("write");

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn inverted_db_range_rejected() {
        let mut cfg = AppConfig::default();
        cfg.spectrogram.db_floor = 10.0;
        cfg.spectrogram.db_ceiling = -10.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overlap_never_reaches_segment_len() {
        let mut spec = SpectrogramConfig::default();
        spec.overlap = Some(4_096);
        assert_eq!(spec.overlap(), 1_023);
    }
}
