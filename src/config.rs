//! Configuration for mindwave-io
//!
//! Loads configuration from a TOML file. Only the serial port is mandatory;
//! every timing knob has a default matching the dongle's documented behavior.

use crate::devices::mindwave::Ghid;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Dongle connection and protocol timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Serial port of the USB dongle (e.g. "/dev/ttyUSB0", "COM3")
    pub port: String,

    /// Dongle baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Serial read timeout per call
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Headset to pair with; `None` or "0000" auto-connects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ghid: Option<Ghid>,

    /// Wait after a Reset command before discarding input
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Wait between "still searching" standby replies during the handshake
    #[serde(default = "default_search_backoff_ms")]
    pub search_backoff_ms: u64,

    /// Empty reads tolerated per byte before a read times out
    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,

    /// Sleep between empty reads
    #[serde(default = "default_read_retry_interval_ms")]
    pub read_retry_interval_ms: u64,

    /// Upper bound on how long `disconnect` waits for the reader thread
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Capacity of the driver event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

/// Monitor binary settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Interval between snapshot reports
    pub report_interval_ms: u64,
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout_ms() -> u64 {
    500
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_search_backoff_ms() -> u64 {
    1000
}

fn default_read_attempts() -> u32 {
    500
}

fn default_read_retry_interval_ms() -> u64 {
    1
}

fn default_shutdown_timeout_ms() -> u64 {
    2000
}

fn default_event_capacity() -> usize {
    256
}

impl DeviceConfig {
    /// Defaults for the given port, auto-connect mode
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            ghid: None,
            settle_ms: default_settle_ms(),
            search_backoff_ms: default_search_backoff_ms(),
            read_attempts: default_read_attempts(),
            read_retry_interval_ms: default_read_retry_interval_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            event_capacity: default_event_capacity(),
        }
    }

    /// Pair with a specific headset instead of auto-connecting
    pub fn with_ghid(mut self, ghid: Ghid) -> Self {
        self.ghid = Some(ghid);
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn search_backoff(&self) -> Duration {
        Duration::from_millis(self.search_backoff_ms)
    }

    pub fn read_retry_interval(&self) -> Duration {
        Duration::from_millis(self.read_retry_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use mindwave_io::config::Config;
    ///
    /// let config = Config::load("mindwave.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Render configuration as TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Default configuration for a dongle on the first USB serial port
    pub fn mindwave_defaults() -> Self {
        Self {
            device: DeviceConfig::new("/dev/ttyUSB0"),
            logging: LoggingConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::mindwave_defaults()
    }
}
