//! mindwave-io - Driver for the NeuroSky MindWave USB dongle
//!
//! Pairs the dongle with an EEG headset and keeps a snapshot of the latest
//! ThinkGear readings (signal quality, eSense values, blink strength, raw
//! wave and EEG band powers) current from a background reader thread.
//!
//! ```no_run
//! use mindwave_io::{DeviceConfig, MindWave};
//!
//! let driver = MindWave::new(DeviceConfig::new("/dev/ttyUSB0"));
//! driver.connect()?;
//! println!("attention: {}", driver.snapshot().attention);
//! driver.disconnect()?;
//! # Ok::<(), mindwave_io::Error>(())
//! ```

pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, DeviceConfig};
pub use core::types::{EegPower, SensorState, SensorValue};
pub use devices::mindwave::{ConnectionState, DriverEvent, Ghid, LinkStats, MindWave, Record};
pub use error::{Error, Result};
