//! Core data types shared by the protocol engine and its callers.
//!
//! - [`types::SensorState`]: The snapshot returned by the driver
//! - [`types::SensorValue`]: Typed values for name-based lookup

pub mod types;
