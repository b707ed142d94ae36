//! Core data types for sensor values.
//!
//! - [`SensorState`]: Snapshot of every headset field, updated by the reader thread
//! - [`EegPower`]: The eight ASIC band powers
//! - [`SensorValue`]: Typed value returned by name-based field lookup

use std::fmt;

/// Runtime sensor values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorValue {
    U8(u8),
    I16(i16),
    U32(u32),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::U8(v) => write!(f, "{}", v),
            SensorValue::I16(v) => write!(f, "{}", v),
            SensorValue::U32(v) => write!(f, "{}", v),
        }
    }
}

/// ASIC EEG band powers, each an unsigned 24-bit magnitude
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EegPower {
    pub delta: u32,
    pub theta: u32,
    pub low_alpha: u32,
    pub high_alpha: u32,
    pub low_beta: u32,
    pub high_beta: u32,
    pub low_gamma: u32,
    pub mid_gamma: u32,
}

impl EegPower {
    /// Band names in wire order
    pub const BAND_NAMES: [&'static str; 8] = [
        "delta",
        "theta",
        "low_alpha",
        "high_alpha",
        "low_beta",
        "high_beta",
        "low_gamma",
        "mid_gamma",
    ];

    /// Build from band values in wire order
    pub fn from_bands(bands: [u32; 8]) -> Self {
        let [delta, theta, low_alpha, high_alpha, low_beta, high_beta, low_gamma, mid_gamma] =
            bands;
        Self {
            delta,
            theta,
            low_alpha,
            high_alpha,
            low_beta,
            high_beta,
            low_gamma,
            mid_gamma,
        }
    }

    /// Band values in wire order
    pub fn bands(&self) -> [u32; 8] {
        [
            self.delta,
            self.theta,
            self.low_alpha,
            self.high_alpha,
            self.low_beta,
            self.high_beta,
            self.low_gamma,
            self.mid_gamma,
        ]
    }
}

/// Latest value of every headset field
///
/// Written by the reader thread one whole frame at a time and copied out
/// whole by readers, so a snapshot always reflects a completed frame.
/// Fields not carried by recent frames keep their previous values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorState {
    /// Signal quality, 0 = best, 200 = no skin contact
    pub poor_signal_quality: u8,
    /// Attention eSense 0-100, 0 = unreliable
    pub attention: u8,
    /// Meditation eSense 0-100, 0 = unreliable
    pub meditation: u8,
    /// Blink strength 1-255
    pub blink_strength: u8,
    /// Raw 16-bit EEG sample
    pub raw_wave: i16,
    pub eeg_power: EegPower,
    /// Wall-clock time of the last applied frame (µs since Unix epoch, 0 = never)
    pub updated_us: u64,
    /// Frames applied since the driver was created
    pub frames: u64,
}

/// Poor-signal value the headset reports when the sensor is off the skin
pub const NO_CONTACT_SIGNAL: u8 = 200;

impl SensorState {
    /// Field names accepted by [`SensorState::get`]
    pub const FIELD_NAMES: [&'static str; 13] = [
        "poor_signal_quality",
        "attention",
        "meditation",
        "blink_strength",
        "raw_wave",
        "delta",
        "theta",
        "low_alpha",
        "high_alpha",
        "low_beta",
        "high_beta",
        "low_gamma",
        "mid_gamma",
    ];

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<SensorValue> {
        let value = match name {
            "poor_signal_quality" => SensorValue::U8(self.poor_signal_quality),
            "attention" => SensorValue::U8(self.attention),
            "meditation" => SensorValue::U8(self.meditation),
            "blink_strength" => SensorValue::U8(self.blink_strength),
            "raw_wave" => SensorValue::I16(self.raw_wave),
            band => {
                let idx = EegPower::BAND_NAMES.iter().position(|&b| b == band)?;
                SensorValue::U32(self.eeg_power.bands()[idx])
            }
        };
        Some(value)
    }

    /// All fields as (name, value) pairs in [`SensorState::FIELD_NAMES`] order
    pub fn fields(&self) -> Vec<(&'static str, SensorValue)> {
        Self::FIELD_NAMES
            .iter()
            .filter_map(|&name| self.get(name).map(|v| (name, v)))
            .collect()
    }

    /// Whether the headset reports skin contact
    pub fn has_contact(&self) -> bool {
        self.poor_signal_quality < NO_CONTACT_SIGNAL
    }

    /// Mark a frame as applied now
    #[inline]
    pub fn touch(&mut self) {
        self.updated_us = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        self.frames += 1;
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signal={} att={} med={} blink={} raw={} bands={:?}",
            self.poor_signal_quality,
            self.attention,
            self.meditation,
            self.blink_strength,
            self.raw_wave,
            self.eeg_power.bands()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zeroed() {
        let state = SensorState::default();
        assert_eq!(state.attention, 0);
        assert_eq!(state.raw_wave, 0);
        assert_eq!(state.eeg_power.bands(), [0; 8]);
        assert_eq!(state.frames, 0);
        assert_eq!(state.updated_us, 0);
    }

    #[test]
    fn test_get_by_name() {
        let state = SensorState {
            attention: 61,
            raw_wave: -12,
            eeg_power: EegPower {
                high_beta: 0x00ABCDEF,
                ..EegPower::default()
            },
            ..SensorState::default()
        };

        assert_eq!(state.get("attention"), Some(SensorValue::U8(61)));
        assert_eq!(state.get("raw_wave"), Some(SensorValue::I16(-12)));
        assert_eq!(state.get("high_beta"), Some(SensorValue::U32(0x00ABCDEF)));
        assert_eq!(state.get("heart_rate"), None);
    }

    #[test]
    fn test_fields_cover_every_name() {
        let fields = SensorState::default().fields();
        assert_eq!(fields.len(), SensorState::FIELD_NAMES.len());
        assert_eq!(fields[0].0, "poor_signal_quality");
        assert_eq!(fields[12].0, "mid_gamma");
    }

    #[test]
    fn test_band_order_round_trip() {
        let bands = [1, 2, 3, 4, 5, 6, 7, 8];
        let power = EegPower::from_bands(bands);
        assert_eq!(power.low_alpha, 3);
        assert_eq!(power.mid_gamma, 8);
        assert_eq!(power.bands(), bands);
    }

    #[test]
    fn test_contact() {
        let mut state = SensorState::default();
        assert!(state.has_contact());
        state.poor_signal_quality = NO_CONTACT_SIGNAL;
        assert!(!state.has_contact());
    }

    #[test]
    fn test_touch_counts_frames() {
        let mut state = SensorState::default();
        state.touch();
        state.touch();
        assert_eq!(state.frames, 2);
        assert!(state.updated_us > 0);
    }
}
