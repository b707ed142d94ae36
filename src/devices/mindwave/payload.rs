//! ThinkGear payload decoding
//!
//! A payload is a run of records:
//!
//! ```text
//! [0x55 × level] [CODE] [LEN if CODE >= 0x80] [DATA; LEN or 1]
//! ```
//!
//! Parsing and applying are split so the caller can parse outside the sensor
//! lock and then apply a whole frame under one acquisition.

use super::constants::*;
use crate::core::types::{EegPower, SensorState};
use crate::error::{Error, Result};

/// One decoded record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// 0x02: 0 = best, 200 = no contact
    PoorSignal(u8),
    /// 0x03
    HeartRate(u8),
    /// 0x04: eSense 0-100
    Attention(u8),
    /// 0x05: eSense 0-100
    Meditation(u8),
    /// 0x06
    RawWave8Bit(u8),
    /// 0x07
    RawMarker(u8),
    /// 0x16: 1-255
    BlinkStrength(u8),
    /// 0x80
    RawWave(i16),
    /// 0x81: floating-point band powers, wire order
    EegPowerFloat([f32; EEG_BAND_COUNT]),
    /// 0x83
    AsicEegPower(EegPower),
    /// 0x86: milliseconds between R peaks
    RrInterval(u16),
    /// Extension level 0 code with no known layout
    Unknown { code: u8, data: Vec<u8> },
    /// Any record behind one or more 0x55 markers
    Extended { level: u8, code: u8, data: Vec<u8> },
}

impl Record {
    /// Interpret one record's data
    ///
    /// Known codes whose data is shorter than their layout come back as
    /// [`Record::Unknown`].
    pub fn decode(level: u8, code: u8, data: &[u8]) -> Self {
        if level > 0 {
            return Record::Extended {
                level,
                code,
                data: data.to_vec(),
            };
        }

        let decoded = match (code, data) {
            (CODE_POOR_SIGNAL, [v, ..]) => Some(Record::PoorSignal(*v)),
            (CODE_HEART_RATE, [v, ..]) => Some(Record::HeartRate(*v)),
            (CODE_ATTENTION, [v, ..]) => Some(Record::Attention(*v)),
            (CODE_MEDITATION, [v, ..]) => Some(Record::Meditation(*v)),
            (CODE_RAW_8BIT, [v, ..]) => Some(Record::RawWave8Bit(*v)),
            (CODE_RAW_MARKER, [v, ..]) => Some(Record::RawMarker(*v)),
            (CODE_BLINK_STRENGTH, [v, ..]) => Some(Record::BlinkStrength(*v)),
            (CODE_RAW_WAVE, [hi, lo, ..]) => Some(Record::RawWave(i16::from_be_bytes([*hi, *lo]))),
            (CODE_EEG_POWER, d) if d.len() >= EEG_POWER_LEN => {
                Some(Record::EegPowerFloat(decode_float_bands(d)))
            }
            (CODE_ASIC_EEG_POWER, d) if d.len() >= ASIC_EEG_POWER_LEN => {
                Some(Record::AsicEegPower(decode_asic_bands(d)))
            }
            (CODE_RR_INTERVAL, [hi, lo, ..]) => {
                Some(Record::RrInterval(u16::from_be_bytes([*hi, *lo])))
            }
            _ => None,
        };

        decoded.unwrap_or_else(|| {
            log::debug!("Unrecognized record code=0x{:02X} data={:02X?}", code, data);
            Record::Unknown {
                code,
                data: data.to_vec(),
            }
        })
    }

    /// Fold this record into the snapshot; false if it has no snapshot field
    pub fn apply(&self, state: &mut SensorState) -> bool {
        match *self {
            Record::PoorSignal(v) => state.poor_signal_quality = v,
            Record::Attention(v) => state.attention = v,
            Record::Meditation(v) => state.meditation = v,
            Record::BlinkStrength(v) => state.blink_strength = v,
            Record::RawWave(v) => state.raw_wave = v,
            Record::AsicEegPower(power) => state.eeg_power = power,
            _ => return false,
        }
        true
    }
}

/// Eight unsigned 24-bit big-endian triplets
fn decode_asic_bands(data: &[u8]) -> EegPower {
    let mut bands = [0u32; EEG_BAND_COUNT];
    for (band, triplet) in bands.iter_mut().zip(data.chunks_exact(3)) {
        *band = (triplet[0] as u32) << 16 | (triplet[1] as u32) << 8 | triplet[2] as u32;
    }
    EegPower::from_bands(bands)
}

/// Eight big-endian IEEE-754 singles
fn decode_float_bands(data: &[u8]) -> [f32; EEG_BAND_COUNT] {
    let mut bands = [0f32; EEG_BAND_COUNT];
    for (band, quad) in bands.iter_mut().zip(data.chunks_exact(4)) {
        *band = f32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
    }
    bands
}

/// Split a data payload into records
///
/// The cursor must land exactly on the payload end; a record that runs past
/// it fails the whole payload.
pub fn parse_records(payload: &[u8]) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut pos = 0;

    while pos < payload.len() {
        let start = pos;
        let truncated = |needed: usize| Error::TruncatedPayload {
            offset: start,
            needed,
            available: payload.len() - start,
        };

        let mut level: u8 = 0;
        while payload.get(pos) == Some(&EXCODE_BYTE) {
            level = level.saturating_add(1);
            pos += 1;
        }

        let code = *payload.get(pos).ok_or_else(|| truncated(pos - start + 1))?;
        pos += 1;

        let len = if code >= MULTI_BYTE_CODE_THRESHOLD {
            let len = *payload.get(pos).ok_or_else(|| truncated(pos - start + 1))?;
            pos += 1;
            len as usize
        } else {
            1
        };

        let data = payload
            .get(pos..pos + len)
            .ok_or_else(|| truncated(pos - start + len))?;
        pos += len;

        records.push(Record::decode(level, code, data));
    }

    Ok(records)
}

/// Classify a payload received while streaming and parse its records
///
/// A disconnect notice fails with `HeadsetDisconnected`; a standby keep-alive
/// yields no records.
pub fn parse_payload(payload: &[u8]) -> Result<Vec<Record>> {
    match payload.first() {
        None | Some(&REPLY_STANDBY) => Ok(Vec::new()),
        Some(&REPLY_HEADSET_DISCONNECTED) => Err(Error::HeadsetDisconnected),
        Some(_) => parse_records(payload),
    }
}

/// Apply records to the snapshot, returning the ones it has no field for
pub fn apply_records(records: Vec<Record>, state: &mut SensorState) -> Vec<Record> {
    let mut applied = false;
    let mut rest = Vec::new();
    for record in records {
        if record.apply(state) {
            applied = true;
        } else {
            rest.push(record);
        }
    }
    if applied {
        state.touch();
    }
    rest
}

/// Decode a whole payload into `state`
///
/// Returns the records the snapshot has no field for (extended, unknown and
/// supplementary codes).
pub fn decode(payload: &[u8], state: &mut SensorState) -> Result<Vec<Record>> {
    let records = parse_payload(payload)?;
    Ok(apply_records(records, state))
}
