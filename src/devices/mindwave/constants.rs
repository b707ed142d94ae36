//! Constants for the ThinkGear protocol (MindWave USB dongle)

// Framing
pub const SYNC_BYTE: u8 = 0xAA;
pub const EXCODE_BYTE: u8 = 0x55; // Extended-code marker, one per extension level
pub const MULTI_BYTE_CODE_THRESHOLD: u8 = 0x80; // Codes >= 0x80 carry an explicit length byte

// Host -> dongle commands
pub const CMD_PAIR_BY_ID: u8 = 0xC0; // Followed by GHID high, GHID low
pub const CMD_RESET: u8 = 0xC1; // Drop any headset link
pub const CMD_AUTOCONNECT: u8 = 0xC2; // Pair with any headset in range

// Dongle -> host replies (first payload byte)
pub const REPLY_HEADSET_FOUND: u8 = 0xD0; // [D0, len, ghid_high, ghid_low]
pub const REPLY_HEADSET_NOT_FOUND: u8 = 0xD1; // [D1, len, ...]; len 0 = none available
pub const REPLY_HEADSET_DISCONNECTED: u8 = 0xD2;
pub const REPLY_REQUEST_DENIED: u8 = 0xD3;
pub const REPLY_STANDBY: u8 = 0xD4; // [D4, len, state]; state 0 = idle, else scanning

// Data codes, extension level 0
pub const CODE_POOR_SIGNAL: u8 = 0x02;
pub const CODE_HEART_RATE: u8 = 0x03;
pub const CODE_ATTENTION: u8 = 0x04;
pub const CODE_MEDITATION: u8 = 0x05;
pub const CODE_RAW_8BIT: u8 = 0x06;
pub const CODE_RAW_MARKER: u8 = 0x07;
pub const CODE_BLINK_STRENGTH: u8 = 0x16;
pub const CODE_RAW_WAVE: u8 = 0x80; // 2 bytes, big-endian signed
pub const CODE_EEG_POWER: u8 = 0x81; // 8 x f32 big-endian
pub const CODE_ASIC_EEG_POWER: u8 = 0x83; // 8 x u24 big-endian
pub const CODE_RR_INTERVAL: u8 = 0x86; // u16 big-endian, milliseconds

// Data layout sizes
pub const EEG_POWER_LEN: usize = 32;
pub const ASIC_EEG_POWER_LEN: usize = 24;
pub const EEG_BAND_COUNT: usize = 8;
