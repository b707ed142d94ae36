//! Error types for mindwave-io

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// mindwave-io error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No byte arrived within the configured number of read attempts
    #[error("Read timed out after {attempts} attempts")]
    ReadTimeout {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Frame checksum mismatch
    #[error("Checksum error: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the payload
        expected: u8,
        /// Checksum byte received on the wire
        actual: u8,
    },

    /// Frame header announced an empty payload
    #[error("Zero-length frame")]
    ZeroLength,

    /// A record ran past the end of its payload
    #[error("Truncated payload: record at offset {offset} needs {needed} bytes, {available} available")]
    TruncatedPayload {
        /// Offset of the record's first byte
        offset: usize,
        /// Bytes the record requires from `offset`
        needed: usize,
        /// Bytes left in the payload from `offset`
        available: usize,
    },

    /// Dongle reported the headset link as down
    #[error("Headset disconnected")]
    HeadsetDisconnected,

    /// Dongle could not find the requested headset
    #[error("Headset not found")]
    HeadsetNotFound,

    /// Dongle has no headset paired or in range
    #[error("No headset available")]
    NoHeadsetAvailable,

    /// Dongle refused the connection request
    #[error("Request denied by dongle")]
    RequestDenied,

    /// Dongle answered the handshake with an unknown command byte
    #[error("Unexpected dongle reply: {0:#04x}")]
    UnexpectedReply(u8),

    /// Dongle reply too short for its command
    #[error("Reply {cmd:#04x} too short ({len} bytes)")]
    ShortReply {
        /// Reply command byte
        cmd: u8,
        /// Payload length received
        len: usize,
    },

    /// Another thread is already negotiating a connection
    #[error("Handshake already in progress")]
    HandshakeInProgress,

    /// Invalid Global Headset ID text
    #[error("Invalid headset id: {0}")]
    InvalidGhid(String),

    /// Background thread could not be started
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),

    /// Read abandoned because the reader was asked to stop
    #[error("Read cancelled")]
    Cancelled,

    /// Reader thread did not hand the stream back in time
    #[error("Reader did not stop within {0:?}")]
    ShutdownTimeout(std::time::Duration),

    /// Background thread panicked
    #[error("Thread panicked")]
    ThreadPanic,

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Framing errors that only invalidate the current frame
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ChecksumMismatch { .. } | Error::ZeroLength)
    }

    /// Errors raised by the byte stream itself
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Serial(_) | Error::ReadTimeout { .. }
        )
    }
}
