//! Connection state and link diagnostics
//!
//! Both are lock-free so the reader thread and any number of caller threads
//! can touch them without contending on the sensor lock.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of one driver instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No stream open; the only state `connect` starts from
    Disconnected = 0,
    /// `connect` owns the stream and is negotiating with the dongle
    Handshaking = 1,
    /// Reader thread running against an open stream
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Handshaking,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Atomic cell holding a [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move `from` -> `to`; on failure returns the state actually found
    pub fn transition(
        &self,
        from: ConnectionState,
        to: ConnectionState,
    ) -> Result<(), ConnectionState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ConnectionState::from_u8)
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}

/// Diagnostic counters using atomics for lock-free access
#[derive(Debug, Default)]
pub struct LinkCounters {
    frames: AtomicU64,
    checksum_errors: AtomicU64,
    zero_length_frames: AtomicU64,
    truncated_payloads: AtomicU64,
    io_errors: AtomicU64,
    events_dropped: AtomicU64,
}

/// Point-in-time copy of [`LinkCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Payloads decoded (including keep-alives)
    pub frames: u64,
    pub checksum_errors: u64,
    pub zero_length_frames: u64,
    pub truncated_payloads: u64,
    pub io_errors: u64,
    /// Events discarded because the event channel was full
    pub events_dropped: u64,
}

impl LinkCounters {
    pub fn frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checksum_error(&self) {
        self.checksum_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn zero_length(&self) {
        self.zero_length_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn truncated(&self) {
        self.truncated_payloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn io_error(&self) {
        self.io_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LinkStats {
        LinkStats {
            frames: self.frames.load(Ordering::Relaxed),
            checksum_errors: self.checksum_errors.load(Ordering::Relaxed),
            zero_length_frames: self.zero_length_frames.load(Ordering::Relaxed),
            truncated_payloads: self.truncated_payloads.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}
