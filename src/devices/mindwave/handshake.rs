//! Dongle connection handshake
//!
//! ```text
//!  host                         dongle
//!   │ ── C1 (reset) ───────────▶ │
//!   │     settle, drop input     │
//!   │ ── C0 hi lo | C2 ────────▶ │
//!   │ ◀──────── D4 (searching) ─ │  back off, keep reading
//!   │ ◀──────── D0 hi lo ─────── │  connected to headset hi lo
//! ```
//!
//! Every other reply ends the handshake with a typed error. Frames with a bad
//! checksum are skipped; any other read failure aborts.

use super::commands::{DongleCommand, DongleReply, Ghid};
use super::protocol::PacketReader;
use crate::error::{Error, Result};
use crate::transport::Transport;
use std::thread;
use std::time::Duration;

/// Waits used while negotiating
#[derive(Debug, Clone, Copy)]
pub struct HandshakeTiming {
    /// After Reset, before discarding input
    pub settle: Duration,
    /// Between "still searching" replies
    pub search_backoff: Duration,
}

impl Default for HandshakeTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(1000),
            search_backoff: Duration::from_millis(1000),
        }
    }
}

/// Reset the dongle, request a link and wait for the outcome
///
/// Returns the headset the dongle reported connecting to, or `None` when the
/// dongle went idle without naming one (the caller keeps its current ID).
pub fn handshake<T: Transport + ?Sized>(
    port: &mut T,
    reader: &PacketReader,
    ghid: Ghid,
    timing: &HandshakeTiming,
) -> Result<Option<Ghid>> {
    log::info!("Resetting dongle");
    reset_dongle(port, timing.settle)?;

    let command = DongleCommand::connect(ghid);
    match command {
        DongleCommand::PairById(id) => log::info!("Pairing with headset {}", id),
        _ => log::info!("Searching for any headset"),
    }
    command.send_to(port)?;

    let mut searching_replies = 0u32;
    loop {
        let payload = match reader.read_frame(port) {
            Ok(payload) => payload,
            Err(Error::ChecksumMismatch { .. }) => continue,
            Err(e) => return Err(e),
        };

        match DongleReply::parse(&payload)? {
            DongleReply::HeadsetFound(found) => {
                log::info!("Headset {} connected", found);
                return Ok(Some(found));
            }
            DongleReply::HeadsetNotFound { any_known: false } => {
                return Err(Error::NoHeadsetAvailable)
            }
            DongleReply::HeadsetNotFound { any_known: true } => {
                return Err(Error::HeadsetNotFound)
            }
            DongleReply::HeadsetDisconnected => return Err(Error::HeadsetDisconnected),
            DongleReply::RequestDenied => return Err(Error::RequestDenied),
            DongleReply::Standby { searching: false } => {
                log::info!("Dongle idle, link ready");
                return Ok(None);
            }
            DongleReply::Standby { searching: true } => {
                searching_replies += 1;
                log::debug!("Dongle still searching ({})", searching_replies);
                thread::sleep(timing.search_backoff);
            }
            DongleReply::Other(cmd) => {
                log::warn!("Unexpected handshake reply 0x{:02X}", cmd);
                return Err(Error::UnexpectedReply(cmd));
            }
        }
    }
}

/// Send Reset, let the dongle settle and drop whatever it sent meanwhile
pub fn reset_dongle<T: Transport + ?Sized>(port: &mut T, settle: Duration) -> Result<()> {
    DongleCommand::Reset.send_to(port)?;
    thread::sleep(settle);
    port.clear()
}
