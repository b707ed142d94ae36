//! Dongle commands, handshake replies and the Global Headset ID

use super::constants::*;
use crate::error::{Error, Result};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Global Headset ID, printed on the headset's battery compartment
///
/// All-zero means "no particular headset" and selects auto-connect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ghid {
    pub high: u8,
    pub low: u8,
}

impl Ghid {
    pub const fn new(high: u8, low: u8) -> Self {
        Self { high, low }
    }

    pub fn is_zero(&self) -> bool {
        self.high == 0 && self.low == 0
    }
}

impl fmt::Display for Ghid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.high, self.low)
    }
}

impl FromStr for Ghid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidGhid(s.to_string()));
        }
        let value =
            u16::from_str_radix(digits, 16).map_err(|_| Error::InvalidGhid(s.to_string()))?;
        let [high, low] = value.to_be_bytes();
        Ok(Self { high, low })
    }
}

impl TryFrom<String> for Ghid {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Ghid> for String {
    fn from(ghid: Ghid) -> Self {
        ghid.to_string()
    }
}

/// Host-to-dongle command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DongleCommand {
    /// Drop any headset link and return to standby
    Reset,
    /// Pair with one specific headset
    PairById(Ghid),
    /// Pair with whichever headset answers first
    Autoconnect,
}

impl DongleCommand {
    /// Connect command for `ghid`: directed pairing unless it is zero
    pub fn connect(ghid: Ghid) -> Self {
        if ghid.is_zero() {
            DongleCommand::Autoconnect
        } else {
            DongleCommand::PairById(ghid)
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            DongleCommand::Reset => vec![CMD_RESET],
            DongleCommand::PairById(ghid) => vec![CMD_PAIR_BY_ID, ghid.high, ghid.low],
            DongleCommand::Autoconnect => vec![CMD_AUTOCONNECT],
        }
    }

    /// Write and flush the command
    pub fn send_to<T: Transport + ?Sized>(&self, port: &mut T) -> Result<()> {
        port.write_all(&self.to_bytes())?;
        port.flush()
    }
}

/// Dongle reply seen while negotiating a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DongleReply {
    /// 0xD0: link established with this headset
    HeadsetFound(Ghid),
    /// 0xD1: `any_known` is false when the dongle has no headset at all
    HeadsetNotFound { any_known: bool },
    /// 0xD2
    HeadsetDisconnected,
    /// 0xD3
    RequestDenied,
    /// 0xD4: `searching` is false once the dongle is idle
    Standby { searching: bool },
    /// A frame that is not a handshake reply
    Other(u8),
}

impl DongleReply {
    /// Interpret a payload received during the handshake
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let Some(&cmd) = payload.first() else {
            return Err(Error::ShortReply { cmd: 0, len: 0 });
        };
        let short = || Error::ShortReply {
            cmd,
            len: payload.len(),
        };

        let reply = match cmd {
            REPLY_HEADSET_FOUND => match payload {
                [_, _, high, low, ..] => DongleReply::HeadsetFound(Ghid::new(*high, *low)),
                _ => return Err(short()),
            },
            REPLY_HEADSET_NOT_FOUND => match payload {
                [_, len, ..] => DongleReply::HeadsetNotFound { any_known: *len != 0 },
                _ => return Err(short()),
            },
            REPLY_HEADSET_DISCONNECTED => DongleReply::HeadsetDisconnected,
            REPLY_REQUEST_DENIED => DongleReply::RequestDenied,
            REPLY_STANDBY => match payload {
                [_, _, state, ..] => DongleReply::Standby {
                    searching: *state != 0,
                },
                _ => return Err(short()),
            },
            other => DongleReply::Other(other),
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_ghid_display() {
        assert_eq!(Ghid::new(0xF6, 0x4F).to_string(), "F64F");
        assert_eq!(Ghid::new(0x00, 0x0A).to_string(), "000A");
        assert_eq!(Ghid::default().to_string(), "0000");
    }

    #[test]
    fn test_ghid_parse() {
        assert_eq!("F64F".parse::<Ghid>().unwrap(), Ghid::new(0xF6, 0x4F));
        assert_eq!("0x12ab".parse::<Ghid>().unwrap(), Ghid::new(0x12, 0xAB));
        assert!("F64".parse::<Ghid>().is_err());
        assert!("+F64".parse::<Ghid>().is_err());
        assert!("GGGG".parse::<Ghid>().is_err());
    }

    #[test]
    fn test_command_bytes() {
        assert_eq!(DongleCommand::Reset.to_bytes(), vec![0xC1]);
        assert_eq!(DongleCommand::Autoconnect.to_bytes(), vec![0xC2]);
        assert_eq!(
            DongleCommand::PairById(Ghid::new(0xF6, 0x4F)).to_bytes(),
            vec![0xC0, 0xF6, 0x4F]
        );
    }

    #[test]
    fn test_connect_command_selection() {
        assert_eq!(
            DongleCommand::connect(Ghid::default()),
            DongleCommand::Autoconnect
        );
        assert_eq!(
            DongleCommand::connect(Ghid::new(0, 1)),
            DongleCommand::PairById(Ghid::new(0, 1))
        );
    }

    #[test]
    fn test_send_writes_bytes() {
        let mut mock = MockTransport::new();
        DongleCommand::PairById(Ghid::new(0x01, 0x02))
            .send_to(&mut mock)
            .unwrap();
        assert_eq!(mock.get_written(), vec![0xC0, 0x01, 0x02]);
    }

    #[test]
    fn test_parse_replies() {
        assert_eq!(
            DongleReply::parse(&[0xD0, 0x02, 0xF6, 0x4F]).unwrap(),
            DongleReply::HeadsetFound(Ghid::new(0xF6, 0x4F))
        );
        assert_eq!(
            DongleReply::parse(&[0xD1, 0x00]).unwrap(),
            DongleReply::HeadsetNotFound { any_known: false }
        );
        assert_eq!(
            DongleReply::parse(&[0xD1, 0x02, 0xF6, 0x4F]).unwrap(),
            DongleReply::HeadsetNotFound { any_known: true }
        );
        assert_eq!(
            DongleReply::parse(&[0xD2, 0x00]).unwrap(),
            DongleReply::HeadsetDisconnected
        );
        assert_eq!(
            DongleReply::parse(&[0xD3, 0x00]).unwrap(),
            DongleReply::RequestDenied
        );
        assert_eq!(
            DongleReply::parse(&[0xD4, 0x01, 0x00]).unwrap(),
            DongleReply::Standby { searching: false }
        );
        assert_eq!(
            DongleReply::parse(&[0xD4, 0x01, 0x01]).unwrap(),
            DongleReply::Standby { searching: true }
        );
        assert_eq!(
            DongleReply::parse(&[0x02, 0xC8]).unwrap(),
            DongleReply::Other(0x02)
        );
    }

    #[test]
    fn test_short_replies() {
        assert!(matches!(
            DongleReply::parse(&[0xD0, 0x02, 0xF6]),
            Err(Error::ShortReply { cmd: 0xD0, len: 3 })
        ));
        assert!(matches!(
            DongleReply::parse(&[0xD4, 0x01]),
            Err(Error::ShortReply { cmd: 0xD4, len: 2 })
        ));
        assert!(DongleReply::parse(&[]).is_err());
    }
}
