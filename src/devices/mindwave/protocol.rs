//! ThinkGear frame layer
//!
//! Frame format: [0xAA 0xAA] [LEN] [PAYLOAD; LEN] [CHECKSUM]
//!
//! `LEN` must be below 0xAA; extra 0xAA bytes in the length slot are sync
//! padding. `CHECKSUM` is the one's complement of the low byte of the payload
//! sum.
//!
//! This module provides:
//! - `PacketReader`: Byte-at-a-time frame extractor over a blocking `Transport`
//! - `checksum` / `encode_frame`: The same arithmetic for building frames

use super::constants::SYNC_BYTE;
use crate::error::{Error, Result};
use crate::transport::Transport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Largest payload a frame can announce (the length byte must stay below 0xAA)
pub const MAX_PAYLOAD_LEN: usize = SYNC_BYTE as usize - 1;

/// ThinkGear checksum: `!(sum & 0xFF)`
#[inline]
pub fn checksum(payload: &[u8]) -> u8 {
    let sum = payload.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    !sum
}

/// Build a complete wire frame around `payload`
///
/// Used by simulators and tests. Panics if the payload is empty or longer
/// than [`MAX_PAYLOAD_LEN`].
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    assert!(
        !payload.is_empty() && payload.len() <= MAX_PAYLOAD_LEN,
        "payload length {} outside 1..={}",
        payload.len(),
        MAX_PAYLOAD_LEN
    );
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&[SYNC_BYTE, SYNC_BYTE, payload.len() as u8]);
    frame.extend_from_slice(payload);
    frame.push(checksum(payload));
    frame
}

/// Frame reader over a blocking byte stream
///
/// The stream's read timeout bounds a single read; `max_attempts` bounds how
/// many empty reads a single byte may take before the read is abandoned.
/// With a stop flag attached, a raised flag ends the read after the
/// current stream read with [`Error::Cancelled`].
pub struct PacketReader {
    max_attempts: u32,
    retry_interval: Duration,
    stop: Option<Arc<AtomicBool>>,
}

impl PacketReader {
    pub fn new(max_attempts: u32, retry_interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_interval,
            stop: None,
        }
    }

    /// Abort reads once `stop` is set
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::Acquire))
    }

    /// Read the next checksum-verified payload
    ///
    /// `ChecksumMismatch` and `ZeroLength` leave the stream positioned after
    /// the bad frame; call again to resume the sync search.
    pub fn read_frame<T: Transport + ?Sized>(&self, port: &mut T) -> Result<Vec<u8>> {
        let len = self.read_header(port)?;
        if len == 0 {
            log::debug!("Zero-length frame");
            return Err(Error::ZeroLength);
        }

        let mut payload = vec![0u8; len];
        for slot in payload.iter_mut() {
            *slot = self.read_byte(port)?;
        }

        let actual = self.read_byte(port)?;
        let expected = checksum(&payload);
        if actual != expected {
            log::debug!(
                "Checksum mismatch: expected=0x{:02X}, received=0x{:02X}, len={}, first_bytes={:02X?}",
                expected,
                actual,
                len,
                &payload[..len.min(8)]
            );
            return Err(Error::ChecksumMismatch { expected, actual });
        }

        Ok(payload)
    }

    /// Scan for SYNC SYNC and return the payload length that follows
    fn read_header<T: Transport + ?Sized>(&self, port: &mut T) -> Result<usize> {
        loop {
            if self.read_byte(port)? != SYNC_BYTE {
                continue;
            }
            if self.read_byte(port)? != SYNC_BYTE {
                continue;
            }

            loop {
                let b = self.read_byte(port)?;
                if b < SYNC_BYTE {
                    return Ok(b as usize);
                }
                if b > SYNC_BYTE {
                    log::trace!("Invalid length byte 0x{:02X}, resyncing", b);
                    break;
                }
            }
        }
    }

    /// Read exactly one byte, retrying empty reads up to `max_attempts` times
    fn read_byte<T: Transport + ?Sized>(&self, port: &mut T) -> Result<u8> {
        let mut buf = [0u8; 1];
        for _ in 0..self.max_attempts {
            if self.stopped() {
                return Err(Error::Cancelled);
            }
            if port.read(&mut buf)? == 1 {
                return Ok(buf[0]);
            }
            if !self.retry_interval.is_zero() {
                thread::sleep(self.retry_interval);
            }
        }
        Err(Error::ReadTimeout {
            attempts: self.max_attempts,
        })
    }
}

impl Default for PacketReader {
    fn default() -> Self {
        Self::new(500, Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn reader() -> PacketReader {
        PacketReader::new(3, Duration::ZERO)
    }

    #[test]
    fn test_checksum_arithmetic() {
        assert_eq!(checksum(&[0x00]), 0xFF);
        assert_eq!(checksum(&[0x04, 0x3C]), !0x40u8);
        // Sum 0x1FE wraps to 0xFE
        assert_eq!(checksum(&[0xFF, 0xFF]), 0x01);
    }

    #[test]
    fn test_checksum_matches_reference_formula() {
        let payloads: [&[u8]; 4] = [
            &[0x02, 0x00],
            &[0x80, 0x02, 0xFF, 0xFF],
            &[0xA9; 169],
            &[0x01, 0x7F, 0xFE],
        ];
        for payload in payloads {
            let sum: u32 = payload.iter().map(|&b| b as u32).sum();
            let expected = (!(sum & 0xFF)) & 0xFF;
            assert_eq!(checksum(payload) as u32, expected);
        }
    }

    #[test]
    fn test_read_valid_frame() {
        let mut mock = MockTransport::new();
        mock.inject_read(&encode_frame(&[0x04, 0x3C]));

        let payload = reader().read_frame(&mut mock).unwrap();
        assert_eq!(payload, vec![0x04, 0x3C]);
        assert_eq!(mock.pending_read(), 0);
    }

    #[test]
    fn test_accepts_every_payload_length() {
        for len in 1..=MAX_PAYLOAD_LEN {
            let payload: Vec<u8> = (0..len).map(|i| (i * 7 + len) as u8).collect();
            let mut mock = MockTransport::new();
            mock.inject_read(&encode_frame(&payload));
            assert_eq!(reader().read_frame(&mut mock).unwrap(), payload);
        }
    }

    #[test]
    fn test_every_wrong_checksum_rejected() {
        let payload = [0x02, 0x1A, 0x04, 0x33];
        let good = checksum(&payload);
        for bad in (0..=255u8).filter(|&b| b != good) {
            let mut frame = encode_frame(&payload);
            *frame.last_mut().unwrap() = bad;

            let mut mock = MockTransport::new();
            mock.inject_read(&frame);
            match reader().read_frame(&mut mock) {
                Err(Error::ChecksumMismatch { expected, actual }) => {
                    assert_eq!(expected, good);
                    assert_eq!(actual, bad);
                }
                other => panic!("expected checksum error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_stop_flag_ends_idle_read() {
        let stop = Arc::new(AtomicBool::new(false));
        let r = PacketReader::new(u32::MAX, Duration::from_millis(1)).with_stop(Arc::clone(&stop));
        let mut mock = MockTransport::new();

        let flag = Arc::clone(&stop);
        let raiser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            flag.store(true, Ordering::Release);
        });

        let started = std::time::Instant::now();
        assert!(matches!(r.read_frame(&mut mock), Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
        raiser.join().unwrap();
    }

    #[test]
    fn test_stop_flag_mid_frame() {
        let stop = Arc::new(AtomicBool::new(false));
        let r = PacketReader::new(u32::MAX, Duration::ZERO).with_stop(Arc::clone(&stop));
        let mut mock = MockTransport::new();
        mock.inject_read(&[0xAA, 0xAA, 0x02, 0x04]);
        stop.store(true, Ordering::Release);

        assert!(matches!(r.read_frame(&mut mock), Err(Error::Cancelled)));
    }

    #[test]
    fn test_zero_length_frame() {
        let mut mock = MockTransport::new();
        mock.inject_read(&[0xAA, 0xAA, 0x00, 0xFF]);
        assert!(matches!(
            reader().read_frame(&mut mock),
            Err(Error::ZeroLength)
        ));
    }

    #[test]
    fn test_skips_leading_garbage() {
        let mut mock = MockTransport::new();
        mock.inject_read(&[0x00, 0x13, 0xAA, 0x01, 0x55]);
        mock.inject_read(&encode_frame(&[0x05, 0x28]));

        assert_eq!(reader().read_frame(&mut mock).unwrap(), vec![0x05, 0x28]);
    }

    #[test]
    fn test_extra_sync_bytes_in_length_slot() {
        let mut mock = MockTransport::new();
        mock.inject_read(&[0xAA, 0xAA, 0xAA, 0xAA]);
        mock.inject_read(&[0x02, 0x16, 0x40, checksum(&[0x16, 0x40])]);

        assert_eq!(reader().read_frame(&mut mock).unwrap(), vec![0x16, 0x40]);
    }

    #[test]
    fn test_invalid_length_restarts_search() {
        let mut mock = MockTransport::new();
        // 0xB0 is not a valid length; the 0x02 after it must not be taken as one
        mock.inject_read(&[0xAA, 0xAA, 0xB0, 0x02, 0x04, 0x10]);
        mock.inject_read(&encode_frame(&[0x02, 0x00]));

        assert_eq!(reader().read_frame(&mut mock).unwrap(), vec![0x02, 0x00]);
    }

    #[test]
    fn test_resumes_after_bad_checksum() {
        let mut mock = MockTransport::new();
        let mut bad = encode_frame(&[0x04, 0x10]);
        *bad.last_mut().unwrap() ^= 0x01;
        mock.inject_read(&bad);
        mock.inject_read(&encode_frame(&[0x04, 0x11]));

        let r = reader();
        assert!(r.read_frame(&mut mock).unwrap_err().is_recoverable());
        assert_eq!(r.read_frame(&mut mock).unwrap(), vec![0x04, 0x11]);
    }

    #[test]
    fn test_read_timeout_when_stream_starves() {
        let mut mock = MockTransport::new();
        mock.inject_read(&[0xAA, 0xAA, 0x04, 0x01]);

        match reader().read_frame(&mut mock) {
            Err(Error::ReadTimeout { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_stream_error_propagates() {
        let mut mock = MockTransport::new();
        mock.set_read_error(Some(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(
            reader().read_frame(&mut mock),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_encode_frame_layout() {
        let frame = encode_frame(&[0x02, 0xC8]);
        assert_eq!(frame, vec![0xAA, 0xAA, 0x02, 0x02, 0xC8, checksum(&[0x02, 0xC8])]);
    }
}
