//! Reader thread for the MindWave driver
//!
//! This module contains the poll loop that pulls frames off the dongle and
//! folds them into the shared sensor snapshot.

use super::events::{DriverEvent, EventSink};
use super::handshake::reset_dongle;
use super::payload::{apply_records, parse_payload};
use super::protocol::PacketReader;
use super::state::{AtomicConnectionState, ConnectionState, LinkCounters};
use crate::core::types::SensorState;
use crate::error::Error;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause after a failed read before trying again
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Log every Nth consecutive read failure after the first
const READ_ERROR_LOG_EVERY: u32 = 100;

/// Everything the reader thread shares with the driver
pub(super) struct ReaderContext {
    pub reader: PacketReader,
    pub sensors: Arc<Mutex<SensorState>>,
    pub connection: Arc<AtomicConnectionState>,
    pub shutdown: Arc<AtomicBool>,
    pub counters: Arc<LinkCounters>,
    pub events: EventSink,
    /// Settle time used when the loop resets the dongle itself
    pub settle: Duration,
}

/// Reader loop - reads frames and updates the snapshot until stopped
///
/// # Frame Handling
///
/// - **Data frames**: parsed outside the lock, then applied under one lock
///   acquisition so readers never see half a frame
/// - **Standby keep-alive (0xD4)**: counted, nothing applied
/// - **Disconnect notice (0xD2)**: resets the dongle, closes the stream and
///   flips the connection to `Disconnected`
/// - **Bad checksum / zero length / truncated payload**: counted and skipped
/// - **I/O failure**: reported as [`DriverEvent::ReadFailed`], loop continues
///
/// The packet reader carries the stop flag and checks it before every stream
/// read, so stopping takes at most one stream read timeout.
///
/// Returns the stream when stopped on request, `None` when the loop closed it.
pub(super) fn reader_loop(
    mut port: Box<dyn Transport>,
    ctx: ReaderContext,
) -> Option<Box<dyn Transport>> {
    let mut consecutive_failures: u32 = 0;

    while !ctx.shutdown.load(Ordering::Acquire) {
        let payload = match ctx.reader.read_frame(&mut *port) {
            Ok(payload) => {
                consecutive_failures = 0;
                payload
            }
            Err(Error::ChecksumMismatch { .. }) => {
                ctx.counters.checksum_error();
                continue;
            }
            Err(Error::ZeroLength) => {
                ctx.counters.zero_length();
                continue;
            }
            Err(Error::Cancelled) => break,
            Err(e) => {
                consecutive_failures += 1;
                ctx.counters.io_error();
                if consecutive_failures == 1 || consecutive_failures % READ_ERROR_LOG_EVERY == 0 {
                    log::warn!("Read failed ({} in a row): {}", consecutive_failures, e);
                }
                ctx.events.emit(DriverEvent::ReadFailed {
                    error: e.to_string(),
                    consecutive: consecutive_failures,
                });
                thread::sleep(READ_ERROR_BACKOFF);
                continue;
            }
        };

        ctx.counters.frame();

        let records = match parse_payload(&payload) {
            Ok(records) => records,
            Err(Error::HeadsetDisconnected) => {
                log::warn!("Dongle reports headset disconnected, stopping reader");
                ctx.events.emit(DriverEvent::HeadsetDisconnected);
                if let Err(e) = reset_dongle(&mut *port, ctx.settle) {
                    log::warn!("Failed to reset dongle: {}", e);
                }
                drop(port);
                log::info!("Reader thread exiting");
                // Stopped goes out first so anyone watching the state
                // already has it queued
                ctx.events.emit(DriverEvent::Stopped);
                // Only a live connection is torn down here; a concurrent
                // disconnect may already have moved the state on
                let _ = ctx
                    .connection
                    .transition(ConnectionState::Connected, ConnectionState::Disconnected);
                return None;
            }
            Err(e) => {
                ctx.counters.truncated();
                log::debug!("Discarding payload {:02X?}: {}", payload, e);
                continue;
            }
        };

        let rest = {
            let mut sensors = ctx.sensors.lock();
            apply_records(records, &mut sensors)
        };

        for record in rest {
            ctx.events.emit(DriverEvent::Record(record));
        }
    }

    log::info!("Reader thread exiting");
    ctx.events.emit(DriverEvent::Stopped);
    Some(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::mindwave::events::create_event_channel;
    use crate::devices::mindwave::payload::Record;
    use crate::devices::mindwave::protocol::encode_frame;
    use crate::transport::MockTransport;
    use crossbeam_channel::Receiver;

    struct Harness {
        mock: MockTransport,
        sensors: Arc<Mutex<SensorState>>,
        connection: Arc<AtomicConnectionState>,
        shutdown: Arc<AtomicBool>,
        counters: Arc<LinkCounters>,
        events: Receiver<DriverEvent>,
        thread: thread::JoinHandle<Option<Box<dyn Transport>>>,
    }

    fn spawn_reader() -> Harness {
        spawn_reader_with(5)
    }

    fn spawn_reader_with(max_attempts: u32) -> Harness {
        let mock = MockTransport::new();
        let sensors = Arc::new(Mutex::new(SensorState::default()));
        let connection = Arc::new(AtomicConnectionState::new(ConnectionState::Connected));
        let shutdown = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(LinkCounters::default());
        let (tx, events) = create_event_channel(64);

        let ctx = ReaderContext {
            reader: PacketReader::new(max_attempts, Duration::from_millis(1))
                .with_stop(Arc::clone(&shutdown)),
            sensors: Arc::clone(&sensors),
            connection: Arc::clone(&connection),
            shutdown: Arc::clone(&shutdown),
            counters: Arc::clone(&counters),
            events: EventSink::new(tx, Arc::clone(&counters)),
            settle: Duration::ZERO,
        };
        let port: Box<dyn Transport> = Box::new(mock.clone());
        let thread = thread::spawn(move || reader_loop(port, ctx));

        Harness {
            mock,
            sensors,
            connection,
            shutdown,
            counters,
            events,
            thread,
        }
    }

    /// Next event other than a read failure (idle reads time out)
    fn next_event(events: &Receiver<DriverEvent>) -> DriverEvent {
        loop {
            match events.recv_timeout(Duration::from_secs(5)).unwrap() {
                DriverEvent::ReadFailed { .. } => continue,
                event => return event,
            }
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(std::time::Instant::now() < deadline, "condition not met in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_frames_update_snapshot() {
        let h = spawn_reader();
        h.mock.inject_read(&encode_frame(&[0x02, 0x1A, 0x04, 0x3C]));
        h.mock.inject_read(&encode_frame(&[0x80, 0x02, 0xFF, 0x38]));

        wait_until(|| h.sensors.lock().frames == 2);
        let snapshot = *h.sensors.lock();
        assert_eq!(snapshot.poor_signal_quality, 0x1A);
        assert_eq!(snapshot.attention, 60);
        assert_eq!(snapshot.raw_wave, -200);

        h.shutdown.store(true, Ordering::Release);
        let port = h.thread.join().unwrap();
        assert!(port.is_some());
        assert_eq!(h.connection.load(), ConnectionState::Connected);
    }

    #[test]
    fn test_bad_frames_counted_and_skipped() {
        let h = spawn_reader();
        let mut bad = encode_frame(&[0x04, 0x10]);
        *bad.last_mut().unwrap() ^= 0x55;
        h.mock.inject_read(&bad);
        h.mock.inject_read(&[0xAA, 0xAA, 0x00]);
        h.mock.inject_read(&encode_frame(&[0x80, 0x02, 0x01]));
        h.mock.inject_read(&encode_frame(&[0x05, 0x21]));

        wait_until(|| h.sensors.lock().meditation == 0x21);
        let stats = h.counters.snapshot();
        assert_eq!(stats.checksum_errors, 1);
        assert_eq!(stats.zero_length_frames, 1);
        assert_eq!(stats.truncated_payloads, 1);
        assert_eq!(h.sensors.lock().attention, 0);

        h.shutdown.store(true, Ordering::Release);
        h.thread.join().unwrap();
    }

    #[test]
    fn test_unapplied_records_become_events() {
        let h = spawn_reader();
        h.mock
            .inject_read(&encode_frame(&[0x55, 0x01, 0x07, 0x03, 0x48]));

        let first = next_event(&h.events);
        let second = next_event(&h.events);
        assert_eq!(
            first,
            DriverEvent::Record(Record::Extended {
                level: 1,
                code: 0x01,
                data: vec![0x07]
            })
        );
        assert_eq!(second, DriverEvent::Record(Record::HeartRate(0x48)));

        h.shutdown.store(true, Ordering::Release);
        h.thread.join().unwrap();
    }

    #[test]
    fn test_disconnect_notice_stops_loop() {
        let h = spawn_reader();
        h.mock.inject_read(&encode_frame(&[0x04, 0x30]));
        h.mock.inject_read(&encode_frame(&[0xD2, 0x02, 0xF6, 0x4F]));

        let port = h.thread.join().unwrap();
        assert!(port.is_none());
        assert_eq!(h.connection.load(), ConnectionState::Disconnected);
        assert_eq!(h.sensors.lock().attention, 0x30);
        assert_eq!(h.mock.get_written(), vec![0xC1]);

        let events: Vec<DriverEvent> = h
            .events
            .try_iter()
            .filter(|e| !matches!(e, DriverEvent::ReadFailed { .. }))
            .collect();
        assert_eq!(
            events,
            vec![DriverEvent::HeadsetDisconnected, DriverEvent::Stopped]
        );
    }

    #[test]
    fn test_read_failures_reported_not_fatal() {
        let h = spawn_reader();
        h.mock.set_read_error(Some(std::io::ErrorKind::BrokenPipe));

        wait_until(|| h.counters.snapshot().io_errors >= 3);
        h.mock.set_read_error(None);
        h.mock.inject_read(&encode_frame(&[0x04, 0x11]));
        wait_until(|| h.sensors.lock().attention == 0x11);

        let failures: Vec<u32> = h
            .events
            .try_iter()
            .filter_map(|e| match e {
                DriverEvent::ReadFailed { consecutive, .. } => Some(consecutive),
                _ => None,
            })
            .collect();
        assert!(failures.len() >= 3);
        assert_eq!(&failures[..3], &[1, 2, 3]);
        assert_eq!(h.connection.load(), ConnectionState::Connected);

        h.shutdown.store(true, Ordering::Release);
        h.thread.join().unwrap();
    }

    #[test]
    fn test_stop_interrupts_quiet_link() {
        // Without the stop flag this read would retry for minutes
        let h = spawn_reader_with(u32::MAX);
        thread::sleep(Duration::from_millis(20));

        let started = std::time::Instant::now();
        h.shutdown.store(true, Ordering::Release);
        let port = h.thread.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(port.is_some());
        assert_eq!(h.counters.snapshot().io_errors, 0);
        assert_eq!(h.events.try_iter().last(), Some(DriverEvent::Stopped));
    }
}
