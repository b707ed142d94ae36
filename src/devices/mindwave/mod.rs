//! NeuroSky MindWave dongle driver
//!
//! The USB dongle bridges a single headset over a serial link. This module
//! negotiates the headset link and keeps a [`SensorState`] snapshot current
//! from the dongle's ThinkGear frames.
//!
//! # Architecture
//!
//! ## Connect
//!
//! `connect` runs on the caller's thread: open the stream, reset the dongle,
//! pair (by GHID or auto-connect), then hand the stream to the reader thread.
//!
//! ## Reader Thread (continuous)
//!
//! - Owns the stream for the lifetime of the connection
//! - Parses each frame outside the lock, applies it under one lock
//! - Stops on request or when the dongle reports the headset gone
//!
//! ## Disconnect
//!
//! `disconnect` raises the stop flag, waits a bounded time for the reader to
//! hand the stream back, resets the dongle and closes the stream.
//!
//! ## Connection State
//!
//! ```text
//! ┌──────────────┐ connect ┌─────────────┐ paired ┌───────────┐
//! │ Disconnected │────────▶│ Handshaking │───────▶│ Connected │
//! │              │◀────────│             │        │           │
//! └──────────────┘ failed  └─────────────┘        └───────────┘
//!        ▲                                              │
//!        └──────── disconnect / headset lost ───────────┘
//! ```
//!
//! Transitions are compare-and-swap on one atomic, so two racing `connect`
//! calls cannot both reach the handshake.

mod commands;
pub mod constants;
mod events;
mod handshake;
pub mod payload;
pub mod protocol;
mod reader;
mod state;

pub use commands::{DongleCommand, DongleReply, Ghid};
pub use events::DriverEvent;
pub use handshake::{handshake, reset_dongle, HandshakeTiming};
pub use payload::Record;
pub use protocol::{checksum, encode_frame, PacketReader};
pub use state::{ConnectionState, LinkStats};

use crate::config::DeviceConfig;
use crate::core::types::SensorState;
use crate::error::{Error, Result};
use crate::transport::{SerialTransport, Transport};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use events::{create_event_channel, EventSink};
use parking_lot::Mutex;
use reader::ReaderContext;
use state::{AtomicConnectionState, LinkCounters};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Opens the byte stream for one connection attempt
pub type TransportFactory = Box<dyn Fn(&DeviceConfig) -> Result<Box<dyn Transport>> + Send + Sync>;

/// Running reader thread and the way back to its stream
struct ReaderHandle {
    shutdown: Arc<AtomicBool>,
    done: Receiver<Option<Box<dyn Transport>>>,
    thread: JoinHandle<()>,
}

/// MindWave dongle driver
///
/// All methods take `&self`; share the driver between threads with `Arc`.
pub struct MindWave {
    config: DeviceConfig,
    open_transport: TransportFactory,
    ghid: Mutex<Ghid>,
    connection: Arc<AtomicConnectionState>,
    sensors: Arc<Mutex<SensorState>>,
    counters: Arc<LinkCounters>,
    event_tx: Sender<DriverEvent>,
    event_rx: Receiver<DriverEvent>,
    reader: Mutex<Option<ReaderHandle>>,
}

impl MindWave {
    /// Driver for the serial port named in `config`
    ///
    /// Nothing is opened until [`connect`](Self::connect).
    pub fn new(config: DeviceConfig) -> Self {
        Self::with_transport(config, |cfg: &DeviceConfig| {
            let port = SerialTransport::open(&cfg.port, cfg.baud_rate, cfg.read_timeout())?;
            Ok(Box::new(port) as Box<dyn Transport>)
        })
    }

    /// Driver over a custom byte stream, opened on each `connect`
    pub fn with_transport<F>(config: DeviceConfig, open: F) -> Self
    where
        F: Fn(&DeviceConfig) -> Result<Box<dyn Transport>> + Send + Sync + 'static,
    {
        let (event_tx, event_rx) = create_event_channel(config.event_capacity);
        Self {
            ghid: Mutex::new(config.ghid.unwrap_or_default()),
            config,
            open_transport: Box::new(open),
            connection: Arc::new(AtomicConnectionState::default()),
            sensors: Arc::new(Mutex::new(SensorState::default())),
            counters: Arc::new(LinkCounters::default()),
            event_tx,
            event_rx,
            reader: Mutex::new(None),
        }
    }

    /// Open the stream, pair with the headset and start the reader thread
    ///
    /// A no-op when already connected. Fails with
    /// [`Error::HandshakeInProgress`] while another thread is connecting.
    pub fn connect(&self) -> Result<()> {
        match self
            .connection
            .transition(ConnectionState::Disconnected, ConnectionState::Handshaking)
        {
            Ok(()) => {}
            Err(ConnectionState::Connected) => {
                log::debug!("Already connected on {}", self.config.port);
                return Ok(());
            }
            Err(_) => return Err(Error::HandshakeInProgress),
        }

        // A reader that stopped on its own leaves a finished handle behind
        self.reap_reader();

        match self.open_and_start() {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("Connect on {} failed: {}", self.config.port, e);
                self.connection.store(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    fn open_and_start(&self) -> Result<()> {
        log::info!("Opening dongle on {}", self.config.port);
        let mut port = (self.open_transport)(&self.config)?;

        let packet_reader = self.packet_reader();
        let timing = HandshakeTiming {
            settle: self.config.settle(),
            search_backoff: self.config.search_backoff(),
        };
        let requested = *self.ghid.lock();
        if let Some(found) = handshake(&mut *port, &packet_reader, requested, &timing)? {
            *self.ghid.lock() = found;
        }

        // The handle slot stays locked until the reader is registered, so
        // disconnect never sees Connected without a reader to stop. The state
        // flips before the reader runs so a disconnect notice can move it back.
        let mut slot = self.reader.lock();
        self.connection.store(ConnectionState::Connected);
        *slot = Some(self.spawn_reader(port, packet_reader)?);
        drop(slot);

        log::info!(
            "MindWave connected on {} (headset {})",
            self.config.port,
            self.global_headset_id()
        );
        Ok(())
    }

    fn spawn_reader(
        &self,
        port: Box<dyn Transport>,
        packet_reader: PacketReader,
    ) -> Result<ReaderHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = crossbeam_channel::bounded(1);
        let ctx = ReaderContext {
            reader: packet_reader.with_stop(Arc::clone(&shutdown)),
            sensors: Arc::clone(&self.sensors),
            connection: Arc::clone(&self.connection),
            shutdown: Arc::clone(&shutdown),
            counters: Arc::clone(&self.counters),
            events: EventSink::new(self.event_tx.clone(), Arc::clone(&self.counters)),
            settle: self.config.settle(),
        };

        let thread = thread::Builder::new()
            .name("mindwave-reader".to_string())
            .spawn(move || {
                let port = reader::reader_loop(port, ctx);
                let _ = done_tx.send(port);
            })
            .map_err(|e| Error::ThreadSpawn(format!("reader thread: {}", e)))?;

        Ok(ReaderHandle {
            shutdown,
            done,
            thread,
        })
    }

    fn reap_reader(&self) {
        let stale = self.reader.lock().take();
        if let Some(handle) = stale {
            handle.shutdown.store(true, Ordering::Release);
            if handle.thread.join().is_err() {
                log::warn!("Previous reader thread panicked");
            }
        }
    }

    /// Stop the reader, reset the dongle and close the stream
    ///
    /// Waits at most `shutdown_timeout_ms` for the reader to stop. The last
    /// snapshot stays readable afterwards. Fails with
    /// [`Error::HandshakeInProgress`] while another thread is connecting.
    pub fn disconnect(&self) -> Result<()> {
        let handle = {
            let mut slot = self.reader.lock();
            if self.connection.load() == ConnectionState::Handshaking {
                return Err(Error::HandshakeInProgress);
            }
            match slot.take() {
                Some(handle) => handle,
                None => return Ok(()),
            }
        };

        log::info!("Disconnecting from {}", self.config.port);
        handle.shutdown.store(true, Ordering::Release);

        let timeout = self.config.shutdown_timeout();
        let result = match handle.done.recv_timeout(timeout) {
            Ok(Some(mut port)) => {
                let joined = handle.thread.join().map_err(|_| Error::ThreadPanic);
                let reset = reset_dongle(&mut *port, self.config.settle());
                drop(port);
                joined.and(reset)
            }
            // Reader already closed the stream after a disconnect notice
            Ok(None) => handle.thread.join().map_err(|_| Error::ThreadPanic),
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("Reader thread panicked");
                let _ = handle.thread.join();
                Err(Error::ThreadPanic)
            }
            // Stop flag stays set; the thread exits after its current read
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Reader thread did not stop within {:?}, detaching", timeout);
                Err(Error::ShutdownTimeout(timeout))
            }
        };

        let _ = self
            .connection
            .transition(ConnectionState::Connected, ConnectionState::Disconnected);
        log::info!("MindWave disconnected");
        result
    }

    pub fn is_connected(&self) -> bool {
        self.connection.load() == ConnectionState::Connected
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.load()
    }

    /// Current Global Headset ID as four uppercase hex digits
    pub fn global_headset_id(&self) -> String {
        self.ghid.lock().to_string()
    }

    pub fn ghid(&self) -> Ghid {
        *self.ghid.lock()
    }

    /// Consistent copy of the latest sensor values
    pub fn snapshot(&self) -> SensorState {
        *self.sensors.lock()
    }

    /// Receiver for [`DriverEvent`]s; clones share one queue
    pub fn events(&self) -> Receiver<DriverEvent> {
        self.event_rx.clone()
    }

    pub fn stats(&self) -> LinkStats {
        self.counters.snapshot()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn packet_reader(&self) -> PacketReader {
        PacketReader::new(self.config.read_attempts, self.config.read_retry_interval())
    }
}

impl Drop for MindWave {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}
