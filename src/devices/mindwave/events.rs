//! Driver events delivered through a bounded channel
//!
//! The reader thread never blocks on the channel: when it is full the event is
//! dropped and counted in [`super::LinkStats::events_dropped`].

use super::payload::Record;
use super::state::LinkCounters;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;

/// Something the caller may want to know about besides the snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// A record with no snapshot field (extended, unknown or supplementary code)
    Record(Record),
    /// Reading from the dongle failed; `consecutive` resets after a good frame
    ReadFailed { error: String, consecutive: u32 },
    /// Dongle reported the headset link down; the reader stopped itself
    HeadsetDisconnected,
    /// Reader thread exited
    Stopped,
}

/// Create the bounded event channel
pub fn create_event_channel(capacity: usize) -> (Sender<DriverEvent>, Receiver<DriverEvent>) {
    crossbeam_channel::bounded(capacity.max(1))
}

/// Non-blocking sending half used by the reader thread
#[derive(Clone)]
pub(crate) struct EventSink {
    tx: Sender<DriverEvent>,
    counters: Arc<LinkCounters>,
}

impl EventSink {
    pub(crate) fn new(tx: Sender<DriverEvent>, counters: Arc<LinkCounters>) -> Self {
        Self { tx, counters }
    }

    pub(crate) fn emit(&self, event: DriverEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.counters.event_dropped();
                log::trace!("Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
