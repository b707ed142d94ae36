//! Mock transport for testing and dongle simulation
//!
//! Clones share the same buffers, so a test can keep one handle while the
//! driver owns another.

use super::Transport;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Mock transport with scripted replies
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    /// One-shot replies queued when a write matches the trigger bytes
    replies: Vec<(Vec<u8>, Vec<u8>)>,
    read_error: Option<std::io::ErrorKind>,
    clears: usize,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                read_buffer: VecDeque::new(),
                write_buffer: Vec::new(),
                replies: Vec::new(),
                read_error: None,
                clears: 0,
            })),
        }
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Queue `reply` for reading once a write equal to `trigger` arrives
    ///
    /// Each registration fires once; register the same trigger twice to
    /// answer it twice.
    pub fn respond_to(&self, trigger: &[u8], reply: &[u8]) {
        self.inner
            .lock()
            .replies
            .push((trigger.to_vec(), reply.to_vec()));
    }

    /// Make every read fail with `kind` until cleared with `None`
    pub fn set_read_error(&self, kind: Option<std::io::ErrorKind>) {
        self.inner.lock().read_error = kind;
    }

    /// Get all written data
    pub fn get_written(&self) -> Vec<u8> {
        self.inner.lock().write_buffer.clone()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        self.inner.lock().write_buffer.clear();
    }

    /// Bytes still waiting to be read
    pub fn pending_read(&self) -> usize {
        self.inner.lock().read_buffer.len()
    }

    /// Number of times the input buffer was discarded
    pub fn clear_count(&self) -> usize {
        self.inner.lock().clears
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if let Some(kind) = inner.read_error {
            return Err(std::io::Error::from(kind).into());
        }

        let available = inner.read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer
            .iter_mut()
            .zip(inner.read_buffer.drain(..available))
        {
            *slot = byte;
        }

        Ok(available)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        inner.write_buffer.extend_from_slice(data);

        if let Some(pos) = inner.replies.iter().position(|(t, _)| t == data) {
            let (_, reply) = inner.replies.remove(pos);
            inner.read_buffer.extend(reply);
        }

        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.read_buffer.clear();
        inner.clears += 1;
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_drains_injected_bytes() {
        let mut mock = MockTransport::new();
        mock.inject_read(&[1, 2, 3]);

        let mut buf = [0u8; 2];
        assert_eq!(mock.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(mock.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(mock.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_scripted_reply_fires_once() {
        let mut mock = MockTransport::new();
        mock.respond_to(&[0xC2], &[0xAA, 0xAA]);

        mock.write_all(&[0xC1]).unwrap();
        assert_eq!(mock.pending_read(), 0);

        mock.write_all(&[0xC2]).unwrap();
        assert_eq!(mock.pending_read(), 2);

        mock.write_all(&[0xC2]).unwrap();
        assert_eq!(mock.pending_read(), 2);
        assert_eq!(mock.get_written(), vec![0xC1, 0xC2, 0xC2]);
    }

    #[test]
    fn test_clear_discards_input() {
        let mut mock = MockTransport::new();
        mock.inject_read(&[9, 9, 9]);
        mock.clear().unwrap();
        assert_eq!(mock.pending_read(), 0);
        assert_eq!(mock.clear_count(), 1);
    }

    #[test]
    fn test_read_error() {
        let mut mock = MockTransport::new();
        mock.set_read_error(Some(std::io::ErrorKind::BrokenPipe));
        let mut buf = [0u8; 1];
        assert!(mock.read(&mut buf).is_err());

        mock.set_read_error(None);
        assert_eq!(mock.read(&mut buf).unwrap(), 0);
    }
}
