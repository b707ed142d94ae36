//! Transport layer for I/O abstraction
//!
//! The protocol engine only ever sees a [`Transport`]: a blocking byte stream
//! with a read timeout. Closing the stream is dropping it.

use crate::error::Result;

mod mock;
mod serial;
pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Transport trait for dongle communication
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    ///
    /// Returns `Ok(0)` when the read timeout elapsed without data.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Discard any received bytes not yet read
    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    /// Write the whole buffer, retrying short writes
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
            }
            data = &data[n..];
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        (**self).read(buffer)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }
}
