//! Trait abstraction for the byte channel the codec talks to, to enable testing

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;

/// Trait for non-blocking byte channel operations
///
/// The framing engine is cooperative and single-threaded: it only ever asks
/// for bytes the channel already has (`bytes_ready`) and writes are direct,
/// synchronous handoffs. Real serial ports sit behind [`BufferPort`], which
/// bridges this interface to async I/O.
pub trait BytePort {
    /// Number of bytes that can be read without blocking
    fn bytes_ready(&mut self) -> io::Result<usize>;

    /// Read one byte; must not be called when none are ready
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Write one byte to the channel
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;
}

/// In-memory port pairing an inbox of received bytes with an outbox of
/// pending writes
///
/// The async side pushes whatever a serial read returned into the inbox
/// (`ingest`), lets the codec pump, then drains the outbox into an async
/// write. The codec itself never awaits.
#[derive(Debug, Default)]
pub struct BufferPort {
    inbox: BytesMut,
    outbox: BytesMut,
}

impl BufferPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes to the inbox
    pub fn ingest(&mut self, data: &[u8]) {
        self.inbox.extend_from_slice(data);
    }

    /// Take all pending output, leaving the outbox empty
    pub fn drain(&mut self) -> Bytes {
        self.outbox.split().freeze()
    }

    /// Pending output without draining it
    pub fn pending_output(&self) -> &[u8] {
        &self.outbox
    }
}

impl BytePort for BufferPort {
    fn bytes_ready(&mut self) -> io::Result<usize> {
        Ok(self.inbox.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        if self.inbox.is_empty() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "inbox empty"));
        }
        Ok(self.inbox.get_u8())
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.outbox.put_u8(byte);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_port_ingest_and_read() {
        let mut port = BufferPort::new();
        port.ingest(&[0x01, 0x02]);

        assert_eq!(port.bytes_ready().unwrap(), 2);
        assert_eq!(port.read_byte().unwrap(), 0x01);
        assert_eq!(port.read_byte().unwrap(), 0x02);
        assert_eq!(port.bytes_ready().unwrap(), 0);
        assert!(port.read_byte().is_err());
    }

    #[test]
    fn test_buffer_port_write_and_drain() {
        let mut port = BufferPort::new();
        port.write_byte(0xAA).unwrap();
        port.write_byte(0xBB).unwrap();

        assert_eq!(port.pending_output(), &[0xAA, 0xBB]);

        let out = port.drain();
        assert_eq!(out.as_ref(), &[0xAA, 0xBB]);
        assert!(port.pending_output().is_empty());
    }
}
