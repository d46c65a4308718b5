//! # Frame Sender
//!
//! Encodes outgoing frames onto the byte channel: marker, length field,
//! CRC-accumulating payload writes, and the trailer with its corruption
//! sentinels. A frame that ends short of its declared length is padded with
//! zero bytes and its trailer is deliberately corrupted so no receiver can
//! mistake the truncation for a valid frame.

use super::crc::Crc16;
use super::protocol::{LinkProfile, FRAME_ESCAPE, PAD_BYTE};
use crate::error::{FramerError, Result};
use crate::serial::port_trait::BytePort;

/// Diagnostic counters for the send side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxCounters {
    /// Frames finished (clean or broken)
    pub frames_sent: u64,
    /// Attempts to send past the declared length
    pub overruns: u64,
}

/// Frame sender context
///
/// Reset implicitly by every [`Sender::start_frame`]. Copy mode is managed
/// by the link layer: while it is set, bytes arriving at the receiver are
/// forwarded through [`Sender::send_byte`] as they come in.
#[derive(Debug, Default)]
pub struct Sender {
    crc: Crc16,
    declared: usize,
    sent: usize,
    active: bool,
    copying: bool,
    counters: TxCounters,
}

impl Sender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame is open
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the open frame is relaying received bytes live
    pub fn is_copying(&self) -> bool {
        self.copying
    }

    pub(crate) fn set_copying(&mut self, copying: bool) {
        self.copying = copying;
    }

    /// Counter snapshot
    pub fn counters(&self) -> &TxCounters {
        &self.counters
    }

    /// Open a frame: marker (if configured), length field, CRC restart
    ///
    /// # Errors
    ///
    /// * `SendBusy` - The previous frame was never finished
    /// * `LengthOverflow` - `len` is not encodable on this link
    pub fn start_frame<P: BytePort>(
        &mut self,
        port: &mut P,
        profile: &LinkProfile,
        len: usize,
    ) -> Result<()> {
        if self.active {
            return Err(FramerError::SendBusy);
        }

        let (len1, len2) = profile.encode_length(len)?;

        if let Some(marker) = profile.marker {
            port.write_byte(marker)?;
        }

        self.crc.restart();
        self.emit(port, profile, len1)?;
        if let Some(len2) = len2 {
            self.emit(port, profile, len2)?;
        }

        self.declared = len;
        self.sent = 0;
        self.active = true;
        self.copying = false;
        Ok(())
    }

    /// Send one payload byte
    ///
    /// # Errors
    ///
    /// * `SendIdle` - No frame is open
    /// * `SendOverrun` - The declared length is already exhausted; nothing
    ///   is written and the overrun counter is incremented
    pub fn send_byte<P: BytePort>(
        &mut self,
        port: &mut P,
        profile: &LinkProfile,
        byte: u8,
    ) -> Result<()> {
        if !self.active {
            return Err(FramerError::SendIdle);
        }
        if self.sent >= self.declared {
            self.counters.overruns += 1;
            return Err(FramerError::SendOverrun {
                declared: self.declared,
                sent: self.sent,
            });
        }

        self.emit(port, profile, byte)?;
        self.sent += 1;
        Ok(())
    }

    /// Send a whole slice through [`Sender::send_byte`]
    pub fn send_all<P: BytePort>(
        &mut self,
        port: &mut P,
        profile: &LinkProfile,
        data: &[u8],
    ) -> Result<()> {
        for &byte in data {
            self.send_byte(port, profile, byte)?;
        }
        Ok(())
    }

    /// Close the frame and emit the trailer
    ///
    /// Under-sent frames are padded with zero bytes to keep the byte count
    /// balanced and marked short; `broken` marks an otherwise complete frame
    /// unusable. Either condition XOR-s the configured sentinel into the
    /// trailer, leaving a non-zero residue at every receiver.
    pub fn end_frame<P: BytePort>(
        &mut self,
        port: &mut P,
        profile: &LinkProfile,
        broken: bool,
    ) -> Result<()> {
        if !self.active {
            return Err(FramerError::SendIdle);
        }

        let mut short = false;
        while self.sent < self.declared {
            self.emit(port, profile, PAD_BYTE)?;
            self.sent += 1;
            short = true;
        }

        let crc = self.crc.value() ^ profile.corruption.sentinel(broken, short);
        write_stuffed(port, profile, (crc >> 8) as u8)?;
        write_stuffed(port, profile, (crc & 0xFF) as u8)?;

        self.active = false;
        self.copying = false;
        self.counters.frames_sent += 1;
        Ok(())
    }

    /// Fold a byte into the running CRC and put it on the wire
    fn emit<P: BytePort>(&mut self, port: &mut P, profile: &LinkProfile, byte: u8) -> Result<()> {
        self.crc.add(byte);
        write_stuffed(port, profile, byte)
    }
}

/// Write one body byte, escaping marker and escape occurrences in stuffing
/// mode
fn write_stuffed<P: BytePort>(port: &mut P, profile: &LinkProfile, byte: u8) -> Result<()> {
    if profile.stuffing && (Some(byte) == profile.marker || byte == FRAME_ESCAPE) {
        port.write_byte(FRAME_ESCAPE)?;
        port.write_byte(byte & 0x7F)?;
    } else {
        port.write_byte(byte)?;
    }
    Ok(())
}
