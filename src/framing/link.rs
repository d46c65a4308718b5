//! # Frame Link
//!
//! Ties one receiver, one sender, and one byte port into a bidirectional
//! framing engine.
//!
//! This module handles:
//! - Pumping ready bytes from the port through the receiver
//! - Dispatching the synchronous milestone callbacks (header, read, frame)
//! - Passthrough relaying: forwarding received payload bytes live into an
//!   outgoing frame opened by `start_copy`
//! - Closing a relayed frame clean or broken so corruption status crosses
//!   the hop without a side channel
//!
//! Callbacks run inline, within the byte-processing call, and receive a
//! [`LinkCtrl`] handle through which they may inspect the frame so far,
//! rewrite its header in place, reply, or begin a copy. They must return
//! promptly: the next byte's timeout measurement depends on it.

use tracing::warn;

use super::protocol::LinkProfile;
use super::receiver::{Receiver, RxDone};
use super::sender::Sender;
use crate::error::{FramerError, Result};
use crate::serial::port_trait::BytePort;
use crate::stats::LinkStats;

/// Milestone callbacks, invoked synchronously from inside byte processing
///
/// All methods default to doing nothing; implement only the milestones the
/// application cares about. Errors propagate out of `feed`/`pump`.
pub trait FrameHandler<P: BytePort> {
    /// The configured header watch length has been received
    fn on_header(&mut self, _link: &mut LinkCtrl<'_, P>) -> Result<()> {
        Ok(())
    }

    /// A deferred read registered with [`LinkCtrl::read_more`] completed
    fn on_read(&mut self, _link: &mut LinkCtrl<'_, P>) -> Result<()> {
        Ok(())
    }

    /// A frame arrived intact; its payload is available via
    /// [`LinkCtrl::payload`]
    fn on_frame(&mut self, _link: &mut LinkCtrl<'_, P>) -> Result<()> {
        Ok(())
    }
}

/// Bidirectional framing engine for one physical stream
///
/// Owns the receive buffer (fixed capacity, from the profile), the
/// receiver and sender contexts, and the byte port. Not internally
/// synchronized: a host integrating this across threads must serialize all
/// entry points externally.
#[derive(Debug)]
pub struct FrameLink<P: BytePort> {
    port: P,
    profile: LinkProfile,
    buf: Vec<u8>,
    rx: Receiver,
    tx: Sender,
}

impl<P: BytePort> FrameLink<P> {
    /// Create a link over `port` with the given profile
    ///
    /// # Errors
    ///
    /// `FramerError::Profile` if the profile is inconsistent.
    pub fn new(port: P, profile: LinkProfile) -> Result<Self> {
        profile.validate()?;
        let buf = vec![0u8; profile.recv_buffer];
        Ok(Self {
            port,
            profile,
            buf,
            rx: Receiver::new(),
            tx: Sender::new(),
        })
    }

    pub fn profile(&self) -> &LinkProfile {
        &self.profile
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Combined diagnostic counter snapshot
    pub fn stats(&self) -> LinkStats {
        LinkStats::from_counters(self.rx.counters(), self.tx.counters())
    }

    /// Force the receiver to idle, discarding any partial frame
    pub fn reset(&mut self) {
        self.rx.reset();
    }

    /// Process every byte the port has ready
    pub fn pump<H: FrameHandler<P>>(&mut self, now_ms: u64, handler: &mut H) -> Result<()> {
        while self.port.bytes_ready()? > 0 {
            let byte = self.port.read_byte()?;
            self.feed(byte, now_ms, handler)?;
        }
        Ok(())
    }

    /// Process one received byte
    pub fn feed<H: FrameHandler<P>>(&mut self, byte: u8, now_ms: u64, handler: &mut H) -> Result<()> {
        let step = self.rx.push(byte, now_ms, &mut self.buf, &self.profile);

        if step.timed_out && self.tx.is_copying() {
            // The inbound frame this copy was relaying died mid-stream;
            // close the outgoing half so the downstream peer rejects it.
            self.tx.end_frame(&mut self.port, &self.profile, true)?;
        }

        if let Some(relayed) = step.relay {
            if self.tx.is_copying() {
                match self.tx.send_byte(&mut self.port, &self.profile, relayed) {
                    Ok(()) => {}
                    Err(FramerError::SendOverrun { .. }) => {
                        warn!("relayed byte beyond declared copy length dropped");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if step.header {
            handler.on_header(&mut self.ctrl(None))?;
        }
        if step.read {
            handler.on_read(&mut self.ctrl(None))?;
        }

        match step.done {
            Some(RxDone::Accepted { len }) => {
                handler.on_frame(&mut self.ctrl(Some(len)))?;
                if self.tx.is_copying() {
                    self.tx.end_frame(&mut self.port, &self.profile, false)?;
                }
            }
            Some(RxDone::Rejected) => {
                if self.tx.is_copying() {
                    self.tx.end_frame(&mut self.port, &self.profile, true)?;
                }
            }
            None => {}
        }

        Ok(())
    }

    /// Open an outgoing frame (see [`Sender::start_frame`])
    pub fn start_frame(&mut self, len: usize) -> Result<()> {
        self.tx.start_frame(&mut self.port, &self.profile, len)
    }

    /// Send one payload byte of the open frame
    pub fn send(&mut self, byte: u8) -> Result<()> {
        self.tx.send_byte(&mut self.port, &self.profile, byte)
    }

    /// Send a slice of payload bytes
    pub fn send_all(&mut self, data: &[u8]) -> Result<()> {
        self.tx.send_all(&mut self.port, &self.profile, data)
    }

    /// Close the open frame
    pub fn end_frame(&mut self, broken: bool) -> Result<()> {
        self.tx.end_frame(&mut self.port, &self.profile, broken)
    }

    fn ctrl(&mut self, frame_len: Option<usize>) -> LinkCtrl<'_, P> {
        LinkCtrl {
            profile: &self.profile,
            buf: self.buf.as_mut_slice(),
            rx: &mut self.rx,
            tx: &mut self.tx,
            port: &mut self.port,
            frame_len,
        }
    }
}

/// Control handle passed to milestone callbacks
///
/// Borrows the link's parts for the duration of one callback. Everything a
/// callback may legitimately do goes through here: inspect or rewrite the
/// frame received so far, register a deferred read, reply with a fresh
/// frame, or begin relaying the rest of the inbound frame.
pub struct LinkCtrl<'a, P: BytePort> {
    profile: &'a LinkProfile,
    buf: &'a mut [u8],
    rx: &'a mut Receiver,
    tx: &'a mut Sender,
    port: &'a mut P,
    frame_len: Option<usize>,
}

impl<'a, P: BytePort> LinkCtrl<'a, P> {
    pub fn profile(&self) -> &LinkProfile {
        self.profile
    }

    /// Header bytes received so far (up to the header watch length)
    ///
    /// Meaningful during `on_header` and `on_read`; empty once the frame
    /// has completed.
    pub fn header(&self) -> &[u8] {
        let n = self.profile.header_watch.min(self.rx.pos()).min(self.buf.len());
        &self.buf[..n]
    }

    /// Mutable view of the header bytes, for in-place rewriting before a
    /// copy (e.g. changing an address field)
    pub fn header_mut(&mut self) -> &mut [u8] {
        let n = self.profile.header_watch.min(self.rx.pos()).min(self.buf.len());
        &mut self.buf[..n]
    }

    /// Payload of the completed frame, truncated to the buffer capacity
    ///
    /// Only meaningful during `on_frame`.
    pub fn payload(&self) -> &[u8] {
        let len = self.frame_len.unwrap_or(0).min(self.buf.len());
        &self.buf[..len]
    }

    /// Wire payload length of the completed frame, which may exceed what
    /// the buffer could store
    pub fn frame_len(&self) -> usize {
        self.frame_len.unwrap_or(0)
    }

    /// Register a deferred read: `on_read` fires after `n` more payload
    /// bytes; those bytes are never relayed
    pub fn read_more(&mut self, n: usize) {
        self.rx.request_read(n);
    }

    /// Open an outgoing frame
    pub fn start_frame(&mut self, len: usize) -> Result<()> {
        self.tx.start_frame(self.port, self.profile, len)
    }

    /// Send one payload byte of the open frame
    pub fn send(&mut self, byte: u8) -> Result<()> {
        self.tx.send_byte(self.port, self.profile, byte)
    }

    /// Send a slice of payload bytes
    pub fn send_all(&mut self, data: &[u8]) -> Result<()> {
        self.tx.send_all(self.port, self.profile, data)
    }

    /// Close the open frame
    pub fn end_frame(&mut self, broken: bool) -> Result<()> {
        self.tx.end_frame(self.port, self.profile, broken)
    }

    /// Begin relaying the inbound frame into an outgoing one
    ///
    /// Opens a frame of length `declared + add_len - consumed_beyond_header`
    /// (so bytes already swallowed by a deferred read shrink the copy),
    /// re-sends the header bytes from the receive buffer (rewritten or not)
    /// and switches the sender into copy mode: every subsequent payload
    /// byte the receiver takes in is forwarded as it arrives. The link
    /// closes the copy when the inbound frame completes, clean on accept,
    /// broken on CRC failure or timeout.
    ///
    /// Call from `on_header` (or `on_read`); the receive buffer is
    /// guaranteed to hold the header bytes at that point.
    pub fn start_copy(&mut self, add_len: isize) -> Result<()> {
        let consumed = self.rx.pos() as isize - self.profile.header_watch as isize;
        let len = self.rx.declared_len() as isize + add_len - consumed;
        if len < 0 {
            return Err(FramerError::CopyRange(len));
        }

        self.tx.start_frame(self.port, self.profile, len as usize)?;

        let header = self.profile.header_watch.min(self.buf.len());
        for i in 0..header {
            self.tx.send_byte(self.port, self.profile, self.buf[i])?;
        }

        self.tx.set_copying(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::crc::crc16_buffer;
    use crate::framing::protocol::{CorruptionPolicy, FRAME_ESCAPE, FRAME_START};
    use crate::serial::port_trait::mocks::MockPort;
    use crate::serial::port_trait::BufferPort;

    fn bare_profile() -> LinkProfile {
        LinkProfile {
            marker: None,
            ..LinkProfile::default()
        }
    }

    /// Records every milestone with the data visible at that moment
    #[derive(Debug, Default)]
    struct Recorder {
        headers: Vec<Vec<u8>>,
        reads: usize,
        frames: Vec<(Vec<u8>, usize)>,
    }

    impl<P: BytePort> FrameHandler<P> for Recorder {
        fn on_header(&mut self, link: &mut LinkCtrl<'_, P>) -> Result<()> {
            self.headers.push(link.header().to_vec());
            Ok(())
        }

        fn on_read(&mut self, _link: &mut LinkCtrl<'_, P>) -> Result<()> {
            self.reads += 1;
            Ok(())
        }

        fn on_frame(&mut self, link: &mut LinkCtrl<'_, P>) -> Result<()> {
            self.frames.push((link.payload().to_vec(), link.frame_len()));
            Ok(())
        }
    }

    /// Starts a copy as soon as the header milestone fires
    struct CopyOnHeader {
        add_len: isize,
    }

    impl<P: BytePort> FrameHandler<P> for CopyOnHeader {
        fn on_header(&mut self, link: &mut LinkCtrl<'_, P>) -> Result<()> {
            link.start_copy(self.add_len)
        }
    }

    fn encode(link_profile: &LinkProfile, payload: &[u8]) -> Vec<u8> {
        let mut link = FrameLink::new(BufferPort::new(), link_profile.clone()).unwrap();
        link.start_frame(payload.len()).unwrap();
        link.send_all(payload).unwrap();
        link.end_frame(false).unwrap();
        link.port_mut().drain().to_vec()
    }

    #[test]
    fn test_round_trip_golden_frame() {
        let profile = bare_profile();
        let wire = encode(&profile, &[0x01, 0x02, 0x03]);
        assert_eq!(wire, vec![0x03, 0x01, 0x02, 0x03, 0xC8, 0x8C]);

        let mut link = FrameLink::new(BufferPort::new(), profile).unwrap();
        let mut recorder = Recorder::default();
        link.port_mut().ingest(&wire);
        link.pump(0, &mut recorder).unwrap();

        assert_eq!(recorder.frames, vec![(vec![0x01, 0x02, 0x03], 3)]);
        let stats = link.stats();
        assert_eq!(stats.frames_ok, 1);
        assert_eq!(stats.crc_failures, 0);
        assert_eq!(stats.timeouts, 0);
        assert_eq!(stats.junk_bytes, 0);
    }

    #[test]
    fn test_round_trip_all_lengths() {
        let mut profile = bare_profile();
        profile.max_packet = 300;
        profile.recv_buffer = 300;

        for len in [0usize, 1, 7, 127, 128, 300] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let wire = encode(&profile, &payload);

            let mut link = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();
            let mut recorder = Recorder::default();
            link.port_mut().ingest(&wire);
            link.pump(0, &mut recorder).unwrap();

            assert_eq!(recorder.frames, vec![(payload, len)], "length {}", len);
        }
    }

    #[test]
    fn test_chunked_and_whole_feeding_are_identical() {
        let profile = bare_profile();
        let mut wire = Vec::new();
        wire.extend(encode(&profile, &[0x01, 0x02, 0x03]));
        wire.extend([0x00]); // line-break noise between frames
        wire.extend(encode(&profile, &[0xAA]));

        // Whole-buffer feeding
        let mut whole = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();
        let mut whole_rec = Recorder::default();
        whole.port_mut().ingest(&wire);
        whole.pump(0, &mut whole_rec).unwrap();

        // Byte-at-a-time feeding
        let mut single = FrameLink::new(BufferPort::new(), profile).unwrap();
        let mut single_rec = Recorder::default();
        for &byte in &wire {
            single.feed(byte, 0, &mut single_rec).unwrap();
        }

        assert_eq!(whole_rec.frames, single_rec.frames);
        assert_eq!(whole_rec.headers, single_rec.headers);
        assert_eq!(whole_rec.reads, single_rec.reads);
        assert_eq!(whole.stats(), single.stats());
    }

    #[test]
    fn test_timeout_then_fresh_frame_decodes() {
        let profile = bare_profile();
        let mut link = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();
        let mut recorder = Recorder::default();

        // Truncated frame: length and two of three payload bytes
        for &byte in &[0x03, 0x01, 0x02] {
            link.feed(byte, 0, &mut recorder).unwrap();
        }
        assert!(recorder.frames.is_empty());

        // Fresh valid frame after the gap
        let wire = encode(&profile, &[0x04, 0x05]);
        for &byte in &wire {
            link.feed(byte, 250, &mut recorder).unwrap();
        }

        assert_eq!(recorder.frames, vec![(vec![0x04, 0x05], 2)]);
        assert_eq!(link.stats().timeouts, 1);
    }

    #[test]
    fn test_oversize_declared_length_blocks_until_timeout() {
        let profile = bare_profile();
        let mut link = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();
        let mut recorder = Recorder::default();

        link.feed(0xF0, 0, &mut recorder).unwrap(); // declared 240 > 127

        let wire = encode(&profile, &[0x01]);
        for &byte in &wire {
            link.feed(byte, 1, &mut recorder).unwrap();
        }
        assert!(recorder.frames.is_empty(), "no frame while in the error state");

        for &byte in &wire {
            link.feed(byte, 500, &mut recorder).unwrap();
        }
        assert_eq!(recorder.frames.len(), 1, "timeout released the error state");
    }

    #[test]
    fn test_relay_forwards_remaining_bytes_live() {
        let mut profile = bare_profile();
        profile.header_watch = 2;
        let mut link = FrameLink::new(BufferPort::new(), profile).unwrap();
        let mut handler = CopyOnHeader { add_len: 0 };

        // Inbound: len 5, payload A0..A4, CRC over [05, A0..A4] = 0xB435
        let inbound = [0x05, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xB4, 0x35];

        // Feed through the header byte; the copy opens and replays the
        // header immediately
        for &byte in &inbound[..3] {
            link.feed(byte, 0, &mut handler).unwrap();
        }
        assert_eq!(link.port_mut().pending_output(), &[0x05, 0xA0, 0xA1]);

        // Each remaining payload byte appears on the output as it arrives,
        // before the trailer ever does
        link.feed(inbound[3], 0, &mut handler).unwrap();
        assert_eq!(link.port_mut().pending_output(), &[0x05, 0xA0, 0xA1, 0xA2]);
        link.feed(inbound[4], 0, &mut handler).unwrap();
        link.feed(inbound[5], 0, &mut handler).unwrap();
        assert_eq!(
            link.port_mut().pending_output(),
            &[0x05, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4]
        );

        // Trailer bytes close the copy with its own (identical) CRC
        link.feed(inbound[6], 0, &mut handler).unwrap();
        link.feed(inbound[7], 0, &mut handler).unwrap();
        assert_eq!(link.port_mut().drain().to_vec(), inbound.to_vec());
    }

    #[test]
    fn test_relayed_frame_decodes_downstream() {
        let mut profile = bare_profile();
        profile.header_watch = 2;
        let mut relay = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();
        let mut handler = CopyOnHeader { add_len: 0 };

        let inbound = [0x05, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xB4, 0x35];
        relay.port_mut().ingest(&inbound);
        relay.pump(0, &mut handler).unwrap();
        let relayed = relay.port_mut().drain();

        let mut downstream = FrameLink::new(BufferPort::new(), profile).unwrap();
        let mut recorder = Recorder::default();
        downstream.port_mut().ingest(&relayed);
        downstream.pump(0, &mut recorder).unwrap();

        assert_eq!(
            recorder.frames,
            vec![(vec![0xA0, 0xA1, 0xA2, 0xA3, 0xA4], 5)]
        );
    }

    #[test]
    fn test_relay_with_rewritten_header() {
        let mut profile = bare_profile();
        profile.header_watch = 2;
        let mut relay = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();

        struct RewriteAndCopy;
        impl<P: BytePort> FrameHandler<P> for RewriteAndCopy {
            fn on_header(&mut self, link: &mut LinkCtrl<'_, P>) -> Result<()> {
                link.header_mut()[0] = 0xB0;
                link.start_copy(0)
            }
        }

        let inbound = [0x05, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xB4, 0x35];
        relay.port_mut().ingest(&inbound);
        relay.pump(0, &mut RewriteAndCopy).unwrap();
        let relayed = relay.port_mut().drain().to_vec();

        let expected_crc = crc16_buffer(&[0x05, 0xB0, 0xA1, 0xA2, 0xA3, 0xA4]);
        let mut expected = vec![0x05, 0xB0, 0xA1, 0xA2, 0xA3, 0xA4];
        expected.push((expected_crc >> 8) as u8);
        expected.push((expected_crc & 0xFF) as u8);
        assert_eq!(relayed, expected);
    }

    #[test]
    fn test_corrupt_inbound_breaks_the_relayed_copy() {
        let mut profile = bare_profile();
        profile.header_watch = 2;
        let mut relay = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();
        let mut handler = CopyOnHeader { add_len: 0 };

        // Last trailer byte flipped: inbound CRC check fails
        let inbound = [0x05, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xB4, 0x34];
        relay.port_mut().ingest(&inbound);
        relay.pump(0, &mut handler).unwrap();
        let relayed = relay.port_mut().drain();

        // The copy went out with the broken sentinel: downstream rejects it
        let mut downstream = FrameLink::new(BufferPort::new(), profile).unwrap();
        let mut recorder = Recorder::default();
        downstream.port_mut().ingest(&relayed);
        downstream.pump(0, &mut recorder).unwrap();

        assert!(recorder.frames.is_empty());
        assert_eq!(downstream.stats().crc_failures, 1);
        assert_eq!(relay.stats().crc_failures, 1);
    }

    #[test]
    fn test_timeout_mid_copy_closes_broken() {
        let mut profile = bare_profile();
        profile.header_watch = 2;
        let mut relay = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();
        let mut handler = CopyOnHeader { add_len: 0 };

        for &byte in &[0x05, 0xA0, 0xA1, 0xA2] {
            relay.feed(byte, 0, &mut handler).unwrap();
        }

        // The line stalls; the next byte arrives far too late and the
        // half-relayed copy must close broken before it is interpreted
        relay.feed(0x03, 400, &mut handler).unwrap();
        let out = relay.port_mut().drain().to_vec();

        // Header + one forwarded byte, then two pads and a corrupted trailer
        assert_eq!(&out[..4], &[0x05, 0xA0, 0xA1, 0xA2]);
        assert_eq!(out.len(), 8);
        assert_eq!(&out[4..6], &[0x00, 0x00]);

        let mut downstream = FrameLink::new(BufferPort::new(), profile).unwrap();
        let mut recorder = Recorder::default();
        downstream.port_mut().ingest(&out);
        downstream.pump(0, &mut recorder).unwrap();
        assert!(recorder.frames.is_empty());
    }

    #[test]
    fn test_deferred_read_shrinks_the_copy() {
        let mut profile = bare_profile();
        profile.header_watch = 2;
        let mut relay = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();

        // Consume two bytes after the header before relaying the rest: the
        // copy's declared length drops by the two swallowed bytes.
        struct ReadThenCopy;
        impl<P: BytePort> FrameHandler<P> for ReadThenCopy {
            fn on_header(&mut self, link: &mut LinkCtrl<'_, P>) -> Result<()> {
                link.read_more(2);
                Ok(())
            }
            fn on_read(&mut self, link: &mut LinkCtrl<'_, P>) -> Result<()> {
                link.start_copy(0)
            }
        }

        let inbound = [0x05, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xB4, 0x35];
        relay.port_mut().ingest(&inbound);
        relay.pump(0, &mut ReadThenCopy).unwrap();
        let relayed = relay.port_mut().drain().to_vec();

        let expected_crc = crc16_buffer(&[0x03, 0xA0, 0xA1, 0xA4]);
        let mut expected = vec![0x03, 0xA0, 0xA1, 0xA4];
        expected.push((expected_crc >> 8) as u8);
        expected.push((expected_crc & 0xFF) as u8);
        assert_eq!(relayed, expected);
    }

    #[test]
    fn test_stuffed_link_round_trip() {
        let profile = LinkProfile {
            stuffing: true,
            ..LinkProfile::default()
        };

        let payload = [0x85, 0x84, 0x10, FRAME_START, FRAME_ESCAPE];
        let wire = encode(&profile, &payload);

        // Only the frame start itself travels as a raw marker
        assert_eq!(wire[0], FRAME_START);
        assert!(
            !wire[1..].contains(&FRAME_START),
            "raw marker inside the stuffed body: {:02X?}",
            wire
        );

        let mut link = FrameLink::new(BufferPort::new(), profile).unwrap();
        let mut recorder = Recorder::default();
        link.port_mut().ingest(&wire);
        link.pump(0, &mut recorder).unwrap();

        assert_eq!(recorder.frames, vec![(payload.to_vec(), payload.len())]);
    }

    #[test]
    fn test_reply_from_frame_callback() {
        let profile = bare_profile();
        let mut link = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();

        // Echo every frame back
        struct Echo;
        impl<P: BytePort> FrameHandler<P> for Echo {
            fn on_frame(&mut self, link: &mut LinkCtrl<'_, P>) -> Result<()> {
                let payload = link.payload().to_vec();
                link.start_frame(payload.len())?;
                link.send_all(&payload)?;
                link.end_frame(false)
            }
        }

        let wire = encode(&profile, &[0x01, 0x02, 0x03]);
        link.port_mut().ingest(&wire);
        link.pump(0, &mut Echo).unwrap();

        assert_eq!(link.port_mut().drain().to_vec(), wire);
    }

    #[test]
    fn test_payload_truncated_to_buffer_capacity() {
        let mut profile = bare_profile();
        profile.recv_buffer = 2;
        let mut link = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();
        let mut recorder = Recorder::default();

        let wire = encode(&bare_profile(), &[0x01, 0x02, 0x03]);
        link.port_mut().ingest(&wire);
        link.pump(0, &mut recorder).unwrap();

        assert_eq!(recorder.frames, vec![(vec![0x01, 0x02], 3)]);
    }

    #[test]
    fn test_header_contents_at_milestone() {
        let mut profile = bare_profile();
        profile.header_watch = 2;
        let mut link = FrameLink::new(BufferPort::new(), profile.clone()).unwrap();
        let mut recorder = Recorder::default();

        let wire = encode(&profile, &[0xA0, 0xA1, 0xA2]);
        link.port_mut().ingest(&wire);
        link.pump(0, &mut recorder).unwrap();

        assert_eq!(recorder.headers, vec![vec![0xA0, 0xA1]]);
    }

    #[test]
    fn test_send_overrun_surfaces_through_link() {
        let profile = bare_profile();
        let mut link = FrameLink::new(BufferPort::new(), profile).unwrap();

        link.start_frame(1).unwrap();
        link.send(0xAA).unwrap();
        assert!(matches!(
            link.send(0xBB),
            Err(FramerError::SendOverrun { .. })
        ));
        assert_eq!(link.stats().send_overruns, 1);
    }

    #[test]
    fn test_pump_drains_every_ready_byte() {
        let profile = bare_profile();
        let port = MockPort::with_incoming(&[0x03, 0x01, 0x02, 0x03, 0xC8, 0x8C]);
        let mut link = FrameLink::new(port, profile).unwrap();
        let mut recorder = Recorder::default();

        link.pump(0, &mut recorder).unwrap();

        assert_eq!(recorder.frames, vec![(vec![0x01, 0x02, 0x03], 3)]);
        assert_eq!(link.port_mut().incoming.len(), 0);
    }

    #[test]
    fn test_pump_propagates_read_errors() {
        let mut port = MockPort::with_incoming(&[0x01]);
        port.set_read_error(std::io::ErrorKind::BrokenPipe);
        let mut link = FrameLink::new(port, bare_profile()).unwrap();
        let mut recorder = Recorder::default();

        assert!(matches!(
            link.pump(0, &mut recorder),
            Err(FramerError::Io(_))
        ));
    }

    #[test]
    fn test_distinct_policy_round_trips_clean_frames() {
        let profile = LinkProfile {
            marker: None,
            corruption: CorruptionPolicy::Distinct,
            ..LinkProfile::default()
        };

        let wire = encode(&profile, &[0x01, 0x02, 0x03]);
        let mut link = FrameLink::new(BufferPort::new(), profile).unwrap();
        let mut recorder = Recorder::default();
        link.port_mut().ingest(&wire);
        link.pump(0, &mut recorder).unwrap();

        assert_eq!(recorder.frames.len(), 1);
    }
}
