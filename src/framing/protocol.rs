//! # Framing Protocol Constants and Types
//!
//! Wire-level definitions shared by the frame receiver and sender.
//!
//! Wire format (length-prefixed mode):
//!
//! ```text
//! [marker?] [len_1] [len_2?] [payload ...] [crc_hi] [crc_lo]
//! ```
//!
//! The length field is one byte when the link's maximum packet size fits in
//! 7 bits. Larger links use the variable-width form: if the first byte's top
//! bit is set, its low 7 bits are the low bits of the length and a second
//! byte carries bits 7..14. The CRC covers the length byte(s) and the
//! payload; the marker is not covered. A frame is valid iff folding the two
//! trailer bytes (high first) into the running accumulator leaves zero.

use crate::error::{FramerError, Result};

/// Frame start marker byte
///
/// Optional per link: deployments without a marker rely purely on the
/// inter-byte timeout for resynchronization.
pub const FRAME_START: u8 = 0x85;

/// Escape byte for the byte-stuffing deployment profile
///
/// In stuffing mode, any body occurrence of the marker or the escape byte is
/// sent as the escape byte followed by the original with its top bit
/// cleared; the receiver restores the bit. Both bytes carry a set top bit,
/// so the transform is lossless.
pub const FRAME_ESCAPE: u8 = 0x84;

/// Largest length the two-byte field can carry (14 bits)
pub const MAX_FRAME_LEN: usize = 0x3FFF;

/// Sentinel XOR-ed into the trailer of a deliberately broken frame
pub const SENTINEL_BROKEN: u16 = 0x0001;

/// Sentinel XOR-ed into the trailer of an under-sent, zero-padded frame
/// (distinct-sentinel policy only)
pub const SENTINEL_SHORT: u16 = 0x0002;

/// Fill byte for under-sent frames
pub const PAD_BYTE: u8 = 0x00;

/// How a frame that must not be accepted downstream is marked
///
/// Both policies corrupt the CRC trailer, which costs no extra wire bytes;
/// they differ in whether a deliberately broken frame and a truncated one
/// are distinguishable by the residue they leave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptionPolicy {
    /// One sentinel for every kind of broken frame
    #[default]
    Single,
    /// Separate sentinels for caller-broken and short frames
    Distinct,
}

impl CorruptionPolicy {
    /// Sentinel to XOR into the outgoing trailer
    ///
    /// # Arguments
    ///
    /// * `broken` - Caller explicitly marked the frame broken
    /// * `short` - Fewer bytes were sent than declared (frame was padded)
    pub fn sentinel(&self, broken: bool, short: bool) -> u16 {
        match self {
            CorruptionPolicy::Single => {
                if broken || short {
                    SENTINEL_BROKEN
                } else {
                    0
                }
            }
            CorruptionPolicy::Distinct => {
                let mut sentinel = 0;
                if broken {
                    sentinel ^= SENTINEL_BROKEN;
                }
                if short {
                    sentinel ^= SENTINEL_SHORT;
                }
                sentinel
            }
        }
    }
}

/// Per-link framing parameters
///
/// One profile per physical stream, fixed at link setup. The stuffing and
/// two-byte-length switches are orthogonal; stuffing additionally requires a
/// marker with its top bit set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkProfile {
    /// Maximum accepted payload length; declared lengths above this put the
    /// receiver into the absorbing error state
    pub max_packet: u16,

    /// Maximum silence between two bytes of one frame, in milliseconds
    pub max_frame_delay_ms: u64,

    /// Frame start marker, or None for timeout-only resynchronization
    pub marker: Option<u8>,

    /// Escape-byte stuffing of marker occurrences in the frame body
    pub stuffing: bool,

    /// Payload byte count after which the header milestone fires
    pub header_watch: usize,

    /// Receive buffer capacity; payload bytes beyond it are counted and
    /// CRC-folded but not stored
    pub recv_buffer: usize,

    /// Trailer corruption sentinel policy
    pub corruption: CorruptionPolicy,
}

impl Default for LinkProfile {
    fn default() -> Self {
        Self {
            max_packet: 127,
            max_frame_delay_ms: 100,
            marker: Some(FRAME_START),
            stuffing: false,
            header_watch: 0,
            recv_buffer: 127,
            corruption: CorruptionPolicy::Single,
        }
    }
}

impl LinkProfile {
    /// Whether this link uses the variable-width (up to two byte) length field
    pub fn wide_length(&self) -> bool {
        self.max_packet > 0x7F
    }

    /// Validate the profile
    ///
    /// # Errors
    ///
    /// Returns `FramerError::Profile` describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.max_packet == 0 || self.max_packet as usize > MAX_FRAME_LEN {
            return Err(FramerError::Profile(format!(
                "max_packet must be between 1 and {}",
                MAX_FRAME_LEN
            )));
        }

        if self.max_frame_delay_ms == 0 {
            return Err(FramerError::Profile(
                "max_frame_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.recv_buffer == 0 {
            return Err(FramerError::Profile(
                "recv_buffer must be greater than 0".to_string(),
            ));
        }

        if self.header_watch > self.recv_buffer {
            return Err(FramerError::Profile(
                "header_watch must not exceed recv_buffer".to_string(),
            ));
        }

        if self.header_watch > self.max_packet as usize {
            return Err(FramerError::Profile(
                "header_watch must not exceed max_packet".to_string(),
            ));
        }

        if self.stuffing {
            match self.marker {
                None => {
                    return Err(FramerError::Profile(
                        "stuffing requires a frame start marker".to_string(),
                    ));
                }
                Some(marker) => {
                    if marker & 0x80 == 0 {
                        return Err(FramerError::Profile(
                            "stuffing requires a marker with the top bit set".to_string(),
                        ));
                    }
                    if marker == FRAME_ESCAPE {
                        return Err(FramerError::Profile(
                            "marker must differ from the escape byte".to_string(),
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Encode a frame length into its wire form
    ///
    /// # Returns
    ///
    /// * `(first, second)` - The length byte(s); `second` is `Some` only in
    ///   the variable-width form.
    ///
    /// # Errors
    ///
    /// `FramerError::LengthOverflow` if the length exceeds `max_packet`, or
    /// is zero on a link whose single-byte length field cannot express it
    /// (a zero length byte reads as a line break on the receive side).
    pub fn encode_length(&self, len: usize) -> Result<(u8, Option<u8>)> {
        if len > self.max_packet as usize {
            return Err(FramerError::LengthOverflow {
                len,
                max: self.max_packet as usize,
            });
        }

        if self.wide_length() {
            if len > 0x7F || len == 0 {
                // Zero takes the two-byte form 0x80 0x00: the single byte
                // 0x00 is reserved as line noise.
                Ok((((len & 0x7F) as u8) | 0x80, Some((len >> 7) as u8)))
            } else {
                Ok((len as u8, None))
            }
        } else {
            if len == 0 {
                return Err(FramerError::LengthOverflow {
                    len,
                    max: self.max_packet as usize,
                });
            }
            Ok((len as u8, None))
        }
    }
}
