//! # Framing Module
//!
//! Bidirectional length-prefixed framing over a raw byte stream.
//!
//! This module handles:
//! - Byte-by-byte frame reassembly with marker and timeout resynchronization
//! - CRC-16 integrity protection with a zero-residue accept check
//! - Frame encoding with underrun padding and corruption sentinels
//! - Passthrough relaying of an in-flight frame's tail
//! - Milestone callbacks (header, deferred read, frame complete)

pub mod crc;
pub mod link;
pub mod protocol;
pub mod receiver;
pub mod sender;
