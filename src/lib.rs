//! # FrameLink Library
//!
//! Length-prefixed, CRC-protected framing for noisy serial links.
//!
//! This library turns a continuous byte stream into discrete,
//! integrity-checked frames and encodes outgoing frames back into the same
//! wire format: optional start marker, 7/14-bit length field, CRC-16
//! trailer verified by a zero-residue check. It targets point-to-point and
//! multi-drop UART links where there is no underlying packet transport and
//! resynchronization has to come from markers and inter-byte timeouts.

pub mod config;
pub mod error;
pub mod framing;
pub mod serial;
pub mod stats;
