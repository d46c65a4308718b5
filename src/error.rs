//! # Error Types
//!
//! Custom error types for framelink using `thiserror`.

use thiserror::Error;

/// Main error type for framelink
#[derive(Debug, Error)]
pub enum FramerError {
    /// Link profile rejected at construction
    #[error("invalid link profile: {0}")]
    Profile(String),

    /// Frame length cannot be represented on the wire
    #[error("frame length {len} not encodable (max packet {max})")]
    LengthOverflow { len: usize, max: usize },

    /// Relay length computed by start_copy fell outside the valid range
    #[error("relay length {0} out of range")]
    CopyRange(isize),

    /// More bytes sent than the open frame declared
    #[error("frame overrun: {declared} bytes declared, byte {sent} attempted")]
    SendOverrun { declared: usize, sent: usize },

    /// Send operation attempted with no frame open
    #[error("send attempted with no frame open")]
    SendIdle,

    /// A new frame started while the previous one is still open
    #[error("a frame is already being sent")]
    SendBusy,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stats serialization errors
    #[error("Stats encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No serial device could be opened
    #[error("Serial port not found: {0}")]
    SerialPortNotFound(String),
}

/// Result type alias for framelink
pub type Result<T> = std::result::Result<T, FramerError>;
