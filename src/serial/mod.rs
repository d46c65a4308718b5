//! # Serial Communication Module
//!
//! Attaches the framing engine to a real serial device.
//!
//! This module handles:
//! - Opening the serial port (8N1, configurable baud rate)
//! - Auto-detection across common device paths
//! - Bridging async reads/writes to the synchronous byte-at-a-time codec
//! - The monotonic millisecond clock the timeout guard measures against

use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{FramerError, Result};
use crate::framing::link::{FrameHandler, FrameLink};
use crate::framing::protocol::LinkProfile;

pub mod port_trait;

pub use port_trait::{BufferPort, BytePort};

/// Default device paths to try when none is configured (in order of
/// preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// Read chunk size per poll cycle
const READ_CHUNK: usize = 256;

/// Serial-backed framing session
///
/// Owns the serial stream and a [`FrameLink`] over a [`BufferPort`]. The
/// async side reads whatever the device has into the link's inbox, lets the
/// codec pump synchronously, then drains the outbox back to the device.
pub struct SerialSession {
    stream: tokio_serial::SerialStream,
    link: FrameLink<BufferPort>,
    device_path: String,
    origin: Instant,
}

impl std::fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialSession {
    /// Open a session on a specific device
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Line speed
    /// * `profile` - Framing parameters for this link
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened or the profile is
    /// invalid
    pub fn open(path: &str, baud_rate: u32, profile: LinkProfile) -> Result<Self> {
        let stream = Self::open_port(path, baud_rate)?;
        info!("Opened serial device at {}", path);

        Ok(Self {
            stream,
            link: FrameLink::new(BufferPort::new(), profile)?,
            device_path: path.to_string(),
            origin: Instant::now(),
        })
    }

    /// Open a session on the first usable device out of `paths`
    ///
    /// # Errors
    ///
    /// `FramerError::SerialPortNotFound` listing every path tried
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, profile: LinkProfile) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open(path, baud_rate, profile.clone()) {
                Ok(session) => return Ok(session),
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(FramerError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a session, auto-detecting the device
    pub fn open_default(baud_rate: u32, profile: LinkProfile) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate, profile)
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| FramerError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Milliseconds since the session opened (the link's time base)
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// The framing engine
    pub fn link(&self) -> &FrameLink<BufferPort> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut FrameLink<BufferPort> {
        &mut self.link
    }

    /// Await the next chunk from the device and queue it for the codec
    ///
    /// Cancel-safe: nothing is consumed until the read completes, and the
    /// completed chunk is queued before this returns.
    ///
    /// # Returns
    ///
    /// * `usize` - Bytes received
    pub async fn read_chunk(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(FramerError::Serial("serial stream closed".to_string()));
        }

        self.link.port_mut().ingest(&chunk[..n]);
        Ok(n)
    }

    /// Pump queued bytes through the codec and flush whatever it produced
    pub async fn process<H: FrameHandler<BufferPort>>(&mut self, handler: &mut H) -> Result<()> {
        let now = self.now_ms();
        self.link.pump(now, handler)?;
        self.flush_output().await
    }

    /// Write the codec's pending output to the device
    pub async fn flush_output(&mut self) -> Result<()> {
        let out = self.link.port_mut().drain();
        if out.is_empty() {
            return Ok(());
        }

        self.stream
            .write_all(&out)
            .await
            .map_err(|e| FramerError::Serial(format!("Failed to write frame bytes: {}", e)))?;
        self.stream
            .flush()
            .await
            .map_err(|e| FramerError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Flushed {} frame bytes", out.len());
        Ok(())
    }
}
