//! # FrameLink
//!
//! Serial frame monitor built on the framelink codec.
//!
//! Attaches the framing engine to a serial device, logs every frame the
//! link delivers, optionally echoes frames back, and periodically writes
//! the link's diagnostic counters to a JSONL stats file.

use anyhow::Result;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

mod config;
mod error;
mod framing;
mod serial;
mod stats;

use config::Config;
use framing::link::{FrameHandler, LinkCtrl};
use serial::{BufferPort, SerialSession};
use stats::StatsLogger;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Logs every frame, echoing it back when configured
struct MonitorHandler {
    echo: bool,
    frames: u64,
}

impl FrameHandler<BufferPort> for MonitorHandler {
    fn on_frame(&mut self, link: &mut LinkCtrl<'_, BufferPort>) -> error::Result<()> {
        self.frames += 1;
        info!(
            "frame {}: {} bytes: {:02X?}",
            self.frames,
            link.frame_len(),
            link.payload()
        );

        if self.echo {
            let payload = link.payload().to_vec();
            if payload.is_empty() && !link.profile().wide_length() {
                // A narrow link cannot encode an empty frame
                return Ok(());
            }
            link.start_frame(payload.len())?;
            link.send_all(&payload)?;
            link.end_frame(false)?;
        }
        Ok(())
    }
}

/// Main entry point for the FrameLink monitor
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (path from argv, or `config/default.toml`)
///    - Open the serial session (explicit port, or auto-detect)
///
/// 2. **Main Loop**
///    - Pump received bytes through the framing engine
///    - Log received frames; echo them back when configured
///    - Write a stats snapshot every stats interval
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration is invalid or no serial device can
/// be opened. Recoverable link anomalies (noise, CRC failures, timeouts)
/// are counted and logged, never fatal.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging through a non-blocking stdout writer
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(writer)
        .init();

    info!("FrameLink v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    let profile = config.framing.profile()?;

    let mut session = if config.link.port.is_empty() {
        SerialSession::open_default(config.link.baud_rate, profile)?
    } else {
        SerialSession::open(&config.link.port, config.link.baud_rate, profile)?
    };
    info!("Listening on {}", session.device_path());

    let mut handler = MonitorHandler {
        echo: config.link.echo,
        frames: 0,
    };

    let mut stats_logger = if config.stats.enabled {
        Some(StatsLogger::new(
            &config.stats.log_dir,
            config.stats.max_records_per_file,
            config.stats.max_files_to_keep,
        )?)
    } else {
        None
    };
    let mut stats_interval = interval(Duration::from_millis(config.stats.interval_ms));

    info!("Press Ctrl+C to exit");

    // Main loop
    loop {
        tokio::select! {
            // Bytes arrived: run them through the codec and flush replies
            result = session.read_chunk() => {
                match result {
                    Ok(_) => {
                        if let Err(e) = session.process(&mut handler).await {
                            warn!("link error: {}", e);
                        }
                    }
                    Err(e) => {
                        warn!("serial read failed: {}", e);
                        break;
                    }
                }
            }

            // Periodic stats snapshot
            _ = stats_interval.tick() => {
                let snapshot = session.link().stats();
                if let Some(logger) = stats_logger.as_mut() {
                    if let Err(e) = logger.log(&snapshot) {
                        warn!("stats logging failed: {}", e);
                    }
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let final_stats = session.link().stats();
    info!(
        "Frames received: {}, errors: {}",
        final_stats.frames_ok,
        final_stats.error_total()
    );

    Ok(())
}
