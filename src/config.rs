//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::framing::protocol::{CorruptionPolicy, LinkProfile, FRAME_START, MAX_FRAME_LEN};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub link: LinkSettings,
    pub framing: FramingSettings,
    pub stats: StatsSettings,
}

/// Serial link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkSettings {
    /// Device path; empty means auto-detect across the common paths
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Reply to every received frame with an identical one
    #[serde(default)]
    pub echo: bool,
}

/// Framing parameters, mapped onto a [`LinkProfile`]
#[derive(Debug, Deserialize, Clone)]
pub struct FramingSettings {
    #[serde(default = "default_max_packet")]
    pub max_packet: u16,

    #[serde(default = "default_max_frame_delay_ms")]
    pub max_frame_delay_ms: u64,

    #[serde(default = "default_use_start_marker")]
    pub use_start_marker: bool,

    #[serde(default = "default_start_marker")]
    pub start_marker: u8,

    #[serde(default)]
    pub byte_stuffing: bool,

    #[serde(default)]
    pub header_len: usize,

    #[serde(default = "default_recv_buffer")]
    pub recv_buffer: usize,

    #[serde(default = "default_corruption_policy")]
    pub corruption_policy: String,
}

/// Stats logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StatsSettings {
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_stats_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_baud_rate() -> u32 { 115_200 }

fn default_max_packet() -> u16 { 127 }
fn default_max_frame_delay_ms() -> u64 { 100 }
fn default_use_start_marker() -> bool { true }
fn default_start_marker() -> u8 { FRAME_START }
fn default_recv_buffer() -> usize { 127 }
fn default_corruption_policy() -> String { "single".to_string() }

fn default_stats_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_stats_interval_ms() -> u64 { 1000 }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl FramingSettings {
    /// Parse the corruption policy name
    pub fn corruption_policy(&self) -> Result<CorruptionPolicy> {
        match self.corruption_policy.as_str() {
            "single" => Ok(CorruptionPolicy::Single),
            "distinct" => Ok(CorruptionPolicy::Distinct),
            other => Err(crate::error::FramerError::Profile(format!(
                "corruption_policy must be 'single' or 'distinct', got '{}'",
                other
            ))),
        }
    }

    /// Build the runtime link profile these settings describe
    ///
    /// # Errors
    ///
    /// Returns error if the policy name is unknown or the resulting
    /// profile is inconsistent
    pub fn profile(&self) -> Result<LinkProfile> {
        let profile = LinkProfile {
            max_packet: self.max_packet,
            max_frame_delay_ms: self.max_frame_delay_ms,
            marker: self.use_start_marker.then_some(self.start_marker),
            stuffing: self.byte_stuffing,
            header_watch: self.header_len,
            recv_buffer: self.recv_buffer,
            corruption: self.corruption_policy()?,
        };
        profile.validate()?;
        Ok(profile)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use framelink::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate link configuration (an empty port means auto-detect)
        if ![9600, 19200, 38400, 57600, 115_200, 230_400, 460_800, 921_600]
            .contains(&self.link.baud_rate)
        {
            return Err(crate::error::FramerError::Config(toml::de::Error::custom(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600",
            )));
        }

        // Validate framing configuration
        if self.framing.max_packet == 0 || self.framing.max_packet as usize > MAX_FRAME_LEN {
            return Err(crate::error::FramerError::Config(toml::de::Error::custom(
                format!("max_packet must be between 1 and {}", MAX_FRAME_LEN),
            )));
        }

        if self.framing.max_frame_delay_ms == 0 || self.framing.max_frame_delay_ms > 60000 {
            return Err(crate::error::FramerError::Config(toml::de::Error::custom(
                "max_frame_delay_ms must be between 1 and 60000",
            )));
        }

        if self.framing.recv_buffer == 0 {
            return Err(crate::error::FramerError::Config(toml::de::Error::custom(
                "recv_buffer must be greater than 0",
            )));
        }

        if self.framing.header_len > self.framing.recv_buffer {
            return Err(crate::error::FramerError::Config(toml::de::Error::custom(
                "header_len must not exceed recv_buffer",
            )));
        }

        // The marker/stuffing interplay is the profile's own business
        self.framing.profile()?;

        // Validate stats configuration
        if self.stats.enabled && self.stats.log_dir.is_empty() {
            return Err(crate::error::FramerError::Config(toml::de::Error::custom(
                "stats log_dir cannot be empty when enabled",
            )));
        }

        if self.stats.interval_ms == 0 || self.stats.interval_ms > 60000 {
            return Err(crate::error::FramerError::Config(toml::de::Error::custom(
                "interval_ms must be between 1 and 60000",
            )));
        }

        if self.stats.max_records_per_file == 0 {
            return Err(crate::error::FramerError::Config(toml::de::Error::custom(
                "max_records_per_file must be greater than 0",
            )));
        }

        if self.stats.max_files_to_keep == 0 {
            return Err(crate::error::FramerError::Config(toml::de::Error::custom(
                "max_files_to_keep must be greater than 0",
            )));
        }

        Ok(())
    }
}
