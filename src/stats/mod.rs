//! # Link Statistics Module
//!
//! Handles link diagnostic logging to JSONL files with rotation.
//!
//! This module handles:
//! - Snapshotting the per-link diagnostic counters
//! - Formatting snapshots as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Managing file rotation (max N records per file)
//! - Retaining only the last M files
//!
//! Every counter lives on the link instance, not in module state, so a
//! process can run several independent links and log each one separately.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::framing::receiver::RxCounters;
use crate::framing::sender::TxCounters;

/// Snapshot of one link's diagnostic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Frames received intact
    pub frames_ok: u64,
    /// Frames dropped on a CRC residue
    pub crc_failures: u64,
    /// Frames abandoned by the inter-byte timeout
    pub timeouts: u64,
    /// Bytes discarded while hunting for a frame start
    pub junk_bytes: u64,
    /// Frames transmitted (clean or deliberately broken)
    pub frames_sent: u64,
    /// Attempts to send past a frame's declared length
    pub send_overruns: u64,
}

impl LinkStats {
    pub(crate) fn from_counters(rx: &RxCounters, tx: &TxCounters) -> Self {
        Self {
            frames_ok: rx.frames_ok,
            crc_failures: rx.crc_failures,
            timeouts: rx.timeouts,
            junk_bytes: rx.junk_bytes,
            frames_sent: tx.frames_sent,
            send_overruns: tx.overruns,
        }
    }

    /// Sum of every error-ish counter, for quick health checks
    pub fn error_total(&self) -> u64 {
        self.crc_failures + self.timeouts + self.junk_bytes + self.send_overruns
    }
}

/// One JSONL record: a timestamp plus the counter snapshot
#[derive(Serialize)]
struct StatsRecord<'a> {
    timestamp: String,
    #[serde(flatten)]
    stats: &'a LinkStats,
}

/// Rotating JSONL stats writer
///
/// Files are named `link-stats-<utc>-<seq>.jsonl`; a new file starts after
/// `max_records_per_file` records and only the newest `max_files_to_keep`
/// files survive pruning.
#[derive(Debug)]
pub struct StatsLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    current: Option<File>,
    records_in_current: usize,
    seq: u64,
}

impl StatsLogger {
    /// Create a logger writing into `dir` (created if missing)
    ///
    /// # Arguments
    ///
    /// * `dir` - Target directory for the JSONL files
    /// * `max_records_per_file` - Rotation threshold
    /// * `max_files_to_keep` - Retention limit
    pub fn new<D: AsRef<Path>>(
        dir: D,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            max_records_per_file,
            max_files_to_keep,
            current: None,
            records_in_current: 0,
            seq: 0,
        })
    }

    /// Append one snapshot, rotating and pruning as needed
    pub fn log(&mut self, stats: &LinkStats) -> Result<()> {
        if self.current.is_none() || self.records_in_current >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = StatsRecord {
            timestamp: Utc::now().to_rfc3339(),
            stats,
        };
        let line = serde_json::to_string(&record)?;

        if let Some(file) = self.current.as_mut() {
            writeln!(file, "{}", line)?;
            self.records_in_current += 1;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        let name = format!(
            "link-stats-{}-{:06}.jsonl",
            Utc::now().format("%Y%m%d-%H%M%S"),
            self.seq
        );
        self.seq += 1;

        let file = File::create(self.dir.join(name))?;
        self.current = Some(file);
        self.records_in_current = 0;
        self.prune()
    }

    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().map(|ext| ext == "jsonl").unwrap_or(false)
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with("link-stats-"))
                        .unwrap_or(false)
            })
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Names sort chronologically (UTC stamp + sequence)
        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
