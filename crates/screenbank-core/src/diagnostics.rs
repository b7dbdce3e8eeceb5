//! Diagnostic log of ledger-affecting events.
//!
//! Stored as JSON lines next to the ledger database but independent of it: it
//! is an audit aid, not the system of record. Both processes append to the
//! same file. Rotation (keep newest `max_entries`) is attempted on a random
//! subset of appends, or whenever the file has clearly outgrown the cap.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::storage::{data_dir, DiagnosticsConfig};

/// Rough upper size of one serialized entry, used for the size trigger.
const APPROX_ENTRY_BYTES: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticEvent {
    Threshold,
    Skip,
    Error,
    IntervalStart,
    IntervalEnd,
    ShieldApplied,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event: DiagnosticEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_used: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deducted: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiagnosticLogEntry {
    pub fn new(event: DiagnosticEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            event,
            minute: None,
            previous_used: None,
            current_balance: None,
            new_balance: None,
            deducted: None,
            message: None,
            error: None,
        }
    }

    pub fn with_minute(mut self, minute: u32) -> Self {
        self.minute = Some(minute);
        self
    }

    pub fn with_previous_used(mut self, previous_used: u32) -> Self {
        self.previous_used = Some(previous_used);
        self
    }

    pub fn with_balances(mut self, current: u32, new: u32) -> Self {
        self.current_balance = Some(current);
        self.new_balance = Some(new);
        self
    }

    pub fn with_current_balance(mut self, current: u32) -> Self {
        self.current_balance = Some(current);
        self
    }

    pub fn with_deducted(mut self, deducted: u32) -> Self {
        self.deducted = Some(deducted);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Append-only, size-bounded JSON-lines log.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    path: PathBuf,
    max_entries: usize,
    rotation_probability: f64,
}

impl DiagnosticLog {
    /// Log at `<data_dir>/diagnostics.jsonl`.
    pub fn open(config: &DiagnosticsConfig) -> io::Result<Self> {
        Ok(Self::at(data_dir()?.join("diagnostics.jsonl"), config))
    }

    pub fn at(path: impl Into<PathBuf>, config: &DiagnosticsConfig) -> Self {
        Self {
            path: path.into(),
            max_entries: config.max_entries.max(1),
            rotation_probability: config.rotation_probability,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, rotating if due.
    pub fn append(&self, entry: &DiagnosticLogEntry) -> io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        drop(file);

        if self.rotation_due() {
            self.rotate()?;
        }
        Ok(())
    }

    /// Append, reporting failures to tracing only.
    pub fn record(&self, entry: DiagnosticLogEntry) {
        if let Err(e) = self.append(&entry) {
            tracing::warn!(path = %self.path.display(), error = %e, "diagnostic log append failed");
        }
    }

    /// Entries newest-first, optionally limited. Undecodable lines are skipped.
    pub fn recent(&self, limit: Option<usize>) -> io::Result<Vec<DiagnosticLogEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    /// Keep only the newest `max_entries`, rewriting the file in one pass.
    /// Returns how many entries were dropped.
    pub fn rotate(&self) -> io::Result<usize> {
        let entries = self.read_all()?;
        if entries.len() <= self.max_entries {
            return Ok(0);
        }
        let dropped = entries.len() - self.max_entries;

        let mut content = String::new();
        for entry in &entries[dropped..] {
            content.push_str(&serde_json::to_string(entry)?);
            content.push('\n');
        }

        let tmp = self
            .path
            .with_extension(format!("jsonl.{}.tmp", std::process::id()));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(dropped, kept = self.max_entries, "rotated diagnostic log");
        Ok(dropped)
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn read_all(&self) -> io::Result<Vec<DiagnosticLogEntry>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let text = String::from_utf8_lossy(&bytes);
        let mut skipped = 0usize;
        let entries = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            tracing::debug!(skipped, "skipped undecodable diagnostic log lines");
        }
        Ok(entries)
    }

    fn rotation_due(&self) -> bool {
        let oversized = fs::metadata(&self.path)
            .map(|m| m.len() > self.max_entries as u64 * APPROX_ENTRY_BYTES * 2)
            .unwrap_or(false);
        oversized || roll(self.rotation_probability)
    }
}

fn roll(probability: f64) -> bool {
    if probability >= 1.0 {
        true
    } else if probability > 0.0 {
        rand::thread_rng().gen_bool(probability)
    } else {
        false
    }
}
