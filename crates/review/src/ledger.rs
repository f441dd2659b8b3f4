//! Review Ledger - Append-only JSONL audit trail
//!
//! Every automatic flag, analyst decision and KYC change is appended here.
//! Writes are append-only; records are never rewritten.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::event::ReviewEvent;

/// Errors from the review ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Append-only ledger for review events
///
/// File-backed: each line is a JSON-serialized [`ReviewEvent`].
/// In-memory: events are kept in a vector for inspection.
#[derive(Debug)]
pub struct ReviewLedger {
    path: Option<PathBuf>,
    file: Option<File>,
    memory: Vec<ReviewEvent>,
}

impl ReviewLedger {
    /// Open (or create) a ledger file at the given path
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path: Some(path),
            file: Some(file),
            memory: Vec::new(),
        })
    }

    /// Ledger that keeps events in memory only
    pub fn in_memory() -> Self {
        Self {
            path: None,
            file: None,
            memory: Vec::new(),
        }
    }

    /// Append an event
    pub fn append(&mut self, event: &ReviewEvent) -> LedgerResult<()> {
        match self.file.as_mut() {
            Some(file) => {
                let json = serde_json::to_string(event)?;
                writeln!(file, "{}", json)?;
                file.flush()?;
            }
            None => self.memory.push(event.clone()),
        }
        Ok(())
    }

    /// Read all events
    pub fn read_all(&self) -> LedgerResult<Vec<ReviewEvent>> {
        self.read_from(0)
    }

    /// Read events starting at a line offset
    pub fn read_from(&self, start: usize) -> LedgerResult<Vec<ReviewEvent>> {
        let Some(path) = &self.path else {
            return Ok(self.memory.iter().skip(start).cloned().collect());
        };

        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();
        for line in reader.lines().skip(start) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }

    /// Number of recorded events
    pub fn len(&self) -> LedgerResult<usize> {
        match &self.path {
            Some(_) => Ok(self.read_all()?.len()),
            None => Ok(self.memory.len()),
        }
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.file.is_none()
    }
}
