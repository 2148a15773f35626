// Generation progress tracing
// Append-only JSONL trace of each stage of a generation run

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Stage of a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analysis,
    Key,
    Harmony,
    Render,
    Export,
    Done,
}

/// A single trace entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// ISO 8601 timestamp of when this entry was created
    pub timestamp: String,

    /// Run this entry belongs to
    pub run_id: Uuid,
    pub stage: Stage,

    /// Progress within the run [0.0, 1.0]
    pub progress: f32,
    pub message: String,

    /// Optional structured data (counts, names)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(run_id: Uuid, stage: Stage, progress: f32, message: impl Into<String>) -> Self {
        TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            run_id,
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Append-only JSONL trace file
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append an entry, creating the file if needed
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        file.write_all(entry.to_json_line()?.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Trace sink for one run; a missing writer makes every call a no-op
///
/// Trace failures are logged and never interrupt generation.
pub struct RunTrace {
    run_id: Uuid,
    writer: Option<TraceWriter>,
}

impl RunTrace {
    pub fn new(run_id: Uuid, writer: Option<TraceWriter>) -> Self {
        RunTrace { run_id, writer }
    }

    pub fn record(&self, stage: Stage, progress: f32, message: impl Into<String>) {
        self.record_entry(TraceEntry::new(self.run_id, stage, progress, message));
    }

    pub fn record_with(&self, stage: Stage, progress: f32, message: impl Into<String>, data: serde_json::Value) {
        self.record_entry(TraceEntry::new(self.run_id, stage, progress, message).with_data(data));
    }

    fn record_entry(&self, entry: TraceEntry) {
        let Some(writer) = &self.writer else {
            return;
        };
        if let Err(e) = writer.write(&entry) {
            log::warn!("Failed to write trace to {}: {}", writer.path().display(), e);
        }
    }
}

/// Read trace entries from a JSONL file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }

    Ok(entries)
}
