// Generation Report - What a run produced, skipped and failed
// Written next to the generated files as a JSON metadata document

use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// File name of the metadata document
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// One written part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub file_name: String,
    pub path: PathBuf,

    /// Style type: rename tag, or "Default"
    pub category: String,

    /// Style the part was rendered with
    pub instrument: String,
    pub bars: u32,

    /// Chord label, e.g. "Diatonic" or "Triad_2_Dm"
    pub chord: String,

    /// Root name of the chord or key
    pub root: String,

    /// Chord family: "Strategy" or the expansion mode
    pub group: String,
    pub comment: String,
}

/// A combination that was deliberately not rendered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub chord: String,
    pub style: String,
    pub reason: String,
}

/// A part that rendered but could not be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    pub file_name: String,
    pub error: String,
}

/// Summary of one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    /// Source name as given to the generator
    pub source: String,

    /// SHA-256 of the source file, hex encoded
    pub source_sha256: Option<String>,

    /// Key the run harmonized in, e.g. "A Minor"
    pub key: Option<String>,

    /// "8-beat" or "16-beat"
    pub groove: Option<String>,
    pub outputs: Vec<OutputRecord>,
    pub skipped: Vec<SkippedItem>,
    pub failed: Vec<FailedItem>,

    /// The run stopped early on a cancellation request
    pub cancelled: bool,
}

impl GenerationReport {
    pub fn new(run_id: Uuid, source: impl Into<String>, source_sha256: Option<String>) -> Self {
        GenerationReport {
            run_id,
            started_at: Utc::now(),
            source: source.into(),
            source_sha256,
            key: None,
            groove: None,
            outputs: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }

    pub fn skip(&mut self, chord: &str, style: &str, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Skipping {} / {}: {}", chord, style, reason);
        self.skipped.push(SkippedItem {
            chord: chord.to_string(),
            style: style.to_string(),
            reason,
        });
    }

    pub fn fail(&mut self, file_name: &str, error: impl ToString) {
        let error = error.to_string();
        log::error!("Failed to write {}: {}", file_name, error);
        self.failed.push(FailedItem {
            file_name: file_name.to_string(),
            error,
        });
    }

    /// True when nothing failed and the run was not cancelled
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    /// Write the report as pretty JSON into `dir`
    pub fn write_metadata(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(METADATA_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// SHA-256 of a byte slice, hex encoded
pub fn source_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_digest() {
        assert_eq!(
            source_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_metadata_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let mut report = GenerationReport::new(Uuid::new_v4(), "Song_Bass", Some("00ff".to_string()));
        report.key = Some("A Minor".to_string());
        report.outputs.push(OutputRecord {
            file_name: "Song_Keys_Diatonic_Pad.mid".to_string(),
            path: temp_dir.path().join("Song_Keys_Diatonic_Pad.mid"),
            category: "Default".to_string(),
            instrument: "Pad".to_string(),
            bars: 4,
            chord: "Diatonic".to_string(),
            root: "A".to_string(),
            group: "Strategy".to_string(),
            comment: String::new(),
        });
        report.skip("Diatonic_7th", "LoFi_01", "needs 4 voices");

        let path = report.write_metadata(temp_dir.path()).unwrap();
        let loaded = GenerationReport::load(&path).unwrap();

        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.outputs, report.outputs);
        assert_eq!(loaded.skipped.len(), 1);
        assert!(loaded.is_complete());
    }

    #[test]
    fn test_failure_marks_incomplete() {
        let mut report = GenerationReport::new(Uuid::new_v4(), "Song", None);
        report.fail("Song_Maj_Pad.mid", "locked");

        assert!(!report.is_complete());
        assert_eq!(report.failed[0].error, "locked");
    }
}
