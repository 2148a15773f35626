// Output Sinks - Where rendered parts go
// Files on disk for normal runs, memory for callers that post-process

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use crate::arranger::{ExportError, MidiExportOptions, export_part};
use super::generator::GeneratedPart;

/// Persists one rendered part and reports where it went
pub trait OutputSink {
    fn write(&mut self, part: &GeneratedPart) -> Result<PathBuf, ExportError>;
}

/// Writes each part as `<dir>/<file_stem>.mid`
pub struct MidiFileSink {
    dir: PathBuf,
    options: MidiExportOptions,
}

impl MidiFileSink {
    /// Create the sink and its directory
    pub fn new(dir: PathBuf, options: MidiExportOptions) -> Result<Self, ExportError> {
        fs::create_dir_all(&dir)?;
        Ok(MidiFileSink { dir, options })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl OutputSink for MidiFileSink {
    fn write(&mut self, part: &GeneratedPart) -> Result<PathBuf, ExportError> {
        let bytes = export_part(&part.notes, part.bpm, &part.style, &self.options)?;
        let path = self.dir.join(part.file_name());

        match fs::write(&path, bytes) {
            Ok(()) => {
                log::debug!("Wrote {} ({} notes)", path.display(), part.notes.len());
                Ok(path)
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(ExportError::Locked(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps parts in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub parts: Vec<GeneratedPart>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Part rendered for a chord label and style
    pub fn find(&self, chord_label: &str, style: &str) -> Option<&GeneratedPart> {
        self.parts
            .iter()
            .find(|p| p.chord_label == chord_label && p.style == style)
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, part: &GeneratedPart) -> Result<PathBuf, ExportError> {
        self.parts.push(part.clone());
        Ok(PathBuf::from(part.file_name()))
    }
}
