// Generation Settings - User-facing configuration for a generation run
// Loaded from JSON; every field has a default

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::arranger::{HumanizeSettings, MidiExportOptions};
use crate::groove::AnalyzerConfig;
use crate::harmony::{ChordMode, KeyParseError};

/// Errors loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(#[from] KeyParseError),
}

/// Settings for one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Global velocity multiplier for rendered notes
    pub velocity_scale: f64,

    /// Fixed key such as "A Minor"; estimated from the bass line when None
    pub key: Option<String>,

    /// Chord strategies to use; all registered when None
    pub chords: Option<Vec<String>>,

    /// Styles to use; all registered when None
    pub styles: Option<Vec<String>>,

    /// Named (chord, style) preset; takes precedence over the filters
    pub preset: Option<String>,

    /// Scale expansion modes; empty means plain chord strategies
    pub expansion: Vec<ChordMode>,

    /// Skip styles with fewer voices than the chord has tones
    pub strict_validation: bool,

    /// Allowed style types (rename tags, "Default" for untagged styles)
    pub allowed_types: Option<Vec<String>>,

    /// Subdirectory of the output directory for generated files
    pub output_subdir: String,

    /// Catalog file with pattern rows
    pub catalog_path: Option<PathBuf>,

    /// JSONL progress trace
    pub trace_path: Option<PathBuf>,

    pub humanize: HumanizeSettings,
    pub analyzer: AnalyzerConfig,
    pub export: MidiExportOptions,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            velocity_scale: 0.9,
            key: None,
            chords: None,
            styles: None,
            preset: None,
            expansion: Vec::new(),
            strict_validation: false,
            allowed_types: None,
            output_subdir: "ensemble".to_string(),
            catalog_path: None,
            trace_path: None,
            humanize: HumanizeSettings::default(),
            analyzer: AnalyzerConfig::default(),
            export: MidiExportOptions::default(),
        }
    }
}

impl GenerationSettings {
    /// Load settings from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let settings: GenerationSettings = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject values that can never work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = &self.key {
            key.parse::<crate::harmony::KeyInfo>()?;
        }
        Ok(())
    }
}
