// Harmony Overrides - Optional hook that suggests key and chord choices
// Suggestions from past sessions are applied before any derivation runs

use std::collections::HashMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::config::ConfigError;
use crate::groove::Groove;

/// Summary of a bass line handed to an override hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFeatures {
    pub groove: Groove,
    pub note_count: usize,

    /// Mean note length in beats
    pub mean_duration_beats: f64,
    pub mean_velocity: f64,

    /// Highest minus lowest pitch
    pub pitch_range: i32,
}

/// Suggested overrides; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonyOverride {
    /// Key name such as "A Minor"
    pub key: Option<String>,

    /// Chord strategy names to use
    pub chords: Option<Vec<String>>,

    /// Style names to use
    pub styles: Option<Vec<String>>,
}

/// Source of override suggestions
pub trait OverrideHook: Send + Sync {
    fn suggest(&self, source_name: &str, features: &SourceFeatures) -> Option<HarmonyOverride>;
}

/// Overrides keyed by exact source file name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilenameOverrides {
    entries: HashMap<String, HarmonyOverride>,
}

impl FilenameOverrides {
    pub fn new() -> Self {
        FilenameOverrides::default()
    }

    pub fn insert(&mut self, source_name: impl Into<String>, overrides: HarmonyOverride) {
        self.entries.insert(source_name.into(), overrides);
    }

    /// Load a JSON object mapping file names to overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let entries: HashMap<String, HarmonyOverride> = serde_json::from_str(&contents)?;
        log::info!("Loaded {} override entries from {}", entries.len(), path.display());
        Ok(FilenameOverrides { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OverrideHook for FilenameOverrides {
    fn suggest(&self, source_name: &str, _features: &SourceFeatures) -> Option<HarmonyOverride> {
        self.entries.get(source_name).cloned()
    }
}
