// Pattern Catalog - Assemble StylePatterns from tabular rows
// Rows carry one list (sequence, gate or velocity) for one voice of one style

use std::path::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use super::pattern::{PatternVoice, Step, StepMode, StylePattern};

/// Most steps a single row may hold
pub const MAX_STEPS: usize = 128;

/// Errors loading a catalog file
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// What a row's cells describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowType {
    #[serde(alias = "seq")]
    Sequence,

    /// Sequence resolved through the chord-type interval cycle
    #[serde(alias = "ext")]
    ExtendedSequence,
    Gate,

    #[serde(alias = "vel")]
    Velocity,
}

/// One catalog row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRow {
    pub style: String,

    #[serde(default)]
    pub voice: u32,
    pub row_type: RowType,

    /// Cell values; strings or numbers, null for empty
    #[serde(default)]
    pub values: Vec<serde_json::Value>,

    #[serde(default)]
    pub swing: Option<f64>,

    #[serde(default)]
    pub rename: Option<String>,
}

/// Load rows from a JSON array and assemble them
pub fn load_catalog(path: &Path) -> Result<Vec<StylePattern>, CatalogError> {
    let contents = std::fs::read_to_string(path)?;
    let rows: Vec<CatalogRow> = serde_json::from_str(&contents)?;
    let patterns = assemble_patterns(&rows);
    log::info!(
        "Loaded {} catalog rows into {} patterns from {}",
        rows.len(),
        patterns.len(),
        path.display()
    );
    Ok(patterns)
}

/// Group rows into patterns
///
/// Styles keep the order of their first row; voices are ordered by index.
/// Gate and velocity cells are tenths (10 = 1.0); missing or invalid cells
/// read as 1.0. Trailing empty sequence cells do not count as steps.
pub fn assemble_patterns(rows: &[CatalogRow]) -> Vec<StylePattern> {
    let mut patterns: Vec<StylePattern> = Vec::new();

    for row in rows {
        let pattern_index = match patterns.iter().position(|p| p.name == row.style) {
            Some(index) => index,
            None => {
                patterns.push(StylePattern {
                    name: row.style.clone(),
                    voices: Vec::new(),
                    rename_tag: None,
                });
                patterns.len() - 1
            }
        };
        let pattern = &mut patterns[pattern_index];

        if pattern.rename_tag.is_none() {
            pattern.rename_tag = row
                .rename
                .as_ref()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty());
        }

        let voice_index = match pattern.voices.iter().position(|v| v.index == row.voice) {
            Some(index) => index,
            None => {
                pattern.voices.push(PatternVoice {
                    index: row.voice,
                    steps: Vec::new(),
                    gates: Vec::new(),
                    velocities: Vec::new(),
                    swing: 0.0,
                    mode: StepMode::ChordTone,
                });
                pattern.voices.len() - 1
            }
        };
        let voice = &mut pattern.voices[voice_index];

        if let Some(swing) = row.swing.filter(|s| s.is_finite()) {
            voice.swing = swing;
        }

        let cells: Vec<String> = row.values.iter().take(MAX_STEPS).map(cell_text).collect();
        match row.row_type {
            RowType::Sequence | RowType::ExtendedSequence => {
                let used = cells
                    .iter()
                    .rposition(|c| !c.trim().is_empty())
                    .map_or(0, |last| last + 1);
                voice.steps = cells[..used].iter().map(|c| Step::parse(c)).collect();
                voice.mode = if row.row_type == RowType::ExtendedSequence {
                    StepMode::Extended
                } else {
                    StepMode::ChordTone
                };
            }
            RowType::Gate => voice.gates = cells.iter().map(|c| tenths(c)).collect(),
            RowType::Velocity => voice.velocities = cells.iter().map(|c| tenths(c)).collect(),
        }
    }

    for pattern in &mut patterns {
        pattern.voices.sort_by_key(|v| v.index);
    }

    patterns
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Integer tenths to a multiplier, 1.0 for anything unusable
fn tenths(cell: &str) -> f64 {
    match cell.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value / 10.0,
        _ => 1.0,
    }
}

/// A few ready-made patterns
pub fn sample_rows() -> Vec<CatalogRow> {
    fn row(style: &str, voice: u32, row_type: RowType, values: &[&str], swing: Option<f64>, rename: Option<&str>) -> CatalogRow {
        CatalogRow {
            style: style.to_string(),
            voice,
            row_type,
            values: values.iter().map(|v| serde_json::Value::String(v.to_string())).collect(),
            swing,
            rename: rename.map(str::to_string),
        }
    }

    vec![
        row(
            "LoFi_01",
            0,
            RowType::Sequence,
            &["0", "r", "1", "2", "r", "0", "1", "3", "0", "r", "2", "1", "r", "0", "2", "3"],
            Some(0.24),
            Some("Keys"),
        ),
        row("LoFi_01", 0, RowType::Gate, &["9", "", "8", "8", "", "9", "8", "10"], None, None),
        row("LoFi_01", 0, RowType::Velocity, &["8", "", "6", "7", "", "8", "6", "7"], None, None),
        row("Trance_Gate", 0, RowType::Sequence, &["0", "1", "2", "0", "1", "2", "0", "1"], None, Some("Synth")),
        row("Trance_Gate", 0, RowType::Gate, &["6"], None, None),
        row("Trance_Gate", 0, RowType::Velocity, &["12", "8", "10", "8"], None, None),
        row(
            "Strum_Slow",
            0,
            RowType::Sequence,
            &["0,1,2", "r", "r", "r", "0,1,2", "r", "r", "r", "0,1,2", "r", "r", "r", "0,1,2", "r", "r", "r"],
            None,
            Some("Guitar"),
        ),
        row("Strum_Slow", 0, RowType::Gate, &["20", "0", "0", "0"], None, None),
        row("Climb_Ext", 0, RowType::ExtendedSequence, &["0", "1", "2", "3", "4", "3", "2", "1"], None, None),
        row("Climb_Ext", 1, RowType::Sequence, &["0", "r", "r", "r"], None, None),
        row("Climb_Ext", 1, RowType::Gate, &["40"], None, None),
    ]
}
