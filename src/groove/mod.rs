// Groove Engine - Tempo map, beat grid and per-note rhythm analysis
// Every timing decision downstream is measured against this grid

pub mod tempo;
pub mod grid;
pub mod analyzer;

pub use tempo::{DEFAULT_BPM, TempoChange, TempoMap, sixteenth_duration};
pub use grid::{BeatGrid, BeatPosition, TimeSignature};
pub use analyzer::{AnalyzerConfig, BeatGridAnalyzer, Groove, LineAnalysis, NoteAnalysis, OctaveWindow, SubBeat, average_velocity};
