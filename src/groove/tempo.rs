// Tempo Map - Piecewise-constant tempo over time
// Answers "what BPM is in effect at time t" for the step sequencer

use serde::{Deserialize, Serialize};

/// Tempo used when no change precedes the queried time
pub const DEFAULT_BPM: f64 = 120.0;

/// A tempo change taking effect at `time` seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    /// Time in seconds when this tempo begins
    pub time: f64,

    /// Beats per minute from this point on
    pub bpm: f64,
}

/// Ordered list of tempo changes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TempoMap {
    changes: Vec<TempoChange>,
}

impl TempoMap {
    /// Build a tempo map, sorting changes by time and dropping non-positive tempos
    pub fn new(mut changes: Vec<TempoChange>) -> Self {
        changes.retain(|c| c.bpm.is_finite() && c.bpm > 0.0);
        changes.sort_by(|a, b| {
            a.time
                .partial_cmp(&b.time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        TempoMap { changes }
    }

    /// Single tempo for the whole piece
    pub fn constant(bpm: f64) -> Self {
        TempoMap::new(vec![TempoChange { time: 0.0, bpm }])
    }

    /// Tempo in effect at `time`: the last change at or before it, else 120 BPM
    pub fn tempo_at(&self, time: f64) -> f64 {
        self.changes
            .iter()
            .take_while(|c| c.time <= time)
            .last()
            .map(|c| c.bpm)
            .unwrap_or(DEFAULT_BPM)
    }

    /// Tempo at the start of the piece
    pub fn initial_bpm(&self) -> f64 {
        self.tempo_at(0.0)
    }

    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }
}

/// Duration of one sixteenth note in seconds at the given tempo
pub fn sixteenth_duration(bpm: f64) -> f64 {
    let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { DEFAULT_BPM };
    (60.0 / bpm) / 4.0
}
