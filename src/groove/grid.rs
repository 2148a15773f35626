// Beat Grid - Beat and downbeat times for a performance
// Provides the structure every analysis and grouping step is measured against

use serde::{Deserialize, Serialize};
use super::tempo::TempoMap;

/// Beat length assumed when the grid has fewer than two beats
pub const FALLBACK_BEAT_SECONDS: f64 = 0.5;

/// Musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Beats per bar
    pub numerator: u8,

    /// Note value that gets one beat (4 = quarter note)
    pub denominator: u8,
}

impl TimeSignature {
    pub fn new(numerator: u8, denominator: u8) -> Self {
        TimeSignature {
            numerator: numerator.max(1),
            denominator: denominator.max(1),
        }
    }

    /// Get number of beats per bar
    pub fn beats_per_bar(&self) -> u32 {
        self.numerator as u32
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::new(4, 4)
    }
}

/// Where a time falls relative to the beat grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatPosition {
    /// Index of the enclosing beat
    pub index: usize,

    /// Position inside the beat [0.0, 1.0)
    pub fraction: f64,

    /// Length of the enclosing beat in seconds
    pub beat_duration: f64,

    /// False when the time lies on or after the last beat and no
    /// real beat length is known
    pub measured: bool,
}

/// Beat and downbeat times in seconds, both ascending
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeatGrid {
    pub beats: Vec<f64>,
    pub downbeats: Vec<f64>,
}

impl BeatGrid {
    pub fn new(beats: Vec<f64>, downbeats: Vec<f64>) -> Self {
        BeatGrid { beats, downbeats }
    }

    /// Build a grid from a tempo map, covering at least `duration` seconds
    ///
    /// Beats follow the local tempo; every `beats_per_bar`-th beat is a downbeat.
    pub fn from_tempo(tempo: &TempoMap, time_signature: TimeSignature, duration: f64) -> Self {
        let beats_per_bar = time_signature.beats_per_bar().max(1) as usize;
        let beat_scale = 4.0 / time_signature.denominator.max(1) as f64;

        let mut beats = Vec::new();
        let mut downbeats = Vec::new();
        let mut time = 0.0;

        loop {
            if beats.len() % beats_per_bar == 0 {
                downbeats.push(time);
            }
            beats.push(time);
            if time > duration {
                break;
            }
            time += 60.0 / tempo.tempo_at(time) * beat_scale;
        }

        BeatGrid { beats, downbeats }
    }

    /// Copy of the grid with beats appended until `end_time` is covered
    ///
    /// New beats repeat the length of the last beat, so a grid that stops
    /// before the final note still has an enclosing beat for it. Downbeats
    /// continue with the last bar length (four beats when only one is known)
    /// up to the final beat.
    pub fn extended_to(&self, end_time: f64) -> BeatGrid {
        let mut beats = self.beats.clone();
        if beats.is_empty() {
            beats.push(0.0);
        }

        let step = match beats.len() {
            0 | 1 => FALLBACK_BEAT_SECONDS,
            n => beats[n - 1] - beats[n - 2],
        };

        if step > 0.0 {
            while let Some(&last) = beats.last() {
                if last >= end_time + 0.01 {
                    break;
                }
                beats.push(last + step);
            }
        }

        let mut downbeats = self.downbeats.clone();
        let bar = match downbeats.as_slice() {
            [] => 0.0,
            [_] => step * TimeSignature::default().beats_per_bar() as f64,
            [.., a, b] => b - a,
        };
        if bar > 0.0 {
            let last_beat = beats.last().copied().unwrap_or(0.0);
            while let Some(&last) = downbeats.last() {
                if last + bar > last_beat + 0.001 {
                    break;
                }
                downbeats.push(last + bar);
            }
        }

        BeatGrid { beats, downbeats }
    }

    /// Locate a time inside the grid
    ///
    /// The enclosing beat is found by a forward scan: the index advances while
    /// the next beat starts at or before `time` (with 1 ms tolerance).
    pub fn locate(&self, time: f64) -> BeatPosition {
        let mut index = 0;
        while index + 1 < self.beats.len() && self.beats[index + 1] <= time + 0.001 {
            index += 1;
        }

        if index + 1 < self.beats.len() {
            let beat_start = self.beats[index];
            let beat_duration = self.beats[index + 1] - beat_start;
            if beat_duration > 0.0 {
                return BeatPosition {
                    index,
                    fraction: (time - beat_start) / beat_duration,
                    beat_duration,
                    measured: true,
                };
            }
        }

        BeatPosition {
            index,
            fraction: 0.0,
            beat_duration: FALLBACK_BEAT_SECONDS,
            measured: false,
        }
    }

    /// Length of the first beat, or the fallback
    pub fn first_beat_duration(&self) -> f64 {
        match self.beats.as_slice() {
            [a, b, ..] if b > a => b - a,
            _ => FALLBACK_BEAT_SECONDS,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }
}
