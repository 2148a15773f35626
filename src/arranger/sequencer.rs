// Step Sequencer - Tempo-synchronized sixteenth-note stepping
// Shared by the parametric arpeggios and catalog patterns

use crate::groove::{TempoMap, sixteenth_duration};
use crate::notes::{NoteEvent, to_midi_pitch};

/// Notes shorter than this are dropped
pub const MIN_NOTE_SECONDS: f64 = 0.01;

/// Delay between simultaneous indices of one step
pub const STRUM_SECONDS: f64 = 0.005;

/// One sixteenth-note step inside a span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSlot {
    /// Absolute step index on the sixteenth grid, used for pattern position and swing
    pub index: i64,

    /// Step onset in seconds
    pub time: f64,

    /// Step length at the local tempo
    pub duration: f64,
}

/// Walk the sixteenth steps of `[start, end)`
///
/// The absolute index starts at floor(start / step). Each step re-reads the
/// local tempo. Stepping stops once less than half a step remains, so
/// floating-point drift never produces a sliver note at the end.
pub fn for_each_step<F>(start: f64, end: f64, tempo: &TempoMap, mut visit: F)
where
    F: FnMut(&StepSlot),
{
    if end <= start {
        return;
    }

    let first_duration = sixteenth_duration(tempo.tempo_at(start));
    let mut index = (start / first_duration + 1e-9).floor() as i64;
    let mut time = start;

    loop {
        let duration = sixteenth_duration(tempo.tempo_at(time));
        if time >= end || end - time < duration * 0.5 {
            break;
        }
        visit(&StepSlot {
            index,
            time,
            duration,
        });
        time += duration;
        index += 1;
    }
}

/// Chord tone for an index, wrapping up an octave per full pass
///
/// With n tones, index i maps to chord[i mod n] + floor(i / n) * 12.
pub fn resolve_index(chord: &[i32], index: i32) -> Option<i32> {
    if chord.is_empty() {
        return None;
    }
    let n = chord.len() as i32;
    Some(chord[index.rem_euclid(n) as usize] + index.div_euclid(n) * 12)
}

/// Scaled velocity clamped to 1-127
pub fn scaled_velocity(base: u8, scale: f64, multiplier: f64) -> u8 {
    (base as f64 * scale * multiplier).round().clamp(1.0, 127.0) as u8
}

/// Cyclic lookup into a per-step value list; 1.0 when the list is empty
pub fn cycle_value(values: &[f64], index: i64) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    values[index.rem_euclid(values.len() as i64) as usize]
}

/// Build a note clipped to `span_end`
///
/// Returns None when the onset is at or past the span end, the clipped length
/// is under 10 ms, or the pitch is outside the MIDI range.
pub fn clipped_note(pitch: i32, onset: f64, length: f64, span_end: f64, velocity: u8) -> Option<NoteEvent> {
    if onset >= span_end {
        return None;
    }
    let end = (onset + length).min(span_end);
    if end - onset < MIN_NOTE_SECONDS {
        return None;
    }
    let Some(key) = to_midi_pitch(pitch) else {
        log::debug!("Pitch {} outside MIDI range, dropped", pitch);
        return None;
    };
    Some(NoteEvent::new(key, onset, end, velocity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_beat_has_four_steps() {
        let mut slots = Vec::new();
        for_each_step(0.0, 0.5, &TempoMap::constant(120.0), |slot| slots.push(*slot));

        assert_eq!(slots.len(), 4);
        assert_eq!(slots[3].index, 3);
        assert!((slots[3].time - 0.375).abs() < 1e-9);
    }

    #[test]
    fn test_absolute_index_from_span_start() {
        let mut slots = Vec::new();
        for_each_step(1.0, 1.25, &TempoMap::constant(120.0), |slot| slots.push(*slot));

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].index, 8);
        assert_eq!(slots[1].index, 9);
    }

    #[test]
    fn test_drift_does_not_add_a_step() {
        let mut count = 0;
        for_each_step(0.0, 0.1 * 3.0, &TempoMap::constant(150.0), |_| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_resolve_index_wraps_octaves() {
        let chord = [48, 52, 55];
        assert_eq!(resolve_index(&chord, 0), Some(48));
        assert_eq!(resolve_index(&chord, 3), Some(60));
        assert_eq!(resolve_index(&chord, 4), Some(64));
        assert_eq!(resolve_index(&chord, -1), Some(43));
        assert_eq!(resolve_index(&[], 0), None);
    }

    #[test]
    fn test_scaled_velocity_clamps() {
        assert_eq!(scaled_velocity(100, 0.9, 1.0), 90);
        assert_eq!(scaled_velocity(120, 1.0, 1.2), 127);
        assert_eq!(scaled_velocity(1, 0.1, 1.0), 1);
    }

    #[test]
    fn test_clipped_note() {
        let note = clipped_note(60, 0.4, 0.25, 0.5, 90).unwrap();
        assert!((note.end - 0.5).abs() < 1e-9);

        assert!(clipped_note(60, 0.495, 0.25, 0.5, 90).is_none());
        assert!(clipped_note(60, 0.5, 0.25, 0.5, 90).is_none());
        assert!(clipped_note(130, 0.0, 0.25, 0.5, 90).is_none());
    }
}
