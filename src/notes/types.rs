// Note Types - Core note event used across the engine
// Times are in seconds, pitches and velocities follow MIDI ranges

use serde::{Deserialize, Serialize};

/// Pitch class names, sharps only
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A single timed note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI pitch (0-127)
    pub pitch: u8,

    /// Onset in seconds
    pub start: f64,

    /// Release in seconds (always after start)
    pub end: f64,

    /// MIDI velocity (1-127)
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(pitch: u8, start: f64, end: f64, velocity: u8) -> Self {
        NoteEvent {
            pitch: pitch.min(127),
            start,
            end,
            velocity: velocity.clamp(1, 127),
        }
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Name of a pitch class; negative and out-of-octave values wrap
pub fn pitch_class_name(pitch: i32) -> &'static str {
    NOTE_NAMES[pitch.rem_euclid(12) as usize]
}

/// Convert a computed pitch to a MIDI key, None when outside 0-127
pub fn to_midi_pitch(pitch: i32) -> Option<u8> {
    u8::try_from(pitch).ok().filter(|p| *p <= 127)
}
