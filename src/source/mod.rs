// Source - MIDI input abstraction
// Tracks of notes plus the beat grid and tempo map they are played against

pub mod smf;

pub use smf::{MidiContainer, SmfContainer, SourceError, SourceTrack, analysis_track};
