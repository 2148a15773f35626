// Note streams - Timed pitch events shared by analysis and playback
// Bass input and rendered accompaniment both use NoteEvent

pub mod types;

pub use types::{NoteEvent, NOTE_NAMES, pitch_class_name, to_midi_pitch};
