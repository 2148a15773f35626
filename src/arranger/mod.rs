// Arranger - Pattern playback of chord timelines
// Styles, step sequencing, catalog patterns, humanization and MIDI export

pub mod chord_type;
pub mod sequencer;
pub mod styles;
pub mod pattern;
pub mod catalog;
pub mod registry;
pub mod humanize;
pub mod midi;

// Re-export main types
pub use chord_type::{ChordType, extended_pitch};
pub use sequencer::{StepSlot, for_each_step, resolve_index};
pub use styles::{ParametricArp, Pad, RenderContext, Rhythm, Style, Trigger, TriggerSource};
pub use pattern::{PatternStyle, PatternVoice, Step, StepMode, StylePattern};
pub use catalog::{CatalogError, CatalogRow, RowType, assemble_patterns, load_catalog, sample_rows};
pub use registry::{StyleRegistry, builtin_styles, register_patterns};
pub use humanize::{HumanizeSettings, humanize};
pub use midi::{ExportError, MidiExportOptions, export_part};
