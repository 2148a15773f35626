// Ensemble - Bass line analysis and accompaniment generation
// Module declarations

pub mod arranger;
pub mod config;
pub mod groove;
pub mod harmony;
pub mod notes;
pub mod pipeline;
pub mod registry;
pub mod source;

pub use config::{ConfigError, GenerationSettings};
pub use notes::NoteEvent;
pub use pipeline::{
    CancelToken, EnsembleGenerator, GeneratedPart, GenerationInput, GenerationReport,
    MemorySink, MidiFileSink, OutputSink, spawn_generation,
};
