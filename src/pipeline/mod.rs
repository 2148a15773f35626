// Pipeline - Batch generation, output sinks, reports and progress tracing
// Drives analysis, harmony and playback for every requested combination

pub mod trace;
pub mod presets;
pub mod report;
pub mod generator;
pub mod sink;
pub mod task;

pub use trace::{RunTrace, Stage, TraceEntry, TraceError, TraceWriter, read_trace_file};
pub use presets::{PRESET_NAMES, preset_pairs};
pub use report::{FailedItem, GenerationReport, OutputRecord, ReportError, SkippedItem, METADATA_FILE, source_digest};
pub use generator::{EnsembleGenerator, GeneratedPart, GenerationInput, output_stem, render_part};
pub use sink::{MemorySink, MidiFileSink, OutputSink};
pub use task::{CancelToken, GenerationTask, spawn_generation};
