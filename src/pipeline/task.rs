// Generation Task - Run a generator on a worker thread
// The caller keeps a cancellation token polled between output combinations

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::{JoinError, JoinHandle};
use crate::config::GenerationSettings;
use super::generator::{EnsembleGenerator, GenerationInput};
use super::report::GenerationReport;
use super::sink::OutputSink;

/// Shared stop flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A running generation
pub struct GenerationTask {
    pub cancel: CancelToken,
    pub handle: JoinHandle<GenerationReport>,
}

impl GenerationTask {
    /// Wait for the report
    pub async fn join(self) -> Result<GenerationReport, JoinError> {
        self.handle.await
    }
}

/// Run `generator` on tokio's blocking pool
///
/// Must be called from within a tokio runtime.
pub fn spawn_generation(
    generator: EnsembleGenerator,
    input: GenerationInput,
    settings: GenerationSettings,
    mut sink: Box<dyn OutputSink + Send>,
) -> GenerationTask {
    let cancel = CancelToken::new();
    let token = cancel.clone();

    let handle = tokio::task::spawn_blocking(move || {
        generator.generate(&input, &settings, &token, sink.as_mut())
    });

    GenerationTask { cancel, handle }
}
