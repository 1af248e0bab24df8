/// Event emitted by a repair stage or mixer while it runs.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    StageApplied { stage: &'static str, samples: usize },
    ClicksFound { detected: usize, repaired: usize },
    Warning { stage: &'static str, message: String },
}

/// Receives diagnostics from a pipeline run. Injected per pipeline so runs
/// stay independent of any process-wide logger state.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: Diagnostic);

    fn warn(&self, stage: &'static str, message: String) {
        self.record(Diagnostic::Warning { stage, message });
    }
}

/// Forwards diagnostics to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn record(&self, event: Diagnostic) {
        match event {
            Diagnostic::StageApplied { stage, samples } => {
                log::info!("{}: processed {} samples", stage, samples);
            }
            Diagnostic::ClicksFound { detected, repaired } => {
                log::info!(
                    "Found {} potential clicks/pops, repaired {}",
                    detected, repaired
                );
            }
            Diagnostic::Warning { stage, message } => {
                log::warn!("{}: {}", stage, message);
            }
        }
    }
}
