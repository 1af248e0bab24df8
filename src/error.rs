use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the repair and mixing core.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Missing, corrupt, or zero-length audio.
    #[error("invalid input: {0}")]
    Input(String),

    /// Out-of-range threshold, gain, or window argument.
    #[error("invalid parameter: {0}")]
    Parameter(String),

    /// Internal stage failure such as a transform shape mismatch.
    #[error("processing failed: {0}")]
    Processing(String),

    /// Scratch or output file could not be created, written, or removed.
    #[error("resource error at {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A pipeline stage failed on a specific input.
    #[error("stage '{stage}' failed on {}: {source}", input.display())]
    Stage {
        stage: &'static str,
        input: PathBuf,
        #[source]
        source: Box<AudioError>,
    },
}

impl AudioError {
    pub fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AudioError::Resource {
            path: path.into(),
            source,
        }
    }

    pub fn in_stage(self, stage: &'static str, input: impl Into<PathBuf>) -> Self {
        AudioError::Stage {
            stage,
            input: input.into(),
            source: Box::new(self),
        }
    }

    /// Name of the stage a failure is attributed to, if any.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            AudioError::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;
