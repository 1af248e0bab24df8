use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::audio::wav::{read_wav, write_wav};
use crate::audio::AudioBuffer;
use crate::error::{AudioError, Result};

/// Uniquely named scratch directory for one pipeline invocation. Removed on
/// drop, so every exit path releases it; `close` reports removal failures.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn new_in(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("narramix-repair-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| {
            let at = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
            AudioError::resource(at, e)
        })?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a stage result to scratch and reads it back as the next
    /// stage's input.
    pub fn materialize(&self, stage: &str, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        let path: PathBuf = self.dir.path().join(format!("{}.wav", stage));
        write_wav(&path, buffer)?;
        read_wav(&path)
    }

    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| AudioError::resource(path, e))
    }
}
