use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::error::{AudioError, Result};

const RAW_FORMAT: &str = if cfg!(target_endian = "little") { "f32le" } else { "f32be" };

/// Streams mono f32 PCM into an `ffmpeg` subprocess that encodes it to the
/// container implied by the output path.
pub struct FfmpegEncoder {
    child: Child,
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, sample_rate: u32, codec_args: &[String]) -> Result<Self> {
        let mut args = vec![
            "-y".to_string(),
            "-loglevel".into(), "error".into(),
            "-f".into(), RAW_FORMAT.into(),
            "-ar".into(), sample_rate.to_string(),
            "-ac".into(), "1".into(),
            "-i".into(), "pipe:0".into(),
        ];
        args.extend(codec_args.iter().cloned());
        args.push(output_path.to_string_lossy().into_owned());

        let mut command = Command::new("ffmpeg");
        command.args(&args);
        let encoder = Self::spawn(command)?;

        log::debug!("FFmpeg encoder started: {}Hz -> {}", sample_rate, output_path.display());
        Ok(encoder)
    }

    fn spawn(mut command: Command) -> Result<Self> {
        let child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AudioError::resource("ffmpeg", e))?;
        Ok(Self { child })
    }

    /// On a failed write the child is reaped and its stderr is returned in
    /// the error.
    pub fn write_samples(&mut self, samples: &[f32]) -> Result<()> {
        let stdin = self
            .child
            .stdin
            .as_mut()
            .ok_or_else(|| AudioError::Processing("ffmpeg stdin not available".into()))?;
        match stdin.write_all(bytemuck::cast_slice(samples)) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.abort(e)),
        }
    }

    fn abort(&mut self, write_err: std::io::Error) -> AudioError {
        drop(self.child.stdin.take());
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        let status = match self.child.wait() {
            Ok(status) => status.to_string(),
            Err(e) => format!("unknown status ({})", e),
        };
        AudioError::Processing(format!(
            "ffmpeg stopped accepting audio ({}), exited with {}:\n{}",
            write_err,
            status,
            stderr.trim_end()
        ))
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let output = self
            .child
            .wait_with_output()
            .map_err(|e| AudioError::resource("ffmpeg", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::Processing(format!(
                "ffmpeg exited with {}:\n{}",
                output.status, stderr
            )));
        }

        log::debug!("FFmpeg encoding complete");
        Ok(())
    }
}
