use std::path::Path;

use super::ffmpeg::FfmpegEncoder;
use crate::audio::wav::write_wav;
use crate::audio::AudioBuffer;
use crate::config::OutputConfig;
use crate::error::{AudioError, Result};

/// Writes finished buffers to disk. WAV goes through hound; anything else is
/// handed to ffmpeg. Output is staged next to the destination and renamed
/// into place, so a failed write never leaves a partial file behind.
#[derive(Clone, Debug)]
pub struct AudioWriter {
    mp3_quality: u32,
    aac_bitrate: String,
}

impl Default for AudioWriter {
    fn default() -> Self {
        Self::from_config(&OutputConfig::default())
    }
}

impl AudioWriter {
    pub fn from_config(config: &OutputConfig) -> Self {
        Self {
            mp3_quality: config.mp3_quality,
            aac_bitrate: config.aac_bitrate.clone(),
        }
    }

    pub fn write(&self, path: &Path, buffer: &AudioBuffer) -> Result<()> {
        buffer.ensure_non_empty()?;

        let ext = extension(path);
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let suffix = format!(".{}", ext);
        let staged = tempfile::Builder::new()
            .prefix(".narramix-out-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| AudioError::resource(dir, e))?;

        if ext == "wav" {
            write_wav(staged.path(), buffer)?;
        } else {
            let mut encoder =
                FfmpegEncoder::new(staged.path(), buffer.sample_rate, &self.codec_args(&ext))?;
            encoder.write_samples(&buffer.samples)?;
            encoder.finish()?;
        }

        staged
            .persist(path)
            .map_err(|e| AudioError::resource(path, e.error))?;
        log::info!(
            "Wrote {} ({:.1}s, {}Hz)",
            path.display(),
            buffer.duration(),
            buffer.sample_rate
        );
        Ok(())
    }

    fn codec_args(&self, ext: &str) -> Vec<String> {
        let args: Vec<&str> = match ext {
            "mp3" => vec!["-c:a", "libmp3lame", "-q:a"],
            "m4a" | "aac" => vec!["-c:a", "aac", "-b:a"],
            "ogg" => vec!["-c:a", "libvorbis"],
            "flac" => vec!["-c:a", "flac"],
            _ => Vec::new(),
        };
        let mut args: Vec<String> = args.into_iter().map(String::from).collect();
        match ext {
            "mp3" => args.push(self.mp3_quality.to_string()),
            "m4a" | "aac" => args.push(self.aac_bitrate.clone()),
            _ => {}
        }
        args
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "wav".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::read_wav;

    #[test]
    fn wav_output_lands_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("final.wav");
        let buf = AudioBuffer::new(vec![0.1, 0.2, -0.3], 24_000).unwrap();
        AudioWriter::default().write(&out, &buf).unwrap();
        assert_eq!(read_wav(&out).unwrap(), buf);
        // Only the destination remains; the staged file was renamed.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_destination_directory_is_resource_error() {
        let buf = AudioBuffer::new(vec![0.1; 10], 24_000).unwrap();
        let err = AudioWriter::default()
            .write(Path::new("/nonexistent/out/final.wav"), &buf)
            .unwrap_err();
        assert!(matches!(err, AudioError::Resource { .. }));
    }

    #[test]
    fn codec_arguments_follow_extension() {
        let writer = AudioWriter::default();
        assert_eq!(writer.codec_args("mp3"), vec!["-c:a", "libmp3lame", "-q:a", "2"]);
        assert_eq!(writer.codec_args("m4a"), vec!["-c:a", "aac", "-b:a", "192k"]);
        assert!(writer.codec_args("opus").is_empty());
    }

    #[test]
    fn empty_buffer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let buf = AudioBuffer::new(Vec::new(), 24_000).unwrap();
        assert!(matches!(
            AudioWriter::default().write(&dir.path().join("x.wav"), &buf),
            Err(AudioError::Input(_))
        ));
    }
}
