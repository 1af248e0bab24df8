use std::path::Path;

use super::buffer::AudioBuffer;
use crate::error::{AudioError, Result};

fn float_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Writes a mono 32-bit float WAV. Lossless, so scratch files round-trip exactly.
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let mut writer = hound::WavWriter::create(path, float_spec(buffer.sample_rate))
        .map_err(|e| wav_error(path, e))?;
    for &s in &buffer.samples {
        writer.write_sample(s).map_err(|e| wav_error(path, e))?;
    }
    writer.finalize().map_err(|e| wav_error(path, e))
}

/// Reads a WAV written by [`write_wav`] (or any mono float/int WAV).
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let mut reader = hound::WavReader::open(path).map_err(|e| wav_error(path, e))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(AudioError::Input(format!(
            "{} has {} channels, expected mono",
            path.display(),
            spec.channels
        )));
    }
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| wav_error(path, e))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| wav_error(path, e))?
        }
    };
    AudioBuffer::new(samples, spec.sample_rate)
}

fn wav_error(path: &Path, err: hound::Error) -> AudioError {
    match err {
        hound::Error::IoError(io) => AudioError::resource(path, io),
        other => AudioError::Input(format!("{}: {}", path.display(), other)),
    }
}
