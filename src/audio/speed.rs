use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use super::buffer::AudioBuffer;
use crate::error::{AudioError, Result};

pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 4.0;

/// Time-scales a segment by `speed` (2.0 plays twice as fast). Resampling
/// keeps the nominal sample rate, so pitch shifts with speed.
pub fn change_speed(buffer: &AudioBuffer, speed: f64) -> Result<AudioBuffer> {
    if !speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(AudioError::Parameter(format!(
            "speed {} outside {}..={}",
            speed, MIN_SPEED, MAX_SPEED
        )));
    }
    if (speed - 1.0).abs() < 1e-6 || buffer.is_empty() {
        return Ok(buffer.clone());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(1.0 / speed, 2.0, params, buffer.len(), 1)
        .map_err(|e| AudioError::Processing(format!("resampler setup: {}", e)))?;

    let input = vec![buffer.samples.clone()];
    let mut samples = resampler
        .process(&input, None)
        .map_err(|e| AudioError::Processing(format!("resampling: {}", e)))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // The sinc filter holds back the tail of the chunk until it is flushed.
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| AudioError::Processing(format!("resampler flush: {}", e)))?;
    if let Some(tail) = tail.into_iter().next() {
        samples.extend(tail);
    }
    samples.resize(scaled_len(buffer.len(), speed), 0.0);

    log::debug!(
        "Speed {:.2}x: {} -> {} samples",
        speed,
        buffer.len(),
        samples.len()
    );
    Ok(buffer.with_samples(samples))
}

/// Sample count of a `len`-sample buffer played at `speed`.
pub fn scaled_len(len: usize, speed: f64) -> usize {
    (len as f64 / speed).round() as usize
}
