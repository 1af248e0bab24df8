//! Per-bin spectral gate driven by a noise profile taken from the leading
//! window of the signal.

use crate::audio::buffer::{seconds_to_samples, AudioBuffer};
use crate::dsp::stft::SpectralTransform;
use crate::error::{AudioError, Result};

/// Mean power per frequency bin of a stretch assumed to hold only noise.
#[derive(Clone, Debug)]
pub struct NoiseProfile {
    pub spectrum: Vec<f32>,
}

impl NoiseProfile {
    /// Estimates from the first `window_seconds` of `buffer`, or from the
    /// whole buffer when it is shorter than that.
    pub fn estimate(
        transform: &SpectralTransform,
        buffer: &AudioBuffer,
        window_seconds: f64,
    ) -> Self {
        let len = seconds_to_samples(window_seconds, buffer.sample_rate).min(buffer.len());
        let spec = transform.forward(&buffer.samples[..len]);
        let frames = spec.num_frames().max(1) as f32;
        let spectrum = spec
            .magnitude
            .iter()
            .map(|row| row.iter().map(|m| m * m).sum::<f32>() / frames)
            .collect();
        Self { spectrum }
    }
}

pub struct SpectralGate {
    transform: SpectralTransform,
    threshold_db: f32,
    smoothing: f32,
    noise_window_seconds: f64,
}

impl SpectralGate {
    pub fn new(
        transform: SpectralTransform,
        threshold_db: f32,
        smoothing: f32,
        noise_window_seconds: f64,
    ) -> Result<Self> {
        if !threshold_db.is_finite() {
            return Err(AudioError::Parameter(format!(
                "gate threshold {} dB is not finite",
                threshold_db
            )));
        }
        if !smoothing.is_finite() || smoothing < 0.0 {
            return Err(AudioError::Parameter(format!(
                "gate smoothing {} must be >= 0",
                smoothing
            )));
        }
        if !noise_window_seconds.is_finite() || noise_window_seconds <= 0.0 {
            return Err(AudioError::Parameter(format!(
                "noise window {}s must be positive",
                noise_window_seconds
            )));
        }
        Ok(Self {
            transform,
            threshold_db,
            smoothing,
            noise_window_seconds,
        })
    }

    pub fn apply(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        buffer.ensure_non_empty()?;

        let mut spec = self.transform.forward(&buffer.samples);
        let noise = NoiseProfile::estimate(&self.transform, buffer, self.noise_window_seconds);
        if noise.spectrum.len() != spec.num_bins() {
            return Err(AudioError::Processing(format!(
                "noise profile has {} bins, spectrum has {}",
                noise.spectrum.len(),
                spec.num_bins()
            )));
        }

        let factor = 10f32.powf(self.threshold_db / 10.0);
        for (row, &noise_power) in spec.magnitude.iter_mut().zip(noise.spectrum.iter()) {
            let threshold = factor * noise_power;
            let mut mask: Vec<f32> = row
                .iter()
                .map(|&m| if m * m > threshold { 1.0 } else { 0.0 })
                .collect();
            if self.smoothing > 0.0 {
                mask = smooth_mask(&mask);
            }
            for (m, g) in row.iter_mut().zip(mask.iter()) {
                *m *= g;
            }
        }

        let samples = self.transform.inverse(&spec, buffer.len())?;
        Ok(buffer.with_samples(samples))
    }
}

/// 3-tap moving average along time. The edge frames average over the taps
/// that exist, so an all-pass mask stays all-pass.
fn smooth_mask(mask: &[f32]) -> Vec<f32> {
    let n = mask.len();
    (0..n)
        .map(|t| {
            let lo = t.saturating_sub(1);
            let hi = (t + 1).min(n - 1);
            let taps = &mask[lo..=hi];
            taps.iter().sum::<f32>() / taps.len() as f32
        })
        .collect()
}
