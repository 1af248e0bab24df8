use crate::audio::buffer::AudioBuffer;
use crate::dsp::stft::SpectralTransform;
use crate::error::{AudioError, Result};

/// Global-threshold spectral cleanup: one cutoff for the whole grid,
/// `median(magnitude) * reduction_amount`. Coarser and more aggressive than
/// the per-bin gate.
pub struct AdaptiveThreshold {
    transform: SpectralTransform,
    reduction_amount: f32,
}

impl AdaptiveThreshold {
    pub fn new(transform: SpectralTransform, reduction_amount: f32) -> Result<Self> {
        if !reduction_amount.is_finite() || reduction_amount < 0.0 {
            return Err(AudioError::Parameter(format!(
                "reduction amount {} must be >= 0",
                reduction_amount
            )));
        }
        Ok(Self {
            transform,
            reduction_amount,
        })
    }

    pub fn apply(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        buffer.ensure_non_empty()?;

        let mut spec = self.transform.forward(&buffer.samples);
        let mut all: Vec<f32> = spec.magnitude.iter().flatten().copied().collect();
        let threshold = median(&mut all) * self.reduction_amount;

        let mut zeroed = 0usize;
        for (mag_row, phase_row) in spec.magnitude.iter_mut().zip(spec.phase.iter_mut()) {
            for (m, p) in mag_row.iter_mut().zip(phase_row.iter_mut()) {
                if *m <= threshold {
                    *m = 0.0;
                    *p = 0.0;
                    zeroed += 1;
                }
            }
        }
        log::debug!(
            "adaptive: threshold {:.6}, zeroed {}/{} bins",
            threshold,
            zeroed,
            all.len()
        );

        let samples = self.transform.inverse(&spec, buffer.len())?;
        Ok(buffer.with_samples(samples))
    }
}

/// Median with the two middle values averaged for even lengths.
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) * 0.5
    } else {
        values[mid]
    }
}
