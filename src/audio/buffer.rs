use crate::error::{AudioError, Result};

/// Mono PCM signal. Every repair stage and the mixer consume and produce these.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AudioError::Input("sample rate must be positive".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn silence(seconds: f64, sample_rate: u32) -> Result<Self> {
        let len = seconds_to_samples(seconds, sample_rate);
        Self::new(vec![0.0; len], sample_rate)
    }

    /// Fails with an input error when the buffer holds no samples.
    pub fn ensure_non_empty(&self) -> Result<()> {
        if self.samples.is_empty() {
            return Err(AudioError::Input("audio buffer is empty".into()));
        }
        Ok(())
    }

    /// Same sample rate, new samples.
    pub fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn rms(&self) -> f64 {
        rms(&self.samples)
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }
}

pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    (seconds.max(0.0) * sample_rate as f64).round() as usize
}

pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rejects_zero_sample_rate() {
        assert!(matches!(
            AudioBuffer::new(vec![0.0; 4], 0),
            Err(AudioError::Input(_))
        ));
    }

    #[test]
    fn silence_has_expected_length() {
        let buf = AudioBuffer::silence(0.5, 16_000).unwrap();
        assert_eq!(buf.len(), 8_000);
        assert_abs_diff_eq!(buf.duration(), 0.5);
        assert_eq!(buf.rms(), 0.0);
    }

    #[test]
    fn rms_of_constant_signal() {
        let buf = AudioBuffer::new(vec![-0.5; 100], 8_000).unwrap();
        assert_abs_diff_eq!(buf.rms(), 0.5, epsilon = 1e-9);
        assert_eq!(buf.peak(), 0.5);
    }

    #[test]
    fn empty_buffer_is_input_error() {
        let buf = AudioBuffer::new(Vec::new(), 8_000).unwrap();
        assert!(matches!(buf.ensure_non_empty(), Err(AudioError::Input(_))));
    }
}
