use crate::audio::buffer::AudioBuffer;
use crate::error::{AudioError, Result};

/// Sliding-window adaptive Wiener filter. Gentler than the spectral
/// strategies: it only pulls samples toward the local mean where the local
/// variance sits near the estimated noise floor.
pub struct WienerDenoise {
    window_size: usize,
}

impl WienerDenoise {
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 || window_size % 2 == 0 {
            return Err(AudioError::Parameter(format!(
                "wiener window {} must be a positive odd number",
                window_size
            )));
        }
        Ok(Self { window_size })
    }

    pub fn apply(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        buffer.ensure_non_empty()?;

        let x = &buffer.samples;
        let n = x.len();
        let half = self.window_size / 2;
        let k = self.window_size as f64;

        // Prefix sums of x and x^2; samples outside the buffer count as zero.
        let mut sum = vec![0.0f64; n + 1];
        let mut sum_sq = vec![0.0f64; n + 1];
        for (i, &s) in x.iter().enumerate() {
            let s = s as f64;
            sum[i + 1] = sum[i] + s;
            sum_sq[i + 1] = sum_sq[i] + s * s;
        }

        let mut mean = vec![0.0f64; n];
        let mut var = vec![0.0f64; n];
        for i in 0..n {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            let m = (sum[hi] - sum[lo]) / k;
            let m2 = (sum_sq[hi] - sum_sq[lo]) / k;
            mean[i] = m;
            var[i] = (m2 - m * m).max(0.0);
        }

        let noise = var.iter().sum::<f64>() / n as f64;

        let samples = x
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                if var[i] < noise {
                    mean[i] as f32
                } else {
                    let gain = if var[i] > 0.0 { 1.0 - noise / var[i] } else { 1.0 };
                    (mean[i] + gain * (s as f64 - mean[i])) as f32
                }
            })
            .collect();

        Ok(buffer.with_samples(samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_even_or_zero_window() {
        assert!(matches!(WienerDenoise::new(0), Err(AudioError::Parameter(_))));
        assert!(matches!(WienerDenoise::new(4), Err(AudioError::Parameter(_))));
        assert!(WienerDenoise::new(5).is_ok());
    }

    #[test]
    fn constant_interior_is_preserved() {
        let buf = AudioBuffer::new(vec![0.25; 64], 8_000).unwrap();
        let out = WienerDenoise::new(5).unwrap().apply(&buf).unwrap();
        assert_eq!(out.len(), 64);
        for &s in &out.samples[2..62] {
            assert!((s - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn reduces_low_level_hiss_relative_to_tone() {
        let sr = 16_000;
        let mut state = 7u32;
        let samples: Vec<f32> = (0..sr)
            .map(|i| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let hiss = ((state >> 8) as f32 / (1u32 << 24) as f32 - 0.5) * 0.02;
                let tone = if i < sr / 2 {
                    0.0
                } else {
                    (2.0 * std::f32::consts::PI * 200.0 * i as f32 / sr as f32).sin() * 0.5
                };
                hiss + tone
            })
            .collect();
        let buf = AudioBuffer::new(samples, sr as u32).unwrap();
        let out = WienerDenoise::new(5).unwrap().apply(&buf).unwrap();

        let half = sr / 2;
        let hiss_in = crate::audio::buffer::rms(&buf.samples[..half]);
        let hiss_out = crate::audio::buffer::rms(&out.samples[..half]);
        assert!(hiss_out < hiss_in);
        let tone_out = crate::audio::buffer::rms(&out.samples[half..]);
        assert!(tone_out > 0.3);
    }

    #[test]
    fn empty_input_is_rejected() {
        let buf = AudioBuffer::new(Vec::new(), 8_000).unwrap();
        assert!(matches!(
            WienerDenoise::new(5).unwrap().apply(&buf),
            Err(AudioError::Input(_))
        ));
    }
}
