use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::error::{AudioError, Result};

pub const DEFAULT_FRAME_SIZE: usize = 2048;
pub const DEFAULT_HOP_SIZE: usize = 512;

/// Magnitude and phase grids indexed `[frequency_bin][time_frame]`.
#[derive(Clone, Debug)]
pub struct SpectralFrame {
    pub magnitude: Vec<Vec<f32>>,
    pub phase: Vec<Vec<f32>>,
}

impl SpectralFrame {
    pub fn num_bins(&self) -> usize {
        self.magnitude.len()
    }

    pub fn num_frames(&self) -> usize {
        self.magnitude.first().map_or(0, |row| row.len())
    }

    fn check_shape(&self, expected_bins: usize) -> Result<()> {
        let frames = self.num_frames();
        if self.magnitude.len() != expected_bins || self.phase.len() != expected_bins {
            return Err(AudioError::Processing(format!(
                "spectral grid has {} magnitude / {} phase bins, expected {}",
                self.magnitude.len(),
                self.phase.len(),
                expected_bins
            )));
        }
        let ragged = self
            .magnitude
            .iter()
            .chain(self.phase.iter())
            .any(|row| row.len() != frames);
        if ragged {
            return Err(AudioError::Processing(
                "magnitude and phase grids differ in frame count".into(),
            ));
        }
        Ok(())
    }
}

/// Centered short-time Fourier transform with a periodic Hann window.
/// Frames are zero padded by half a frame on both ends; the inverse uses
/// weighted overlap-add, so `inverse(forward(x), x.len())` reconstructs `x`.
pub struct SpectralTransform {
    frame_size: usize,
    hop_size: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl SpectralTransform {
    pub fn new(frame_size: usize, hop_size: usize) -> Result<Self> {
        if frame_size < 4 || frame_size % 2 != 0 {
            return Err(AudioError::Parameter(format!(
                "frame size {} must be even and at least 4",
                frame_size
            )));
        }
        if hop_size == 0 || hop_size > frame_size / 2 {
            return Err(AudioError::Parameter(format!(
                "hop size {} must be in 1..={}",
                hop_size,
                frame_size / 2
            )));
        }

        let mut planner = FftPlanner::<f32>::new();
        Ok(Self {
            frame_size,
            hop_size,
            window: hann_window(frame_size),
            forward: planner.plan_fft_forward(frame_size),
            inverse: planner.plan_fft_inverse(frame_size),
        })
    }

    pub fn num_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    pub fn forward(&self, samples: &[f32]) -> SpectralFrame {
        let pad = self.frame_size / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let num_frames = 1 + (padded.len() - self.frame_size) / self.hop_size;
        let num_bins = self.num_bins();
        let mut magnitude = vec![vec![0.0f32; num_frames]; num_bins];
        let mut phase = vec![vec![0.0f32; num_frames]; num_bins];

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.frame_size];
        for t in 0..num_frames {
            let start = t * self.hop_size;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.forward.process(&mut buffer);

            for k in 0..num_bins {
                magnitude[k][t] = buffer[k].norm();
                phase[k][t] = buffer[k].arg();
            }
        }

        SpectralFrame { magnitude, phase }
    }

    /// Inverts a spectral grid back to `length` samples.
    pub fn inverse(&self, frame: &SpectralFrame, length: usize) -> Result<Vec<f32>> {
        let num_bins = self.num_bins();
        frame.check_shape(num_bins)?;

        let n = self.frame_size;
        let pad = n / 2;
        let num_frames = frame.num_frames();
        let ola_len = n + self.hop_size * num_frames.saturating_sub(1);
        let mut ola = vec![0.0f32; ola_len];
        let mut weight = vec![0.0f32; ola_len];

        let scale = 1.0 / n as f32;
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
        for t in 0..num_frames {
            for k in 0..num_bins {
                buffer[k] = Complex::from_polar(frame.magnitude[k][t], frame.phase[k][t]);
            }
            // Hermitian mirror for a real signal
            for k in num_bins..n {
                buffer[k] = buffer[n - k].conj();
            }
            self.inverse.process(&mut buffer);

            let start = t * self.hop_size;
            for i in 0..n {
                let w = self.window[i];
                ola[start + i] += buffer[i].re * scale * w;
                weight[start + i] += w * w;
            }
        }

        let mut out = vec![0.0f32; length];
        for (j, sample) in out.iter_mut().enumerate() {
            let idx = j + pad;
            if idx >= ola_len {
                break;
            }
            if weight[idx] > 1e-8 {
                *sample = ola[idx] / weight[idx];
            }
        }
        Ok(out)
    }
}

/// Periodic Hann window of `size` points.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}
