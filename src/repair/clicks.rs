use crate::audio::buffer::AudioBuffer;
use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::error::{AudioError, Result};

/// Time-domain click and pop repair.
///
/// Clicks are located on the first difference of the input. Each flagged
/// index is then overwritten, in detection order, by a Hann-weighted average
/// of its neighbourhood read from the buffer being repaired. Adjacent flagged
/// indices therefore see each other's repaired values; the result depends on
/// that order.
pub struct ClickRemover {
    derivative_threshold: f32,
    window_radius: usize,
    weights: Vec<f32>,
}

impl ClickRemover {
    pub fn new(derivative_threshold: f32, window_radius: usize) -> Result<Self> {
        if !derivative_threshold.is_finite() || derivative_threshold <= 0.0 {
            return Err(AudioError::Parameter(format!(
                "click threshold {} must be positive",
                derivative_threshold
            )));
        }
        if window_radius == 0 {
            return Err(AudioError::Parameter("click window radius must be at least 1".into()));
        }
        Ok(Self {
            derivative_threshold,
            window_radius,
            weights: repair_weights(window_radius),
        })
    }

    /// Indices `i` where `|x[i+1] - x[i]|` exceeds the threshold.
    pub fn detect(&self, samples: &[f32]) -> Vec<usize> {
        samples
            .windows(2)
            .enumerate()
            .filter(|(_, w)| (w[1] - w[0]).abs() > self.derivative_threshold)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn apply(&self, buffer: &AudioBuffer, sink: &dyn DiagnosticsSink) -> Result<AudioBuffer> {
        buffer.ensure_non_empty()?;

        let flagged = self.detect(&buffer.samples);
        if flagged.is_empty() {
            return Ok(buffer.clone());
        }

        let r = self.window_radius;
        let mut y = buffer.samples.clone();
        let mut repaired = 0usize;
        for &i in &flagged {
            if i <= r || i + r >= y.len() {
                continue;
            }
            y[i] = y[i - r..=i + r]
                .iter()
                .zip(self.weights.iter())
                .map(|(s, w)| s * w)
                .sum();
            repaired += 1;
        }

        sink.record(Diagnostic::ClicksFound {
            detected: flagged.len(),
            repaired,
        });
        Ok(buffer.with_samples(y))
    }
}

/// Symmetric Hann taps over `2r+1` samples, normalized to unit sum. The
/// centre tap is zero: a flagged sample never contributes to its own repair.
fn repair_weights(radius: usize) -> Vec<f32> {
    let len = 2 * radius + 1;
    let mut w: Vec<f32> = (0..len)
        .map(|k| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * k as f32 / (len - 1) as f32).cos())
        .collect();
    w[radius] = 0.0;
    let total: f32 = w.iter().sum();
    w.iter_mut().for_each(|v| *v /= total);
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::testing::MemorySink;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weights_sum_to_one_and_skip_centre() {
        let w = repair_weights(5);
        assert_eq!(w.len(), 11);
        assert_eq!(w[5], 0.0);
        assert_eq!(w[0], 0.0);
        assert_abs_diff_eq!(w.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(w[4], w[6], epsilon = 1e-7);
    }

    #[test]
    fn no_spike_leaves_signal_identical() {
        let samples: Vec<f32> = (0..16_000).map(|i| (i as f32 * 0.01).sin() * 0.8).collect();
        let buf = AudioBuffer::new(samples, 16_000).unwrap();
        let sink = MemorySink::default();
        let out = ClickRemover::new(0.3, 5).unwrap().apply(&buf, &sink).unwrap();
        assert_eq!(out, buf);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn isolated_spike_is_pulled_into_neighbour_range() {
        let sr = 16_000u32;
        let mut samples = vec![0.0f32; 2 * sr as usize];
        samples[8_000] = 0.9;
        let buf = AudioBuffer::new(samples, sr).unwrap();
        let sink = MemorySink::default();
        let out = ClickRemover::new(0.3, 5).unwrap().apply(&buf, &sink).unwrap();

        let neighbours: Vec<f32> = out.samples[7_995..8_000]
            .iter()
            .chain(out.samples[8_001..=8_005].iter())
            .copied()
            .collect();
        let lo = neighbours.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = neighbours.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let v = out.samples[8_000];
        assert!(v >= lo && v <= hi, "{} not in [{}, {}]", v, lo, hi);
        assert_eq!(
            sink.events(),
            vec![Diagnostic::ClicksFound { detected: 2, repaired: 2 }]
        );
    }

    #[test]
    fn adjacent_repairs_see_earlier_results() {
        // Index 99 is repaired first and carries part of the spike at 100,
        // which then feeds into the repair of 100.
        let mut samples = vec![0.0f32; 200];
        samples[100] = 1.0;
        let buf = AudioBuffer::new(samples, 8_000).unwrap();
        let remover = ClickRemover::new(0.3, 5).unwrap();
        assert_eq!(remover.detect(&buf.samples), vec![99, 100]);

        let out = remover.apply(&buf, &MemorySink::default()).unwrap();
        let w = repair_weights(5);
        assert_abs_diff_eq!(out.samples[99], w[6], epsilon = 1e-7);
        assert_abs_diff_eq!(out.samples[100], w[4] * w[6], epsilon = 1e-7);
    }

    #[test]
    fn clicks_near_edges_are_left_alone() {
        let mut samples = vec![0.0f32; 20];
        samples[2] = 1.0;
        samples[18] = 1.0;
        let buf = AudioBuffer::new(samples, 8_000).unwrap();
        let sink = MemorySink::default();
        let out = ClickRemover::new(0.3, 5).unwrap().apply(&buf, &sink).unwrap();
        assert_eq!(out.samples, buf.samples);
        assert_eq!(
            sink.events(),
            vec![Diagnostic::ClicksFound { detected: 4, repaired: 0 }]
        );
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(ClickRemover::new(0.0, 5), Err(AudioError::Parameter(_))));
        assert!(matches!(ClickRemover::new(0.3, 0), Err(AudioError::Parameter(_))));
    }
}
