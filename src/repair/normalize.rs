use crate::audio::buffer::AudioBuffer;
use crate::diagnostics::DiagnosticsSink;
use crate::error::{AudioError, Result};

pub const DEFAULT_SILENCE_FLOOR: f64 = 1e-6;
pub const DEFAULT_GAIN_CAP: f64 = 10.0;

/// RMS loudness normalizer. Near-silent input gets a capped gain instead of
/// having its noise floor blown up to the target level. Output is not
/// limited; peaks over full scale are only logged.
pub struct Normalizer {
    target_rms_db: f64,
    silence_floor: f64,
    gain_cap: f64,
}

impl Normalizer {
    pub fn new(target_rms_db: f64, silence_floor: f64, gain_cap: f64) -> Result<Self> {
        if !target_rms_db.is_finite() || target_rms_db > 0.0 {
            return Err(AudioError::Parameter(format!(
                "target RMS {} dBFS must be finite and <= 0",
                target_rms_db
            )));
        }
        if !silence_floor.is_finite() || silence_floor <= 0.0 {
            return Err(AudioError::Parameter(format!(
                "silence floor {} must be positive",
                silence_floor
            )));
        }
        if !gain_cap.is_finite() || gain_cap < 1.0 {
            return Err(AudioError::Parameter(format!(
                "gain cap {} must be >= 1",
                gain_cap
            )));
        }
        Ok(Self {
            target_rms_db,
            silence_floor,
            gain_cap,
        })
    }

    #[cfg(test)]
    pub fn with_target(target_rms_db: f64) -> Result<Self> {
        Self::new(target_rms_db, DEFAULT_SILENCE_FLOOR, DEFAULT_GAIN_CAP)
    }

    /// Linear gain for an input of the given RMS. Returns whether the
    /// near-silence cap was applied.
    pub fn gain_for(&self, rms: f64) -> (f64, bool) {
        if rms < self.silence_floor {
            let wanted = 10f64.powf(self.target_rms_db / 20.0) / self.silence_floor;
            (wanted.min(self.gain_cap), true)
        } else {
            (10f64.powf(0.05 * (self.target_rms_db - 20.0 * rms.log10())), false)
        }
    }

    pub fn apply(&self, buffer: &AudioBuffer, sink: &dyn DiagnosticsSink) -> Result<AudioBuffer> {
        buffer.ensure_non_empty()?;

        let rms = buffer.rms();
        let (gain, capped) = self.gain_for(rms);
        if capped {
            sink.warn(
                "normalize",
                format!(
                    "audio has very low volume (rms {:.2e}); gain capped at {:.1}x",
                    rms, gain
                ),
            );
        }

        let g = gain as f32;
        let out = buffer.with_samples(buffer.samples.iter().map(|s| s * g).collect());
        if out.peak() > 1.0 {
            log::debug!("normalize: peak {:.2} exceeds full scale at gain {:.2}", out.peak(), gain);
        }
        Ok(out)
    }
}
