use crate::audio::buffer::{seconds_to_samples, AudioBuffer};
use crate::config::MixConfig;
use crate::error::{AudioError, Result};

/// Longest delay or inserted silence accepted anywhere in a mix.
pub const MAX_OFFSET_SECONDS: f64 = 3600.0;

/// A buffer scheduled onto a mix: scaled by `gain`, starting `delay_seconds`
/// in, optionally repeated until the mix ends.
#[derive(Clone, Debug)]
pub struct Track {
    pub buffer: AudioBuffer,
    pub gain: f32,
    pub delay_seconds: f64,
    pub looped: bool,
}

impl Track {
    pub fn new(buffer: AudioBuffer) -> Self {
        Self {
            buffer,
            gain: 1.0,
            delay_seconds: 0.0,
            looped: false,
        }
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn delayed(mut self, seconds: f64) -> Self {
        self.delay_seconds = seconds;
        self
    }

    pub fn looping(mut self) -> Self {
        self.looped = true;
        self
    }

    fn validate(&self, sample_rate: u32) -> Result<()> {
        self.buffer.ensure_non_empty()?;
        if self.buffer.sample_rate != sample_rate {
            return Err(AudioError::Input(format!(
                "track sample rate {} does not match mix rate {}",
                self.buffer.sample_rate, sample_rate
            )));
        }
        check_gain(self.gain)?;
        check_delay(self.delay_seconds)
    }
}

/// Layers a background bed under narration.
#[derive(Clone, Debug)]
pub struct TrackMixer {
    pub background_volume: f32,
    pub lead_in_seconds: f64,
}

impl Default for TrackMixer {
    fn default() -> Self {
        let cfg = MixConfig::default();
        Self {
            background_volume: cfg.bg_volume,
            lead_in_seconds: cfg.bg_offset,
        }
    }
}

impl TrackMixer {
    pub fn new(background_volume: f32, lead_in_seconds: f64) -> Result<Self> {
        check_gain(background_volume)?;
        check_delay(lead_in_seconds)?;
        Ok(Self {
            background_volume,
            lead_in_seconds,
        })
    }

    pub fn add_background(&self, narration: &AudioBuffer, background: &AudioBuffer) -> Result<AudioBuffer> {
        mix(narration, background, self.background_volume, self.lead_in_seconds)
    }
}

/// Delays `primary` by `delay_seconds` of silence and lays `secondary`
/// underneath at `secondary_gain`, looped from the start of the output.
/// The result is exactly as long as the delayed primary: the secondary is
/// looped or cut to fit, never the other way round. The primary is not
/// attenuated.
pub fn mix(
    primary: &AudioBuffer,
    secondary: &AudioBuffer,
    secondary_gain: f32,
    delay_seconds: f64,
) -> Result<AudioBuffer> {
    primary.ensure_non_empty()?;
    check_delay(delay_seconds)?;

    let mut base = AudioBuffer::silence(delay_seconds, primary.sample_rate)?;
    base.samples.extend_from_slice(&primary.samples);

    layer(&base, &[Track::new(secondary.clone()).gain(secondary_gain).looping()])
}

/// Sums `tracks` onto a copy of `base`. Output length always equals
/// `base.len()`; anything scheduled past the end is dropped.
pub fn layer(base: &AudioBuffer, tracks: &[Track]) -> Result<AudioBuffer> {
    let mut out = base.samples.clone();
    let len = out.len();

    for track in tracks {
        track.validate(base.sample_rate)?;
        let start = seconds_to_samples(track.delay_seconds, base.sample_rate);
        if start >= len {
            continue;
        }
        let src = &track.buffer.samples;
        let g = track.gain;

        if track.looped {
            for (slot, &s) in out[start..].iter_mut().zip(src.iter().cycle()) {
                *slot += g * s;
            }
        } else {
            for (slot, &s) in out[start..].iter_mut().zip(src.iter()) {
                *slot += g * s;
            }
        }
    }

    Ok(base.with_samples(out))
}

fn check_gain(gain: f32) -> Result<()> {
    if !gain.is_finite() || gain < 0.0 {
        return Err(AudioError::Parameter(format!("gain {} must be >= 0", gain)));
    }
    Ok(())
}

pub(crate) fn check_offset(what: &str, seconds: f64) -> Result<()> {
    if !seconds.is_finite() || !(0.0..=MAX_OFFSET_SECONDS).contains(&seconds) {
        return Err(AudioError::Parameter(format!(
            "{} {}s must be within 0..={}s",
            what, seconds, MAX_OFFSET_SECONDS
        )));
    }
    Ok(())
}

fn check_delay(seconds: f64) -> Result<()> {
    check_offset("delay", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp(len: usize, sr: u32) -> AudioBuffer {
        AudioBuffer::new((0..len).map(|i| (i % 97) as f32 / 97.0).collect(), sr).unwrap()
    }

    #[test]
    fn length_follows_primary_for_any_secondary_length() {
        let sr = 8_000;
        let primary = ramp(4_000, sr);
        for secondary_len in [10, 4_000, 100_000] {
            let out = mix(&primary, &ramp(secondary_len, sr), 0.1, 0.0).unwrap();
            assert_eq!(out.len(), primary.len(), "secondary len {}", secondary_len);
        }
    }

    #[test]
    fn ten_second_narration_over_three_second_bed() {
        let sr = 1_000;
        let primary = AudioBuffer::new(vec![0.5; 10 * sr as usize], sr).unwrap();
        let bed = ramp(3 * sr as usize, sr);
        let out = mix(&primary, &bed, 0.1, 3.0).unwrap();

        assert_eq!(out.len(), 13 * sr as usize);
        // Lead-in: primary contributes only its silence padding.
        for i in 0..3_000 {
            assert_abs_diff_eq!(out.samples[i], 0.1 * bed.samples[i], epsilon = 1e-6);
        }
        // The bed keeps looping to the very end.
        for i in (3_000..13_000).step_by(7) {
            let expected = 0.5 + 0.1 * bed.samples[i % 3_000];
            assert_abs_diff_eq!(out.samples[i], expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn primary_is_not_attenuated() {
        let sr = 8_000;
        let primary = ramp(1_000, sr);
        let silent_bed = AudioBuffer::new(vec![0.0; 300], sr).unwrap();
        let out = mix(&primary, &silent_bed, 1.0, 0.0).unwrap();
        assert_eq!(out, primary);
    }

    #[test]
    fn inputs_are_left_untouched() {
        let sr = 8_000;
        let primary = ramp(500, sr);
        let bed = ramp(50, sr);
        let (p0, b0) = (primary.clone(), bed.clone());
        mix(&primary, &bed, 0.5, 0.01).unwrap();
        assert_eq!(primary, p0);
        assert_eq!(bed, b0);
    }

    #[test]
    fn malformed_secondary_surfaces_immediately() {
        let primary = ramp(100, 8_000);
        let empty = AudioBuffer::new(Vec::new(), 8_000).unwrap();
        assert!(matches!(mix(&primary, &empty, 0.1, 0.0), Err(AudioError::Input(_))));
        let wrong_rate = ramp(100, 16_000);
        assert!(matches!(mix(&primary, &wrong_rate, 0.1, 0.0), Err(AudioError::Input(_))));
    }

    #[test]
    fn rejects_negative_gain_and_delay() {
        let a = ramp(100, 8_000);
        assert!(matches!(mix(&a, &a, -0.1, 0.0), Err(AudioError::Parameter(_))));
        assert!(matches!(mix(&a, &a, 0.1, -1.0), Err(AudioError::Parameter(_))));
        assert!(matches!(TrackMixer::new(0.1, f64::NAN), Err(AudioError::Parameter(_))));
    }

    #[test]
    fn absurd_lead_in_is_rejected_before_allocating() {
        let a = ramp(100, 8_000);
        assert!(matches!(mix(&a, &a, 0.1, 1e15), Err(AudioError::Parameter(_))));
        assert!(matches!(TrackMixer::new(0.1, 1e15), Err(AudioError::Parameter(_))));
        assert!(TrackMixer::new(0.1, MAX_OFFSET_SECONDS).is_ok());
        let far = Track::new(a.clone()).delayed(1e15);
        assert!(matches!(layer(&a, &[far]), Err(AudioError::Parameter(_))));
    }

    #[test]
    fn one_shot_track_is_cut_at_the_end() {
        let base = AudioBuffer::new(vec![0.0; 10], 10).unwrap();
        let hit = AudioBuffer::new(vec![1.0; 5], 10).unwrap();
        let out = layer(&base, &[Track::new(hit).gain(0.5).delayed(0.8)]).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(&out.samples[..8], &[0.0; 8]);
        assert_eq!(&out.samples[8..], &[0.5, 0.5]);
    }

    #[test]
    fn default_mixer_uses_configured_bed_settings() {
        let m = TrackMixer::default();
        assert_eq!(m.background_volume, 0.1);
        assert_eq!(m.lead_in_seconds, 3.0);
    }
}
