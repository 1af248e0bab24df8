//! Program-level assembly: narration segments in sequence order, an optional
//! background bed, and sound effects anchored to narration timestamps.

use super::mixer::{check_offset, layer, Track, TrackMixer};
use crate::audio::buffer::{seconds_to_samples, AudioBuffer};
use crate::audio::speed::change_speed;
use crate::error::{AudioError, Result};

#[derive(Clone, Debug)]
pub struct NarrativeSegment {
    pub sequence: i64,
    pub audio: AudioBuffer,
    pub speed: f64,
    pub trailing_silence_seconds: f64,
}

/// An effect anchored to narration time. Times are seconds from the first
/// narrated word, before any background lead-in.
#[derive(Clone, Debug)]
pub struct SoundEffectPlacement {
    pub start_time: f64,
    pub end_time: f64,
    pub audio: AudioBuffer,
}

#[derive(Clone, Debug)]
pub struct AssembledProgram {
    pub buffer: AudioBuffer,
    pub narration_seconds: f64,
    pub lead_in_seconds: f64,
    pub effects_placed: usize,
}

pub struct TimelineAssembler {
    mixer: TrackMixer,
    effect_volume: f32,
}

impl TimelineAssembler {
    pub fn new(mixer: TrackMixer, effect_volume: f32) -> Result<Self> {
        if !effect_volume.is_finite() || effect_volume < 0.0 {
            return Err(AudioError::Parameter(format!(
                "effect volume {} must be >= 0",
                effect_volume
            )));
        }
        Ok(Self {
            mixer,
            effect_volume,
        })
    }

    /// Concatenates segments by ascending `sequence`. Each segment is
    /// time-scaled by its speed; its trailing silence is inserted before the
    /// next segment, so the last segment ends the narration.
    pub fn combine_segments(&self, mut segments: Vec<NarrativeSegment>) -> Result<AudioBuffer> {
        if segments.is_empty() {
            return Err(AudioError::Input("no narration segments to combine".into()));
        }
        segments.sort_by_key(|s| s.sequence);

        let sample_rate = segments[0].audio.sample_rate;
        let mut samples = Vec::new();
        let last = segments.len() - 1;
        for (i, segment) in segments.iter().enumerate() {
            if segment.audio.sample_rate != sample_rate {
                return Err(AudioError::Input(format!(
                    "segment {} is {}Hz, narration is {}Hz",
                    segment.sequence, segment.audio.sample_rate, sample_rate
                )));
            }
            check_offset(
                &format!("segment {} trailing silence", segment.sequence),
                segment.trailing_silence_seconds,
            )?;

            let audio = change_speed(&segment.audio, segment.speed)?;
            samples.extend_from_slice(&audio.samples);
            if i < last {
                let gap = seconds_to_samples(segment.trailing_silence_seconds, sample_rate);
                samples.resize(samples.len() + gap, 0.0);
            }
        }

        log::info!(
            "Combined {} segments into {:.1}s of narration",
            segments.len(),
            samples.len() as f64 / sample_rate as f64
        );
        let combined = AudioBuffer::new(samples, sample_rate)?;
        combined.ensure_non_empty()?;
        Ok(combined)
    }

    /// Builds the final program. With a background bed the narration starts
    /// after the mixer's lead-in; without one it starts at zero. Effects
    /// follow the narration offset and are cut at the program end.
    pub fn assemble(
        &self,
        segments: Vec<NarrativeSegment>,
        effects: &[SoundEffectPlacement],
        background: Option<&AudioBuffer>,
    ) -> Result<AssembledProgram> {
        let narration = self.combine_segments(segments)?;
        let narration_seconds = narration.duration();

        let (base, lead_in) = match background {
            Some(bed) => (
                self.mixer.add_background(&narration, bed)?,
                self.mixer.lead_in_seconds,
            ),
            None => {
                log::warn!("No background music given; exporting narration without a bed");
                (narration, 0.0)
            }
        };

        let tracks = effects
            .iter()
            .map(|e| self.effect_track(e, lead_in))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let placed = tracks.len();
        let buffer = layer(&base, &tracks)?;

        log::info!(
            "Assembled {:.1}s program ({:.1}s lead-in, {} effects)",
            buffer.duration(),
            lead_in,
            placed
        );
        Ok(AssembledProgram {
            buffer,
            narration_seconds,
            lead_in_seconds: lead_in,
            effects_placed: placed,
        })
    }

    fn effect_track(&self, effect: &SoundEffectPlacement, lead_in: f64) -> Result<Option<Track>> {
        check_offset("effect start", effect.start_time)?;
        if !effect.end_time.is_finite() || effect.end_time < effect.start_time {
            return Err(AudioError::Parameter(format!(
                "effect end {}s precedes start {}s",
                effect.end_time, effect.start_time
            )));
        }
        effect.audio.ensure_non_empty()?;

        let span = effect.end_time - effect.start_time;
        let audio = if span > 0.0 {
            let keep = seconds_to_samples(span, effect.audio.sample_rate).min(effect.audio.len());
            if keep == 0 {
                return Ok(None);
            }
            effect.audio.with_samples(effect.audio.samples[..keep].to_vec())
        } else {
            effect.audio.clone()
        };

        Ok(Some(
            Track::new(audio)
                .gain(self.effect_volume)
                .delayed(lead_in + effect.start_time),
        ))
    }
}
