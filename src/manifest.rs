use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::audio::decode::decode_audio;
use crate::audio::AudioBuffer;
use crate::mix::{NarrativeSegment, SoundEffectPlacement};
use crate::repair::pipeline::RepairPipeline;

/// Program description handed over by the analysis/generation side.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub segments: Vec<SegmentEntry>,
    #[serde(default)]
    pub effects: Vec<EffectEntry>,
    #[serde(default)]
    pub background: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct SegmentEntry {
    pub sequence: i64,
    #[serde(default)]
    pub audio: Option<PathBuf>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub trailing_silence: f64,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EffectEntry {
    pub audio: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_speed() -> f64 { 1.0 }

/// Handed back to the persistence side once a program has been written.
#[derive(Debug, Serialize)]
pub struct Receipt {
    pub output: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub narration_seconds: f64,
    pub lead_in_seconds: f64,
    pub segments: usize,
    pub effects: usize,
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}

impl Manifest {
    /// Decodes every segment that has audio, optionally cleaning each one.
    /// Segments without audio are skipped with a warning.
    pub fn load_segments(
        &self,
        base_dir: &Path,
        cleaner: Option<&RepairPipeline>,
    ) -> Result<Vec<NarrativeSegment>> {
        self.segments
            .par_iter()
            .filter_map(|entry| {
                let Some(audio) = entry.audio.as_ref() else {
                    log::warn!("Segment {} has no audio, skipping", entry.sequence);
                    return None;
                };
                Some(load_segment(entry, &resolve(base_dir, audio), cleaner))
            })
            .collect()
    }

    pub fn load_effects(&self, base_dir: &Path) -> Result<Vec<SoundEffectPlacement>> {
        self.effects
            .iter()
            .map(|entry| {
                let path = resolve(base_dir, &entry.audio);
                let audio = decode_audio(&path).with_context(|| {
                    format!(
                        "Failed to load effect '{}'",
                        entry.name.as_deref().unwrap_or("unnamed")
                    )
                })?;
                log::debug!(
                    "Effect '{}' at {:.2}s-{:.2}s",
                    entry.name.as_deref().unwrap_or("unnamed"),
                    entry.start_time,
                    entry.end_time
                );
                Ok(SoundEffectPlacement {
                    start_time: entry.start_time,
                    end_time: entry.end_time,
                    audio,
                })
            })
            .collect()
    }

    pub fn load_background(&self, base_dir: &Path) -> Result<Option<AudioBuffer>> {
        self.background
            .as_ref()
            .map(|p| {
                let path = resolve(base_dir, p);
                decode_audio(&path)
                    .with_context(|| format!("Failed to load background: {}", path.display()))
            })
            .transpose()
    }
}

fn load_segment(
    entry: &SegmentEntry,
    path: &Path,
    cleaner: Option<&RepairPipeline>,
) -> Result<NarrativeSegment> {
    let mut audio = decode_audio(path)
        .with_context(|| format!("Failed to load segment {}", entry.sequence))?;
    if let Some(pipeline) = cleaner {
        audio = pipeline
            .run(&audio)
            .with_context(|| format!("Failed to clean segment {} ({})", entry.sequence, path.display()))?
            .buffer;
    }
    if let Some(text) = entry.text.as_deref() {
        log::debug!("Segment {}: {:?}", entry.sequence, text);
    }
    Ok(NarrativeSegment {
        sequence: entry.sequence,
        audio,
        speed: entry.speed,
        trailing_silence_seconds: entry.trailing_silence,
    })
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
