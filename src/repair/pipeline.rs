use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::clicks::ClickRemover;
use super::normalize::Normalizer;
use super::scratch::ScratchDir;
use super::{RepairMethod, RepairStage};
use crate::audio::decode::decode_audio;
use crate::audio::AudioBuffer;
use crate::config::RepairConfig;
use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::encode::AudioWriter;
use crate::error::{AudioError, Result};

/// Output of one repair run plus the names of the stages that produced it.
#[derive(Clone, Debug)]
pub struct ProcessingResult {
    pub buffer: AudioBuffer,
    pub stages: Vec<&'static str>,
}

type StageFn<'a> = &'a dyn Fn(&AudioBuffer) -> Result<AudioBuffer>;

/// Noise reduction, then click removal, then loudness normalization.
pub struct RepairPipeline {
    method: RepairMethod,
    denoise: RepairStage,
    clicks: ClickRemover,
    normalizer: Normalizer,
    sink: Arc<dyn DiagnosticsSink>,
    writer: AudioWriter,
    scratch_root: Option<PathBuf>,
}

impl RepairPipeline {
    pub fn new(
        method: RepairMethod,
        config: &RepairConfig,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Self> {
        Ok(Self {
            method,
            denoise: RepairStage::for_method(method, config)?,
            clicks: ClickRemover::new(config.click_threshold, config.click_radius)?,
            normalizer: Normalizer::new(
                config.target_rms_db,
                config.silence_floor,
                config.gain_cap,
            )?,
            sink,
            writer: AudioWriter::default(),
            scratch_root: config.scratch_dir.clone(),
        })
    }

    pub fn with_writer(mut self, writer: AudioWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn method(&self) -> RepairMethod {
        self.method
    }

    /// Runs all stages on an in-memory buffer without touching the disk.
    pub fn run(&self, input: &AudioBuffer) -> Result<ProcessingResult> {
        self.run_stages(input, Path::new("<memory>"), None)
    }

    /// Decodes `input`, repairs it with intermediates materialized to a
    /// private scratch directory, and writes the result to `output` (or
    /// `<stem>_<method><ext>` next to the input). On any failure the scratch
    /// directory is removed and no output file is created.
    pub fn process(&self, input: &Path, output: Option<&Path>) -> Result<PathBuf> {
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(input, self.method));
        log::info!(
            "Processing {} -> {} (method: {})",
            input.display(),
            output.display(),
            self.method
        );

        let buffer = decode_audio(input).map_err(|e| e.in_stage("decode", input))?;
        let scratch = ScratchDir::new_in(self.scratch_root.as_deref())
            .map_err(|e| e.in_stage("scratch", input))?;
        log::debug!("Intermediates for {} in {}", input.display(), scratch.path().display());

        let result = self.run_stages(&buffer, input, Some(&scratch))?;
        self.writer
            .write(&output, &result.buffer)
            .map_err(|e| e.in_stage("encode", input))?;

        scratch.close().map_err(|e| e.in_stage("scratch", input))?;
        log::info!("Processing complete ({}): {}", result.stages.join(" -> "), output.display());
        Ok(output)
    }

    fn run_stages(
        &self,
        input: &AudioBuffer,
        label: &Path,
        scratch: Option<&ScratchDir>,
    ) -> Result<ProcessingResult> {
        input
            .ensure_non_empty()
            .map_err(|e| e.in_stage(self.denoise.name(), label))?;

        let sink = self.sink.as_ref();
        let denoise = |b: &AudioBuffer| self.denoise.apply(b);
        let declick = |b: &AudioBuffer| self.clicks.apply(b, sink);
        let normalize = |b: &AudioBuffer| self.normalizer.apply(b, sink);
        let steps: [(&'static str, StageFn); 3] = [
            (self.denoise.name(), &denoise),
            ("click_removal", &declick),
            ("normalize", &normalize),
        ];

        let mut current = input.clone();
        let mut stages = Vec::with_capacity(steps.len());
        for (i, &(name, stage)) in steps.iter().enumerate() {
            let out = stage(&current)
                .and_then(|out| check_stage_output(&current, out))
                .map_err(|e| e.in_stage(name, label))?;
            sink.record(Diagnostic::StageApplied {
                stage: name,
                samples: out.len(),
            });
            stages.push(name);

            current = match scratch {
                Some(scratch) if i + 1 < steps.len() => scratch
                    .materialize(name, &out)
                    .map_err(|e| e.in_stage(name, label))?,
                _ => out,
            };
        }

        Ok(ProcessingResult {
            buffer: current,
            stages,
        })
    }
}

fn check_stage_output(input: &AudioBuffer, output: AudioBuffer) -> Result<AudioBuffer> {
    if output.sample_rate != input.sample_rate {
        return Err(AudioError::Processing(format!(
            "sample rate changed from {} to {}",
            input.sample_rate, output.sample_rate
        )));
    }
    if output.is_empty() {
        return Err(AudioError::Processing("stage produced an empty buffer".into()));
    }
    Ok(output)
}

/// `<input_stem>_<method><ext>` beside the input.
pub fn default_output_path(input: &Path, method: RepairMethod) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{}_{}.{}", stem, method, ext.to_string_lossy()),
        None => format!("{}_{}", stem, method),
    };
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::{read_wav, write_wav};
    use crate::diagnostics::testing::MemorySink;
    use approx::assert_relative_eq;

    fn speech_like(seconds: f32, sr: u32) -> AudioBuffer {
        let n = (seconds * sr as f32) as usize;
        let mut state = 3u32;
        let samples = (0..n)
            .map(|i| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let hiss = ((state >> 8) as f32 / (1u32 << 24) as f32 - 0.5) * 0.004;
                let t = i as f32 / sr as f32;
                let voice = if t > 0.15 {
                    (2.0 * std::f32::consts::PI * 180.0 * t).sin() * 0.2
                        + (2.0 * std::f32::consts::PI * 360.0 * t).sin() * 0.05
                } else {
                    0.0
                };
                hiss + voice
            })
            .collect();
        AudioBuffer::new(samples, sr).unwrap()
    }

    fn pipeline(method: RepairMethod, config: &RepairConfig) -> (RepairPipeline, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let p = RepairPipeline::new(method, config, sink.clone()).unwrap();
        (p, sink)
    }

    #[test]
    fn every_method_preserves_rate_and_length() {
        let input = speech_like(1.0, 16_000);
        for method in [RepairMethod::Gentle, RepairMethod::Spectral, RepairMethod::Adaptive] {
            let (p, _) = pipeline(method, &RepairConfig::default());
            let result = p.run(&input).unwrap();
            assert_eq!(result.buffer.sample_rate, 16_000);
            assert_eq!(result.buffer.len(), input.len());
            assert_eq!(result.stages.len(), 3);
            assert_eq!(result.stages[1..], ["click_removal", "normalize"]);
        }
    }

    #[test]
    fn output_is_normalized_to_target() {
        let (p, sink) = pipeline(RepairMethod::Gentle, &RepairConfig::default());
        let result = p.run(&speech_like(1.0, 16_000)).unwrap();
        assert_relative_eq!(result.buffer.rms(), 10f64.powf(-18.0 / 20.0), max_relative = 1e-4);
        let applied: Vec<Diagnostic> = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, Diagnostic::StageApplied { .. }))
            .collect();
        assert_eq!(applied.len(), 3);
    }

    #[test]
    fn empty_input_is_attributed_to_first_stage() {
        let (p, _) = pipeline(RepairMethod::Spectral, &RepairConfig::default());
        let err = p.run(&AudioBuffer::new(Vec::new(), 16_000).unwrap()).unwrap_err();
        assert_eq!(err.stage(), Some("spectral_gate"));
    }

    #[test]
    fn process_writes_default_output_and_cleans_scratch() {
        let work = tempfile::tempdir().unwrap();
        let scratch_root = tempfile::tempdir().unwrap();
        let input = work.path().join("segment_03.wav");
        write_wav(&input, &speech_like(0.5, 22_050)).unwrap();

        let config = RepairConfig {
            scratch_dir: Some(scratch_root.path().to_path_buf()),
            ..RepairConfig::default()
        };
        let (p, _) = pipeline(RepairMethod::Adaptive, &config);
        let out = p.process(&input, None).unwrap();

        assert_eq!(out, work.path().join("segment_03_adaptive.wav"));
        let cleaned = read_wav(&out).unwrap();
        assert_eq!(cleaned.sample_rate, 22_050);
        assert_eq!(cleaned.len(), 11_025);
        assert_eq!(std::fs::read_dir(scratch_root.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_run_leaves_no_output_and_no_scratch() {
        let work = tempfile::tempdir().unwrap();
        let scratch_root = tempfile::tempdir().unwrap();
        let input = work.path().join("segment.wav");
        write_wav(&input, &speech_like(0.5, 16_000)).unwrap();
        let output = work.path().join("missing_dir").join("clean.wav");

        let config = RepairConfig {
            scratch_dir: Some(scratch_root.path().to_path_buf()),
            ..RepairConfig::default()
        };
        let (p, _) = pipeline(RepairMethod::Gentle, &config);
        let err = p.process(&input, Some(&output)).unwrap_err();

        assert_eq!(err.stage(), Some("encode"));
        assert!(err.to_string().contains("segment.wav"));
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(scratch_root.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_input_fails_in_decode() {
        let (p, _) = pipeline(RepairMethod::Gentle, &RepairConfig::default());
        let err = p.process(Path::new("/nonexistent/seg.wav"), None).unwrap_err();
        assert_eq!(err.stage(), Some("decode"));
    }

    #[test]
    fn default_output_name_uses_method() {
        assert_eq!(
            default_output_path(Path::new("/audio/take.mp3"), RepairMethod::Spectral),
            PathBuf::from("/audio/take_spectral.mp3")
        );
        assert_eq!(
            default_output_path(Path::new("raw"), RepairMethod::Gentle),
            PathBuf::from("raw_gentle")
        );
    }
}
