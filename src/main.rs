mod audio;
mod cli;
mod config;
mod diagnostics;
mod dsp;
mod encode;
mod error;
mod manifest;
mod mix;
mod repair;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cli::{Cli, Command};
use config::Config;
use diagnostics::LogSink;
use encode::AudioWriter;
use mix::{TimelineAssembler, TrackMixer};
use repair::pipeline::{default_output_path, RepairPipeline};
use repair::RepairMethod;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Command::Clean {
            inputs,
            output,
            out_dir,
            method,
        } => {
            let method = method.unwrap_or(config.repair.method);
            run_clean(&config, &inputs, output, out_dir, method)
        }
        Command::Mix {
            narration,
            background,
            output,
            bg_volume,
            bg_offset,
        } => {
            let mixer = TrackMixer::new(
                bg_volume.unwrap_or(config.mix.bg_volume),
                bg_offset.unwrap_or(config.mix.bg_offset),
            )?;
            run_mix(&config, &narration, &background, &output, &mixer)
        }
        Command::Assemble {
            manifest,
            output,
            clean,
            bg_volume,
            bg_offset,
            receipt,
        } => {
            let mixer = TrackMixer::new(
                bg_volume.unwrap_or(config.mix.bg_volume),
                bg_offset.unwrap_or(config.mix.bg_offset),
            )?;
            run_assemble(&config, &manifest, output, clean, mixer, receipt.as_deref())
        }
    }
}

fn build_pipeline(config: &Config, method: RepairMethod) -> Result<RepairPipeline> {
    let pipeline = RepairPipeline::new(method, &config.repair, Arc::new(LogSink))
        .context("Invalid repair configuration")?
        .with_writer(AudioWriter::from_config(&config.output));
    Ok(pipeline)
}

fn run_clean(
    config: &Config,
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    method: RepairMethod,
) -> Result<()> {
    if output.is_some() && inputs.len() > 1 {
        anyhow::bail!("--output takes a single input; use --out-dir for several");
    }
    if let Some(ref dir) = out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let pipeline = build_pipeline(config, method)?;
    log::info!("Cleaning {} file(s) with method '{}'", inputs.len(), pipeline.method());

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let failures: Vec<(PathBuf, error::AudioError)> = inputs
        .par_iter()
        .filter_map(|input| {
            let target = output.clone().or_else(|| {
                out_dir.as_ref().map(|dir| {
                    let name = default_output_path(input, method);
                    dir.join(name.file_name().unwrap_or(name.as_os_str()))
                })
            });
            let result = pipeline.process(input, target.as_deref());
            pb.inc(1);
            result.err().map(|e| (input.clone(), e))
        })
        .collect();

    pb.finish_and_clear();

    for (input, err) in &failures {
        match err.stage() {
            Some(stage) => log::error!("{} [{}]: {}", input.display(), stage, err),
            None => log::error!("{}: {}", input.display(), err),
        }
    }
    if !failures.is_empty() {
        anyhow::bail!("{} of {} file(s) failed", failures.len(), inputs.len());
    }
    log::info!("Done! Cleaned {} file(s)", inputs.len());
    Ok(())
}

fn run_mix(
    config: &Config,
    narration: &Path,
    background: &Path,
    output: &Path,
    mixer: &TrackMixer,
) -> Result<()> {
    log::info!(
        "Mixing {} with background {} (volume {:.2}, lead-in {:.1}s)",
        narration.display(),
        background.display(),
        mixer.background_volume,
        mixer.lead_in_seconds
    );
    let voice = audio::decode::decode_audio(narration)?;
    let bed = audio::decode::decode_audio(background)?;
    let mixed = mixer.add_background(&voice, &bed)?;
    AudioWriter::from_config(&config.output).write(output, &mixed)?;
    log::info!("Done! Output: {}", output.display());
    Ok(())
}

fn run_assemble(
    config: &Config,
    manifest_path: &Path,
    output: Option<PathBuf>,
    clean: Option<RepairMethod>,
    mixer: TrackMixer,
    receipt_path: Option<&Path>,
) -> Result<()> {
    let manifest = manifest::load_manifest(manifest_path)?;
    let base_dir = manifest_path.parent().unwrap_or(Path::new("."));

    let cleaner = clean.map(|m| build_pipeline(config, m)).transpose()?;
    let segments = manifest.load_segments(base_dir, cleaner.as_ref())?;
    let effects = manifest.load_effects(base_dir)?;
    let background = manifest.load_background(base_dir)?;
    let segment_count = segments.len();

    let assembler = TimelineAssembler::new(mixer, config.mix.effect_volume)?;
    let program = assembler.assemble(segments, &effects, background.as_ref())?;

    let generated_at = chrono::Utc::now();
    let output = output.unwrap_or_else(|| {
        PathBuf::from(format!("final_audio_{}.mp3", generated_at.format("%Y%m%d_%H%M%S")))
    });
    AudioWriter::from_config(&config.output).write(&output, &program.buffer)?;

    let receipt = manifest::Receipt {
        output: output.clone(),
        generated_at,
        duration_seconds: program.buffer.duration(),
        narration_seconds: program.narration_seconds,
        lead_in_seconds: program.lead_in_seconds,
        segments: segment_count,
        effects: program.effects_placed,
    };
    let json = serde_json::to_string_pretty(&receipt)?;
    match receipt_path {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write receipt: {}", path.display()))?,
        None => println!("{}", json),
    }

    log::info!("Done! Output: {}", output.display());
    Ok(())
}
