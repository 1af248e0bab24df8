use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::repair::RepairMethod;

#[derive(Parser, Debug)]
#[command(name = "narramix", about = "Speech cleanup and narration mixdown")]
pub struct Cli {
    /// Config file (defaults to ./narramix.toml or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove noise, clicks and level jumps from synthesized speech
    Clean {
        /// Input audio files (WAV, MP3, FLAC, OGG)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (single input only; default: <stem>_<method><ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for cleaned files when processing several inputs
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Noise reduction method
        #[arg(short, long, value_enum)]
        method: Option<RepairMethod>,
    },

    /// Lay a looping background bed under a narration
    Mix {
        /// Narration audio
        narration: PathBuf,

        /// Background music, looped to the narration length
        background: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "mixed.mp3")]
        output: PathBuf,

        /// Background volume (0.1 = 10%)
        #[arg(long)]
        bg_volume: Option<f32>,

        /// Seconds of background before the narration starts
        #[arg(long)]
        bg_offset: Option<f64>,
    },

    /// Build the final program from a JSON manifest of segments and effects
    Assemble {
        /// Manifest file
        manifest: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Clean each segment before assembly
        #[arg(long, value_enum)]
        clean: Option<RepairMethod>,

        /// Background volume (0.1 = 10%)
        #[arg(long)]
        bg_volume: Option<f32>,

        /// Seconds of background before the narration starts
        #[arg(long)]
        bg_offset: Option<f64>,

        /// Write the JSON receipt here instead of stdout
        #[arg(long)]
        receipt: Option<PathBuf>,
    },
}
