use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dsp::stft::{DEFAULT_FRAME_SIZE, DEFAULT_HOP_SIZE};
use crate::repair::normalize::{DEFAULT_GAIN_CAP, DEFAULT_SILENCE_FLOOR};
use crate::repair::RepairMethod;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub repair: RepairConfig,
    #[serde(default)]
    pub mix: MixConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Repair heuristics. The defaults are tuned for synthesized speech; none
/// of them is a physical constant.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub method: RepairMethod,
    pub frame_size: usize,
    pub hop_size: usize,
    /// Leading stretch assumed to be noise only
    pub noise_window_ms: f64,
    pub threshold_db: f32,
    pub smoothing: f32,
    pub wiener_size: usize,
    pub reduction_amount: f32,
    /// Absolute first-difference above which a sample is treated as a click
    pub click_threshold: f32,
    pub click_radius: usize,
    pub target_rms_db: f64,
    pub gain_cap: f64,
    pub silence_floor: f64,
    /// Parent directory for scratch files; system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    pub bg_volume: f32,
    pub bg_offset: f64,
    pub effect_volume: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mp3_quality: u32,
    pub aac_bitrate: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            method: RepairMethod::Gentle,
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
            noise_window_ms: 100.0,
            threshold_db: -30.0,
            smoothing: 0.05,
            wiener_size: 5,
            reduction_amount: 0.3,
            click_threshold: 0.3,
            click_radius: 5,
            target_rms_db: -18.0,
            gain_cap: DEFAULT_GAIN_CAP,
            silence_floor: DEFAULT_SILENCE_FLOOR,
            scratch_dir: None,
        }
    }
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            bg_volume: 0.1,
            bg_offset: 3.0,
            effect_volume: 1.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mp3_quality: 2,
            aac_bitrate: "192k".into(),
        }
    }
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("Invalid config {}: {}", path.display(), e);
            None
        }
    }
}

/// Explicit path, else `./narramix.toml`, else the per-user config file.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("narramix.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("narramix").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("narramix").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.repair.method, RepairMethod::Gentle);
        assert_eq!(cfg.repair.frame_size, 2048);
        assert_eq!(cfg.repair.click_threshold, 0.3);
        assert_eq!(cfg.mix.bg_volume, 0.1);
        assert_eq!(cfg.mix.bg_offset, 3.0);
        assert_eq!(cfg.output.mp3_quality, 2);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [repair]
            method = "spectral"
            noise_window_ms = 250.0
            gain_cap = 4.0

            [mix]
            bg_volume = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(cfg.repair.method, RepairMethod::Spectral);
        assert_eq!(cfg.repair.noise_window_ms, 250.0);
        assert_eq!(cfg.repair.gain_cap, 4.0);
        assert_eq!(cfg.repair.hop_size, 512);
        assert_eq!(cfg.mix.bg_volume, 0.05);
        assert_eq!(cfg.mix.bg_offset, 3.0);
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narramix.toml");
        std::fs::write(&path, "[output]\naac_bitrate = \"256k\"\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.output.aac_bitrate, "256k");
        assert!(load_config(&dir.path().join("missing.toml")).is_none());
    }

    #[test]
    fn explicit_config_path_wins() {
        let p = Path::new("/etc/custom.toml");
        assert_eq!(find_config(Some(p)), Some(p.to_path_buf()));
    }
}
