pub mod adaptive;
pub mod clicks;
pub mod normalize;
pub mod pipeline;
pub mod scratch;
pub mod spectral_gate;
pub mod wiener;

use serde::Deserialize;

use crate::audio::AudioBuffer;
use crate::config::RepairConfig;
use crate::dsp::stft::SpectralTransform;
use crate::error::Result;

use adaptive::AdaptiveThreshold;
use spectral_gate::SpectralGate;
use wiener::WienerDenoise;

/// User-facing choice of noise-reduction strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RepairMethod {
    /// Sliding-window Wiener filter
    #[default]
    Gentle,
    /// Per-bin spectral gate against a leading noise profile
    Spectral,
    /// Global median threshold on the spectrogram
    Adaptive,
}

impl RepairMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RepairMethod::Gentle => "gentle",
            RepairMethod::Spectral => "spectral",
            RepairMethod::Adaptive => "adaptive",
        }
    }
}

impl std::fmt::Display for RepairMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Noise-reduction stage, bound once when a pipeline is built.
pub enum RepairStage {
    SpectralGate(SpectralGate),
    Wiener(WienerDenoise),
    Adaptive(AdaptiveThreshold),
}

impl RepairStage {
    pub fn for_method(method: RepairMethod, config: &RepairConfig) -> Result<Self> {
        Ok(match method {
            RepairMethod::Gentle => RepairStage::Wiener(WienerDenoise::new(config.wiener_size)?),
            RepairMethod::Spectral => RepairStage::SpectralGate(SpectralGate::new(
                SpectralTransform::new(config.frame_size, config.hop_size)?,
                config.threshold_db,
                config.smoothing,
                config.noise_window_ms / 1000.0,
            )?),
            RepairMethod::Adaptive => RepairStage::Adaptive(AdaptiveThreshold::new(
                SpectralTransform::new(config.frame_size, config.hop_size)?,
                config.reduction_amount,
            )?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RepairStage::SpectralGate(_) => "spectral_gate",
            RepairStage::Wiener(_) => "wiener",
            RepairStage::Adaptive(_) => "adaptive_threshold",
        }
    }

    pub fn apply(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        match self {
            RepairStage::SpectralGate(stage) => stage.apply(buffer),
            RepairStage::Wiener(stage) => stage.apply(buffer),
            RepairStage::Adaptive(stage) => stage.apply(buffer),
        }
    }
}
