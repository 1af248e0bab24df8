pub mod stft;
