pub mod ffmpeg;
pub mod writer;

pub use writer::AudioWriter;
