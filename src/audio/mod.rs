pub mod buffer;
pub mod decode;
pub mod speed;
pub mod wav;

pub use buffer::AudioBuffer;
