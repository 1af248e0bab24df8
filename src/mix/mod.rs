pub mod mixer;
pub mod timeline;

pub use mixer::TrackMixer;
pub use timeline::{NarrativeSegment, SoundEffectPlacement, TimelineAssembler};
