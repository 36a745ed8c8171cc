// Animation playback: the blend state machine, interpolation helpers and the
// named clip table.

pub mod animator;
pub mod clips;
pub mod interpolation;

pub use animator::{Animation, Animator};
pub use clips::{AnimationClip, default_clips, find_clip};
pub use interpolation::*;
