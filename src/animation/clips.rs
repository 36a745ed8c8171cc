use super::animator::Animation;
use serde::{Deserialize, Serialize};

/// A named frame range of the character take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    pub first_frame: u32,
    pub last_frame: u32,
}

impl AnimationClip {
    pub fn new(name: &str, first_frame: u32, last_frame: u32) -> Self {
        Self {
            name: name.to_string(),
            first_frame,
            last_frame,
        }
    }

    pub fn to_animation(&self, frame_rate: f64) -> Animation {
        Animation::from_frames(self.first_frame, self.last_frame, frame_rate)
    }
}

/// Clip table of the bundled robot take.
pub fn default_clips() -> Vec<AnimationClip> {
    vec![
        AnimationClip::new("Left Right", 1, 50),
        AnimationClip::new("Fall", 51, 80),
        AnimationClip::new("Walk", 81, 107),
        AnimationClip::new("Run", 108, 124),
        AnimationClip::new("Stealth", 125, 151),
        AnimationClip::new("Stealth Left Right", 152, 201),
    ]
}

pub fn find_clip<'a>(clips: &'a [AnimationClip], name: &str) -> Option<&'a AnimationClip> {
    clips.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_convert_at_file_rate() {
        let walk = find_clip(&default_clips(), "walk").cloned().unwrap();
        let anim = walk.to_animation(24.0);
        assert!((anim.start.seconds() - 81.0 / 24.0).abs() < 1e-9);
        assert!((anim.end.seconds() - 107.0 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn clips_cover_take_without_overlap() {
        let clips = default_clips();
        for pair in clips.windows(2) {
            assert_eq!(pair[0].last_frame + 1, pair[1].first_frame);
        }
    }
}
