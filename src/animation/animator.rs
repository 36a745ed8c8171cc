// Two-slot animation blending over a single imported take.
//
// Slot 0 is the animation currently shown; slot 1 is the animation being faded
// in. `weight` is the share of slot 0 in the blended pose: it starts at 1 when a
// transition begins and decays to 0 over the transition time, at which point
// slot 1 replaces slot 0.

use crate::fbx::FbxTime;

/// A sub-range of the take timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub start: FbxTime,
    pub end: FbxTime,
}

impl Animation {
    pub fn new(from_seconds: f64, to_seconds: f64) -> Self {
        Self {
            start: FbxTime::from_seconds(from_seconds),
            end: FbxTime::from_seconds(to_seconds),
        }
    }

    pub fn from_frames(first: u32, last: u32, frame_rate: f64) -> Self {
        Self {
            start: FbxTime::from_frame(first as f64, frame_rate),
            end: FbxTime::from_frame(last as f64, frame_rate),
        }
    }

    /// Advances `cursor` by `dt`, jumping back to the start once it passes the end.
    fn advance(&self, cursor: &mut FbxTime, dt: FbxTime) {
        *cursor += dt;
        if *cursor > self.end {
            *cursor = self.start;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Animator {
    start: FbxTime,
    end: FbxTime,
    current0: FbxTime,
    current1: FbxTime,
    weight: f32,
    transition_time: f32,
    anim0: Option<Animation>,
    anim1: Option<Animation>,
}

impl Animator {
    /// An animator over the take span `[start, end]`, playing the whole take
    /// until an animation is selected.
    pub fn new(start: FbxTime, end: FbxTime) -> Self {
        Self {
            start,
            end,
            current0: start,
            current1: start,
            weight: 1.0,
            transition_time: 0.0,
            anim0: None,
            anim1: None,
        }
    }

    pub fn update(&mut self, dt: f32) {
        if self.anim1.is_some() {
            self.weight -= if self.transition_time > 0.0 {
                dt / self.transition_time
            } else {
                1.0
            };
            if self.weight <= 0.0 {
                self.weight = 1.0;
                self.anim0 = self.anim1.take();
                self.current0 = self.current1;
            }
        }

        let step = FbxTime::from_seconds(dt as f64);
        let take = Animation {
            start: self.start,
            end: self.end,
        };
        self.anim0.unwrap_or(take).advance(&mut self.current0, step);
        if let Some(anim1) = self.anim1 {
            anim1.advance(&mut self.current1, step);
        }
    }

    /// Switches to `animation`, instantly when `transition_time <= 0`, otherwise
    /// cross-fading over `transition_time` seconds.
    pub fn transition_to(&mut self, animation: Animation, transition_time: f32) {
        if transition_time <= 0.0 {
            self.anim0 = Some(animation);
            self.anim1 = None;
            self.weight = 1.0;
            self.current0 = animation.start;
        } else {
            self.anim1 = Some(animation);
            self.weight = 1.0;
            self.transition_time = transition_time;
            self.current1 = animation.start;
        }
    }

    pub fn current0(&self) -> FbxTime {
        self.current0
    }

    pub fn current1(&self) -> FbxTime {
        self.current1
    }

    /// Share of slot 0 in the blended pose, in `(0, 1]`.
    pub fn weight0(&self) -> f32 {
        self.weight
    }

    pub fn is_transitioning(&self) -> bool {
        self.anim1.is_some()
    }

    pub fn animation0(&self) -> Option<Animation> {
        self.anim0
    }

    pub fn take_span(&self) -> (FbxTime, FbxTime) {
        (self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(t: FbxTime) -> f64 {
        t.seconds()
    }

    fn animator() -> Animator {
        Animator::new(FbxTime::ZERO, FbxTime::from_seconds(10.0))
    }

    #[test]
    fn plays_whole_take_without_animation() {
        let mut a = animator();
        a.update(4.0);
        assert!((secs(a.current0()) - 4.0).abs() < 1e-6);
        a.update(7.0);
        assert_eq!(a.current0(), FbxTime::ZERO);
    }

    #[test]
    fn instant_transition_resets_cursor() {
        let mut a = animator();
        a.transition_to(Animation::new(2.0, 3.0), 0.0);
        assert_eq!(a.current0(), FbxTime::from_seconds(2.0));
        assert_eq!(a.weight0(), 1.0);
        assert!(!a.is_transitioning());
    }

    #[test]
    fn cursor_wraps_to_animation_start() {
        let mut a = animator();
        a.transition_to(Animation::new(2.0, 3.0), 0.0);
        a.update(0.75);
        assert!((secs(a.current0()) - 2.75).abs() < 1e-6);
        a.update(0.5);
        assert_eq!(a.current0(), FbxTime::from_seconds(2.0));
    }

    #[test]
    fn crossfade_decays_weight_over_duration() {
        let mut a = animator();
        a.transition_to(Animation::new(0.0, 5.0), 0.0);
        a.transition_to(Animation::new(6.0, 9.0), 2.0);
        assert!(a.is_transitioning());

        a.update(0.5);
        assert!((a.weight0() - 0.75).abs() < 1e-6);
        assert!((secs(a.current0()) - 0.5).abs() < 1e-6);
        assert!((secs(a.current1()) - 6.5).abs() < 1e-6);

        a.update(1.0);
        assert!((a.weight0() - 0.25).abs() < 1e-6);
        assert!(a.is_transitioning());
    }

    #[test]
    fn slot_one_is_absorbed_when_weight_reaches_zero() {
        let mut a = animator();
        a.transition_to(Animation::new(0.0, 5.0), 0.0);
        let next = Animation::new(6.0, 9.0);
        a.transition_to(next, 1.0);

        a.update(0.5);
        a.update(0.5);

        assert!(!a.is_transitioning());
        assert_eq!(a.weight0(), 1.0);
        assert_eq!(a.animation0(), Some(next));
        // slot 0 took over slot 1's cursor, then advanced
        assert!((secs(a.current0()) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn instant_transition_cancels_crossfade() {
        let mut a = animator();
        a.transition_to(Animation::new(6.0, 9.0), 1.0);
        a.transition_to(Animation::new(1.0, 2.0), 0.0);
        assert!(!a.is_transitioning());
        assert_eq!(a.current0(), FbxTime::from_seconds(1.0));
    }
}
