use rand::Rng;

/// Seconds the timer has to exceed before the lamp toggles.
const TOGGLE_AT: f32 = 5.0;

/// Street lamp flicker: long random pauses while lit, sometimes a quick
/// blink, and a dark phase of at most a tenth of a second.
#[derive(Debug, Clone)]
pub struct LampBlink {
    timer: f32,
    on: bool,
}

impl LampBlink {
    pub fn new() -> Self {
        Self { timer: 0.0, on: true }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Advances by real frame time. Returns the new state when the lamp
    /// toggled this frame.
    pub fn update<R: Rng>(&mut self, dt: f32, rng: &mut R) -> Option<bool> {
        self.timer += dt;
        if self.timer <= TOGGLE_AT {
            return None;
        }
        self.on = !self.on;
        self.timer = if self.on {
            let wait = rng.gen_range(-6.0..0.0);
            // a third of the time the next blink comes quickly
            if wait > -2.0 { rng.gen_range(3.0..5.0) } else { wait }
        } else {
            rng.gen_range(4.9..5.0)
        };
        Some(self.on)
    }
}

impl Default for LampBlink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn stays_lit_until_timer_passes_five_seconds() {
        let mut lamp = LampBlink::new();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(lamp.update(4.0, &mut rng), None);
        assert_eq!(lamp.update(1.0, &mut rng), None);
        assert_eq!(lamp.update(0.5, &mut rng), Some(false));
        assert!(!lamp.is_on());
    }

    #[test]
    fn dark_phase_is_short() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let mut lamp = LampBlink::new();
            lamp.update(5.1, &mut rng);
            assert_eq!(lamp.update(0.11, &mut rng), Some(true));
        }
    }

    #[test]
    fn relit_lamp_waits_or_blinks_quickly() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let mut lamp = LampBlink { timer: 5.5, on: false };
            assert_eq!(lamp.update(0.0, &mut rng), Some(true));
            assert!(lamp.timer < 5.0);
            assert!(lamp.timer <= -2.0 || lamp.timer >= 3.0);
        }
    }
}
