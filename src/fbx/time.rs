use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// FBX ticks per second.
pub const TICKS_PER_SECOND: i64 = 46_186_158_000;

/// A point on the file's animation timeline, in FBX ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FbxTime(pub i64);

impl FbxTime {
    pub const ZERO: FbxTime = FbxTime(0);

    pub fn from_seconds(seconds: f64) -> Self {
        FbxTime((seconds * TICKS_PER_SECOND as f64).round() as i64)
    }

    pub fn from_frame(frame: f64, frame_rate: f64) -> Self {
        Self::from_seconds(frame / frame_rate)
    }

    pub fn seconds(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }

    pub fn ticks(self) -> i64 {
        self.0
    }
}

impl Add for FbxTime {
    type Output = FbxTime;

    fn add(self, rhs: FbxTime) -> FbxTime {
        FbxTime(self.0 + rhs.0)
    }
}

impl AddAssign for FbxTime {
    fn add_assign(&mut self, rhs: FbxTime) {
        self.0 += rhs.0;
    }
}

impl Sub for FbxTime {
    type Output = FbxTime;

    fn sub(self, rhs: FbxTime) -> FbxTime {
        FbxTime(self.0 - rhs.0)
    }
}

impl fmt::Display for FbxTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_round_trip() {
        let t = FbxTime::from_seconds(1.5);
        assert_eq!(t.ticks(), TICKS_PER_SECOND + TICKS_PER_SECOND / 2);
        assert!((t.seconds() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn frames_use_frame_rate() {
        assert_eq!(FbxTime::from_frame(48.0, 24.0), FbxTime::from_seconds(2.0));
    }
}
