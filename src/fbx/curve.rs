use super::node::Node;
use super::time::FbxTime;

/// Keyframed scalar channel (`AnimationCurve`), sampled with linear interpolation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimCurve {
    pub times: Vec<FbxTime>,
    pub values: Vec<f32>,
    pub default: f32,
}

impl AnimCurve {
    pub fn new(times: Vec<FbxTime>, values: Vec<f32>) -> Self {
        Self {
            times,
            values,
            default: 0.0,
        }
    }

    pub fn from_node(node: &Node) -> Self {
        let times = node
            .child_value("KeyTime")
            .and_then(|p| p.to_i64_vec())
            .unwrap_or_default()
            .into_iter()
            .map(FbxTime)
            .collect::<Vec<_>>();
        let mut values = node
            .child_value("KeyValueFloat")
            .and_then(|p| p.to_f32_vec())
            .unwrap_or_default();
        let default = node
            .child_value("Default")
            .and_then(|p| p.as_f64())
            .unwrap_or(0.0) as f32;

        if values.len() != times.len() {
            log::warn!(
                "animation curve has {} key times but {} values",
                times.len(),
                values.len()
            );
            values.resize(times.len(), default);
        }

        Self {
            times,
            values,
            default,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn first_time(&self) -> Option<FbxTime> {
        self.times.first().copied()
    }

    pub fn last_time(&self) -> Option<FbxTime> {
        self.times.last().copied()
    }

    /// Value at `time`, held constant before the first and after the last key.
    pub fn evaluate(&self, time: FbxTime) -> f32 {
        let (Some(&first), Some(&last)) = (self.times.first(), self.times.last()) else {
            return self.default;
        };
        if time <= first {
            return self.values[0];
        }
        if time >= last {
            return self.values[self.values.len() - 1];
        }

        let next = self.times.partition_point(|&t| t <= time);
        let prev = next - 1;
        let t0 = self.times[prev].0 as f64;
        let t1 = self.times[next].0 as f64;
        let f = ((time.0 as f64 - t0) / (t1 - t0)) as f32;
        self.values[prev] + (self.values[next] - self.values[prev]) * f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> AnimCurve {
        AnimCurve::new(
            vec![FbxTime::from_seconds(0.0), FbxTime::from_seconds(1.0), FbxTime::from_seconds(3.0)],
            vec![0.0, 10.0, 30.0],
        )
    }

    #[test]
    fn hits_keys_exactly() {
        let c = curve();
        assert_eq!(c.evaluate(FbxTime::from_seconds(1.0)), 10.0);
        assert_eq!(c.evaluate(FbxTime::from_seconds(3.0)), 30.0);
    }

    #[test]
    fn interpolates_between_keys() {
        let c = curve();
        assert!((c.evaluate(FbxTime::from_seconds(0.5)) - 5.0).abs() < 1e-4);
        assert!((c.evaluate(FbxTime::from_seconds(2.0)) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn clamps_outside_range() {
        let c = curve();
        assert_eq!(c.evaluate(FbxTime::from_seconds(-1.0)), 0.0);
        assert_eq!(c.evaluate(FbxTime::from_seconds(10.0)), 30.0);
    }

    #[test]
    fn empty_curve_returns_default() {
        let c = AnimCurve {
            default: 4.0,
            ..Default::default()
        };
        assert_eq!(c.evaluate(FbxTime::ZERO), 4.0);
    }
}
