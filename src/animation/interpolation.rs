// Scalar, vector and angle interpolation used by skeleton pose blending

use nalgebra_glm as glm;

/// Blend where `t = 1` yields `one` and `t = 0` yields `two`.
pub fn lerp(one: f32, two: f32, t: f32) -> f32 {
    one * t + two * (1.0 - t)
}

pub fn lerp_vec3(one: &glm::Vec3, two: &glm::Vec3, t: f32) -> glm::Vec3 {
    one * t + two * (1.0 - t)
}

/// Wraps `t` into `[0, length)`.
pub fn repeat(t: f32, length: f32) -> f32 {
    t - (t / length).floor() * length
}

/// Angle blend in degrees along the shortest arc from `one`.
///
/// `t = 0` yields `one`, `t = 1` yields `two` (modulo 360).
pub fn lerp_angle_degrees(one: f32, two: f32, t: f32) -> f32 {
    let mut delta = repeat(two - one, 360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    one + delta * t
}

/// Per-component shortest-arc blend of Euler angles in degrees, with the
/// same weight convention as [`lerp`].
pub fn lerp_euler_degrees(one: &glm::Vec3, two: &glm::Vec3, weight: f32) -> glm::Vec3 {
    glm::vec3(
        lerp_angle_degrees(two.x, one.x, weight),
        lerp_angle_degrees(two.y, one.y, weight),
        lerp_angle_degrees(two.z, one.z, weight),
    )
}

pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

pub fn rad_to_deg(radians: f32) -> f32 {
    radians * 180.0 / std::f32::consts::PI
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn lerp_weight_one_selects_first() {
        assert_eq!(lerp(2.0, 10.0, 1.0), 2.0);
        assert_eq!(lerp(2.0, 10.0, 0.0), 10.0);
        assert!(approx(lerp(2.0, 10.0, 0.25), 8.0));
    }

    #[test]
    fn repeat_wraps_negative_values() {
        assert!(approx(repeat(-30.0, 360.0), 330.0));
        assert!(approx(repeat(725.0, 360.0), 5.0));
    }

    #[test]
    fn angle_lerp_takes_short_way_round() {
        // 350 -> 10 passes through 0, not 180
        assert!(approx(lerp_angle_degrees(350.0, 10.0, 0.5), 360.0));
        assert!(approx(lerp_angle_degrees(10.0, 350.0, 0.5), 0.0));
        assert!(approx(lerp_angle_degrees(0.0, 90.0, 0.5), 45.0));
    }

    #[test]
    fn euler_lerp_matches_lerp_convention() {
        let a = glm::vec3(0.0, 170.0, 0.0);
        let b = glm::vec3(90.0, -170.0, 0.0);
        let full_a = lerp_euler_degrees(&a, &b, 1.0);
        assert!(approx(full_a.x, 0.0));
        let mid = lerp_euler_degrees(&a, &b, 0.5);
        assert!(approx(mid.x, 45.0));
        // 170 and -170 are 20 degrees apart through 180
        assert!(approx(repeat(mid.y, 360.0), 180.0));
    }

    #[test]
    fn degree_conversions_invert() {
        assert!(approx(rad_to_deg(deg_to_rad(123.0)), 123.0));
        assert!(approx(deg_to_rad(180.0), std::f32::consts::PI));
    }
}
