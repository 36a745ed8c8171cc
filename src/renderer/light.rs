use nalgebra_glm as glm;

pub const MAX_LIGHTS: usize = 8;

const SHADOW_NEAR: f32 = 0.5;
const SHADOW_FAR: f32 = 100.0;

pub const DEFAULT_ATTENUATION: [f32; 3] = [1.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Inactive,
    Directional,
    Spot,
    Point,
}

impl LightKind {
    pub const ALL: [LightKind; 4] = [
        LightKind::Inactive,
        LightKind::Directional,
        LightKind::Spot,
        LightKind::Point,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LightKind::Inactive => "Inactive",
            LightKind::Directional => "Directional",
            LightKind::Spot => "Spot",
            LightKind::Point => "Point",
        }
    }

    fn shader_id(self) -> f32 {
        match self {
            LightKind::Inactive => 0.0,
            LightKind::Directional => 1.0,
            LightKind::Spot => 2.0,
            LightKind::Point => 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub diffuse: [f32; 3],
    /// Constant, linear and quadratic falloff.
    pub attenuation: [f32; 3],
    /// Spot cone and perspective shadow field of view, degrees.
    pub fov: f32,
    /// Half extent of the orthographic shadow volume of directional lights.
    pub shadow_size: f32,
    pub casts_shadow: bool,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub view_proj: [[f32; 4]; 4],
    /// xyz position, w kind
    pub position: [f32; 4],
    /// xyz direction, w cosine of the half cone angle
    pub direction: [f32; 4],
    pub diffuse: [f32; 4],
    /// xyz attenuation, w shadow flag
    pub attenuation: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    pub lights: [LightUniform; MAX_LIGHTS],
    pub ambient: [f32; 4],
    /// count, shadow bias, show out-of-range, unused
    pub params: [f32; 4],
}

impl Light {
    fn new(name: &str, kind: LightKind, position: [f32; 3], direction: [f32; 3], diffuse: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            position,
            direction,
            diffuse,
            attenuation: DEFAULT_ATTENUATION,
            fov: 90.0,
            shadow_size: 50.0,
            casts_shadow: true,
        }
    }

    fn with_attenuation(mut self, attenuation: [f32; 3]) -> Self {
        self.attenuation = attenuation;
        self
    }

    fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    pub fn reset_attenuation(&mut self) {
        self.attenuation = DEFAULT_ATTENUATION;
    }

    pub fn is_active(&self) -> bool {
        self.kind != LightKind::Inactive
    }

    /// Whether a shadow map is rendered for this light.
    pub fn has_shadow(&self) -> bool {
        self.casts_shadow && matches!(self.kind, LightKind::Directional | LightKind::Spot)
    }

    pub fn view(&self) -> glm::Mat4 {
        let eye = glm::Vec3::from(self.position);
        let dir = glm::Vec3::from(self.direction);
        let dir = if glm::length(&dir) > f32::EPSILON {
            glm::normalize(&dir)
        } else {
            glm::vec3(0.0, -1.0, 0.0)
        };
        let up = if dir.y.abs() > 0.99 {
            glm::vec3(0.0, 0.0, 1.0)
        } else {
            glm::vec3(0.0, 1.0, 0.0)
        };
        glm::look_at_lh(&eye, &(eye + dir), &up)
    }

    pub fn projection(&self) -> glm::Mat4 {
        match self.kind {
            LightKind::Directional => {
                let s = self.shadow_size;
                glm::ortho_lh_zo(-s, s, -s, s, SHADOW_NEAR, SHADOW_FAR)
            }
            _ => glm::perspective_lh_zo(
                1.0,
                self.fov.clamp(1.0, 179.0).to_radians(),
                SHADOW_NEAR,
                SHADOW_FAR,
            ),
        }
    }

    pub fn view_proj(&self) -> glm::Mat4 {
        self.projection() * self.view()
    }

    pub fn uniform(&self) -> LightUniform {
        let dir = glm::Vec3::from(self.direction);
        let dir = if glm::length(&dir) > f32::EPSILON {
            glm::normalize(&dir)
        } else {
            glm::vec3(0.0, -1.0, 0.0)
        };
        LightUniform {
            view_proj: self.view_proj().into(),
            position: [self.position[0], self.position[1], self.position[2], self.kind.shader_id()],
            direction: [dir.x, dir.y, dir.z, (self.fov.to_radians() * 0.5).cos()],
            diffuse: [self.diffuse[0], self.diffuse[1], self.diffuse[2], 1.0],
            attenuation: [
                self.attenuation[0],
                self.attenuation[1],
                self.attenuation[2],
                if self.has_shadow() { 1.0 } else { 0.0 },
            ],
        }
    }
}

fn rgb(r: u8, g: u8, b: u8) -> [f32; 3] {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// The street scene rig: a blinking lamp, a yellow lamp, two fill lights and
/// the car's headlights.
pub fn default_lights() -> Vec<Light> {
    let headlight_dir = [1.2, 0.0, 14.0];
    vec![
        Light::new("Street lamp", LightKind::Spot, [-28.0, 19.0, 30.0], [0.0, -1.0, 1.0], WHITE)
            .with_fov(165.0),
        Light::new("Yellow lamp", LightKind::Spot, [-11.0, 19.0, -7.0], [0.0, -0.7, -1.0], YELLOW)
            .with_attenuation([0.6, 0.04, 0.0])
            .with_fov(165.0),
        Light::new(
            "Sky fill",
            LightKind::Directional,
            [-24.0, 15.0, -3.8],
            [-0.05, -0.3, 1.0],
            rgb(82, 170, 167),
        ),
        Light::new("Right headlight", LightKind::Spot, [-59.4, 3.38, 19.9], headlight_dir, YELLOW)
            .with_fov(165.0),
        Light::new("Left headlight", LightKind::Spot, [-51.5, 3.38, 19.1], headlight_dir, YELLOW)
            .with_fov(165.0),
        Light::new(
            "Purple fill",
            LightKind::Directional,
            [-41.0, 15.0, 38.0],
            [0.05, -0.2, -1.0],
            rgb(43, 0, 69),
        ),
    ]
}

pub fn default_ambient() -> [f32; 3] {
    rgb(42, 89, 109)
}

/// The editable light set plus the values the UI can reset to.
#[derive(Debug, Clone)]
pub struct LightRig {
    pub lights: Vec<Light>,
    pub ambient: [f32; 3],
    defaults: Vec<Light>,
}

impl LightRig {
    pub fn new(lights: Vec<Light>, ambient: [f32; 3]) -> Self {
        let mut lights = lights;
        if lights.len() > MAX_LIGHTS {
            log::warn!("{} lights configured, only {} are used", lights.len(), MAX_LIGHTS);
            lights.truncate(MAX_LIGHTS);
        }
        Self {
            defaults: lights.clone(),
            lights,
            ambient,
        }
    }

    pub fn reset(&mut self, index: usize) {
        if let (Some(light), Some(default)) = (self.lights.get_mut(index), self.defaults.get(index)) {
            *light = default.clone();
        }
    }

    /// Slot index and light for every light that renders a shadow map.
    pub fn iter_shadowed(&self) -> impl Iterator<Item = (usize, &Light)> {
        self.lights.iter().enumerate().filter(|(_, l)| l.has_shadow())
    }

    /// With lighting off the count is zero and only ambient is applied.
    pub fn uniform(&self, shadow_bias: f32, show_out_of_range: bool, apply_lighting: bool) -> LightsUniform {
        let mut lights = [LightUniform::default(); MAX_LIGHTS];
        for (slot, light) in lights.iter_mut().zip(&self.lights) {
            *slot = light.uniform();
        }
        let count = if apply_lighting { self.lights.len() } else { 0 };
        LightsUniform {
            lights,
            ambient: [self.ambient[0], self.ambient[1], self.ambient[2], 1.0],
            params: [
                count as f32,
                shadow_bias,
                if show_out_of_range { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self::new(default_lights(), default_ambient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rig_has_six_shadowed_lights() {
        let rig = LightRig::default();
        assert_eq!(rig.lights.len(), 6);
        assert!(rig.lights.iter().all(|l| l.has_shadow()));
    }

    #[test]
    fn light_view_looks_along_direction() {
        let light = &default_lights()[0];
        let view = light.view();
        let target = glm::Vec3::from(light.position) + glm::normalize(&glm::Vec3::from(light.direction));
        let p = view * glm::vec4(target.x, target.y, target.z, 1.0);
        // left handed view space looks down +z
        assert!(p.z > 0.99 && p.x.abs() < 1e-4 && p.y.abs() < 1e-4);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut rig = LightRig::default();
        rig.lights[1].diffuse = [0.0; 3];
        rig.reset(1);
        assert_eq!(rig.lights[1].diffuse, YELLOW);
    }

    #[test]
    fn lighting_off_leaves_only_ambient() {
        let rig = LightRig::default();
        assert_eq!(rig.uniform(0.002, false, true).params[0], 6.0);
        assert_eq!(rig.uniform(0.002, false, false).params[0], 0.0);
    }

    #[test]
    fn inactive_lights_cast_no_shadow() {
        let mut light = default_lights()[0].clone();
        light.kind = LightKind::Inactive;
        assert!(!light.has_shadow());
        assert_eq!(light.uniform().attenuation[3], 0.0);
    }
}
