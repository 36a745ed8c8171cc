use nalgebra_glm as glm;

pub const NEAR_PLANE: f32 = 0.1;

/// First-person camera in a left-handed, y-up world. Yaw and pitch are in
/// degrees; yaw 0 looks down +z and yaw 90 down +x.
#[derive(Debug, Clone)]
pub struct CameraState {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view, degrees.
    pub fov: f32,
    pub far_plane: f32,
    pub default_position: [f32; 3],
    pub default_yaw: f32,
    pub default_pitch: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub position: [f32; 4],
    /// near, far, time, normal mapping
    pub params: [f32; 4],
}

impl CameraState {
    pub fn new(position: [f32; 3], yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
            fov: 60.0,
            far_plane: 100.0,
            default_position: position,
            default_yaw: yaw,
            default_pitch: pitch,
        }
    }

    pub fn reset(&mut self) {
        self.position = self.default_position;
        self.yaw = self.default_yaw;
        self.pitch = self.default_pitch;
    }

    pub fn forward(&self) -> glm::Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        glm::vec3(yaw.sin() * pitch.cos(), pitch.sin(), yaw.cos() * pitch.cos())
    }

    pub fn right(&self) -> glm::Vec3 {
        let yaw = self.yaw.to_radians();
        glm::vec3(yaw.cos(), 0.0, -yaw.sin())
    }

    pub fn view(&self) -> glm::Mat4 {
        let eye = glm::Vec3::from(self.position);
        glm::look_at_lh(&eye, &(eye + self.forward()), &glm::vec3(0.0, 1.0, 0.0))
    }

    pub fn projection(&self, aspect: f32) -> glm::Mat4 {
        let far = self.far_plane.max(NEAR_PLANE + 0.01);
        glm::perspective_lh_zo(aspect, self.fov.clamp(1.0, 179.0).to_radians(), NEAR_PLANE, far)
    }

    pub fn uniform(&self, aspect: f32, time: f32, normal_mapping: bool) -> CameraUniform {
        let view = self.view();
        let proj = self.projection(aspect);
        CameraUniform {
            view_proj: (proj * view).into(),
            view: view.into(),
            position: [self.position[0], self.position[1], self.position[2], 1.0],
            params: [
                NEAR_PLANE,
                self.far_plane,
                time,
                if normal_mapping { 1.0 } else { 0.0 },
            ],
        }
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new([-20.0, 4.0, 0.0], 90.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn default_camera_looks_down_positive_x() {
        let camera = CameraState::default();
        let f = camera.forward();
        assert!((f.x - 1.0).abs() < EPSILON && f.y.abs() < EPSILON && f.z.abs() < EPSILON);
        let r = camera.right();
        assert!((r.z + 1.0).abs() < EPSILON);
    }

    #[test]
    fn point_ahead_projects_to_screen_centre() {
        let camera = CameraState::default();
        let u = camera.uniform(1.0, 0.0, true);
        let m = glm::Mat4::from(u.view_proj);
        let clip = m * glm::vec4(0.0, 4.0, 0.0, 1.0);
        let ndc = clip.xyz() / clip.w;
        assert!(ndc.x.abs() < EPSILON && ndc.y.abs() < EPSILON);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
