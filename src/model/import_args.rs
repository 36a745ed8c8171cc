use serde::{Deserialize, Serialize};

/// Conversions applied while importing geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportArgs {
    /// `v = 1 - v` on every texture coordinate.
    pub flip_uvs: bool,
    /// Mirror positions, normals and tangents along z.
    pub invert_z_scale: bool,
    /// Swap the second and third index of every triangle.
    pub invert_winding_order: bool,
}

impl Default for ImportArgs {
    fn default() -> Self {
        Self {
            flip_uvs: true,
            invert_z_scale: true,
            invert_winding_order: false,
        }
    }
}
