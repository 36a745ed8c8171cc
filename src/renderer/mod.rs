pub mod camera;
pub mod gpu_mesh;
pub mod light;
pub mod particles;
pub mod pipelines;
pub mod post;
mod render;
pub mod renderer;
pub mod shadow;
pub mod textures;
pub mod vertex;

pub use light::{Light, LightKind, LightRig, MAX_LIGHTS};
pub use renderer::{Renderer, SceneSlot};
pub use shadow::{DEFAULT_SHADOW_RESOLUTION, SHADOW_RESOLUTIONS};
