// Imported scene data: meshes, materials, skin and skeleton

pub mod dump;
pub mod import_args;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod skeleton;
pub mod skin;

pub use import_args::ImportArgs;
pub use material::Material;
pub use mesh::{MeshData, TangentVertex};
pub use scene::{Scene, SceneMesh};
pub use skeleton::{Joint, Skeleton};
pub use skin::{MAX_BONES, MAX_INFLUENCES, SkinVertex, SkinnedMeshData, UNASSIGNED_BONE, VertexWeightInfo};
