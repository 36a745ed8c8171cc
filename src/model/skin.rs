// Skin import: clusters matched to skeleton joints by name, influences packed
// into two groups of four per vertex.

use super::import_args::ImportArgs;
use super::material::Material;
use super::mesh::Corners;
use super::skeleton::Skeleton;
use crate::error::DemoError;
use crate::fbx::{Document, Object};
use nalgebra_glm as glm;

/// Size of the bone palette a skinned mesh can address.
pub const MAX_BONES: usize = 64;
pub const MAX_INFLUENCES: usize = 8;
/// Bone id of an unused influence slot.
pub const UNASSIGNED_BONE: u32 = MAX_BONES as u32;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkinVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bone_ids: [u32; 4],
    pub bone_ids2: [u32; 4],
    pub bone_weights: [f32; 4],
    pub bone_weights2: [f32; 4],
}

/// Influences gathered for one control point, filled in cluster order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeightInfo {
    pub ids: [u32; MAX_INFLUENCES],
    pub weights: [f32; MAX_INFLUENCES],
    pub count: usize,
}

impl Default for VertexWeightInfo {
    fn default() -> Self {
        Self {
            ids: [UNASSIGNED_BONE; MAX_INFLUENCES],
            weights: [0.0; MAX_INFLUENCES],
            count: 0,
        }
    }
}

impl VertexWeightInfo {
    /// Stores an influence in the next free slot; false when all slots are taken.
    pub fn add(&mut self, bone: u32, weight: f32) -> bool {
        if self.count >= MAX_INFLUENCES {
            return false;
        }
        self.ids[self.count] = bone;
        self.weights[self.count] = weight;
        self.count += 1;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn write(&self, v: &mut SkinVertex) {
        v.bone_ids.copy_from_slice(&self.ids[..4]);
        v.bone_ids2.copy_from_slice(&self.ids[4..]);
        v.bone_weights.copy_from_slice(&self.weights[..4]);
        v.bone_weights2.copy_from_slice(&self.weights[4..]);
    }
}

/// A skinned mesh and the joints behind its bone palette.
#[derive(Debug, Clone)]
pub struct SkinnedMeshData {
    pub name: String,
    pub vertices: Vec<SkinVertex>,
    pub indices: Vec<u32>,
    pub material: Material,
    /// Joint driving each palette entry, in cluster order.
    pub cluster_joints: Vec<Option<usize>>,
    /// Vertices were mirrored along z at import.
    pub mirror_z: bool,
}

impl SkinnedMeshData {
    /// Skinning matrices in palette order, expressed in the mesh's own space.
    pub fn bone_palette(&self, skeleton: &Skeleton) -> Vec<glm::Mat4> {
        let world = skeleton.world_bone_transforms();
        let mirror = glm::scaling(&glm::vec3(1.0, 1.0, -1.0));
        self.cluster_joints
            .iter()
            .map(|joint| {
                let m = joint
                    .and_then(|j| world.get(j).copied())
                    .unwrap_or_else(glm::identity);
                if self.mirror_z { mirror * m * mirror } else { m }
            })
            .collect()
    }

    /// Binds `geometry`'s skin to `skeleton`. Fails when the geometry has no
    /// skin or uses an unsupported skinning type.
    pub fn import(
        doc: &Document,
        name: &str,
        geometry: &Object,
        material: Material,
        skeleton: &mut Skeleton,
        args: &ImportArgs,
    ) -> Result<Self, DemoError> {
        let skin = doc
            .skins(geometry.id)
            .next()
            .ok_or_else(|| DemoError::new("skin-missing").with_arg("mesh", name))?;

        let skinning_type = skin.node.child_str("SkinningType").unwrap_or("Linear");
        if skinning_type != "Linear" {
            return Err(DemoError::new("skinning-type-unsupported")
                .with_arg("mesh", name)
                .with_arg("type", skinning_type));
        }

        let corners = Corners::extract(geometry, args);
        let mut weights = vec![VertexWeightInfo::default(); corners.control_point_count];
        let mut cluster_joints = Vec::new();

        let clusters: Vec<&Object> = doc.clusters(skin.id).collect();
        log::info!("mesh '{}': {} skin clusters", name, clusters.len());
        if clusters.len() > MAX_BONES {
            log::error!(
                "mesh '{}' has {} clusters, only the first {} are used",
                name,
                clusters.len(),
                MAX_BONES
            );
        }

        for (c, cluster) in clusters.iter().take(MAX_BONES).enumerate() {
            let link_name = doc
                .cluster_link(cluster.id)
                .map(|l| l.name.as_str())
                .unwrap_or(cluster.name.as_str());
            let Some(joint) = skeleton.assign_cluster_id(c, link_name) else {
                log::error!("cluster {} '{}' matches no joint", c, link_name);
                cluster_joints.push(None);
                continue;
            };
            cluster_joints.push(Some(joint));

            let indexes = cluster
                .node
                .child_value("Indexes")
                .and_then(|p| p.to_i32_vec())
                .unwrap_or_default();
            let cluster_weights = cluster
                .node
                .child_value("Weights")
                .and_then(|p| p.to_f64_vec())
                .unwrap_or_default();

            for (&cp, &w) in indexes.iter().zip(&cluster_weights) {
                let Some(slot) = usize::try_from(cp).ok().filter(|&i| i < weights.len()) else {
                    log::warn!("cluster '{}' references missing control point {}", link_name, cp);
                    continue;
                };
                if !weights[slot].add(c as u32, w as f32) {
                    log::warn!("control point {} already has {} bones", cp, MAX_INFLUENCES);
                }
            }
        }

        skeleton.check_cluster_indices();

        let unweighted = weights.iter().filter(|w| w.is_empty()).count();
        if unweighted > 0 {
            log::warn!("mesh '{}': {} control points have no bone influence", name, unweighted);
        }

        let vertices = corners
            .vertices
            .iter()
            .zip(&corners.control_points)
            .map(|(v, &cp)| {
                let mut out = SkinVertex {
                    position: v.position,
                    uv: v.uv,
                    normal: v.normal,
                    tangent: v.tangent,
                    bone_ids: [UNASSIGNED_BONE; 4],
                    bone_ids2: [UNASSIGNED_BONE; 4],
                    bone_weights: [0.0; 4],
                    bone_weights2: [0.0; 4],
                };
                weights[cp].write(&mut out);
                out
            })
            .collect::<Vec<_>>();

        Ok(Self {
            name: name.to_string(),
            vertices,
            indices: corners.indices,
            material,
            cluster_joints,
            mirror_z: args.invert_z_scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_slots_in_order_and_caps_at_eight() {
        let mut info = VertexWeightInfo::default();
        for bone in 0..MAX_INFLUENCES as u32 {
            assert!(info.add(bone, 0.125));
        }
        assert!(!info.add(9, 0.5));
        assert_eq!(info.count, MAX_INFLUENCES);
        assert_eq!(info.ids[7], 7);
    }

    #[test]
    fn eighth_influence_lands_in_last_lane() {
        let mut info = VertexWeightInfo::default();
        for bone in 0..MAX_INFLUENCES as u32 {
            info.add(bone, bone as f32);
        }
        let mut v = SkinVertex {
            position: [0.0; 3],
            uv: [0.0; 2],
            normal: [0.0; 3],
            tangent: [0.0; 3],
            bone_ids: [0; 4],
            bone_ids2: [0; 4],
            bone_weights: [0.0; 4],
            bone_weights2: [0.0; 4],
        };
        info.write(&mut v);
        assert_eq!(v.bone_ids2, [4, 5, 6, 7]);
        assert_eq!(v.bone_weights2[3], 7.0);
        assert_eq!(v.bone_weights2[2], 6.0);
    }

    #[test]
    fn unused_slots_are_unassigned() {
        let mut info = VertexWeightInfo::default();
        info.add(3, 1.0);
        assert_eq!(info.ids[1], UNASSIGNED_BONE);
        assert_eq!(info.weights[1], 0.0);
    }
}
