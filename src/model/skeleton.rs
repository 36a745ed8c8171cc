// Joint hierarchy of an imported character.
// Joints live in an arena; a joint's index is also its slot in
// `world_bone_transforms`.

use crate::animation::{lerp_euler_degrees, lerp_vec3};
use crate::fbx::transform::decompose;
use crate::fbx::{FbxTime, ObjectId, RotationOrder, TransformEvaluator};
use nalgebra_glm as glm;

#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub node: ObjectId,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Bind pose global translation.
    pub position: glm::Vec3,
    /// Bind pose global rotation, XYZ Euler degrees.
    pub rotation: glm::Vec3,
    pub inverse_bind_pose: glm::Mat4,
    /// Index of the skin cluster bound to this joint, if any.
    pub cluster_index: Option<usize>,
    /// Posed global translation from the last update.
    pub posed_position: glm::Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    joints: Vec<Joint>,
    roots: Vec<usize>,
    world_bone_transforms: Vec<glm::Mat4>,
}

/// Rigid transform without scale, the form bind poses and poses are kept in.
fn rigid(position: &glm::Vec3, rotation_degrees: &glm::Vec3) -> glm::Mat4 {
    glm::translation(position) * RotationOrder::Xyz.matrix_degrees(rotation_degrees)
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a joint whose bind pose is the global matrix `bind_global`.
    pub fn add_joint(
        &mut self,
        name: &str,
        node: ObjectId,
        parent: Option<usize>,
        bind_global: &glm::Mat4,
    ) -> usize {
        let index = self.joints.len();
        let trs = decompose(bind_global);
        let bind = rigid(&trs.translation, &trs.rotation);
        self.joints.push(Joint {
            name: name.to_string(),
            node,
            parent,
            children: Vec::new(),
            position: trs.translation,
            rotation: trs.rotation,
            inverse_bind_pose: glm::inverse(&bind),
            cluster_index: None,
            posed_position: trs.translation,
        });
        match parent {
            Some(p) => self.joints[p].children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    /// Tags the joint called `name` (case-insensitive) with cluster `id`.
    /// Returns the joint index, or `None` when no joint has that name.
    pub fn assign_cluster_id(&mut self, id: usize, name: &str) -> Option<usize> {
        let found = self
            .roots
            .iter()
            .find_map(|&root| self.find_from(root, name))?;
        self.joints[found].cluster_index = Some(id);
        Some(found)
    }

    fn find_from(&self, joint: usize, name: &str) -> Option<usize> {
        let j = &self.joints[joint];
        if j.name.eq_ignore_ascii_case(name) {
            return Some(joint);
        }
        j.children.iter().find_map(|&c| self.find_from(c, name))
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.roots.iter().find_map(|&root| self.find_from(root, name))
    }

    /// True when every joint has been bound to a skin cluster.
    pub fn check_cluster_indices(&self) -> bool {
        let mut ok = true;
        for joint in &self.joints {
            if joint.cluster_index.is_none() {
                log::warn!("joint '{}' has no skin cluster", joint.name);
                ok = false;
            }
        }
        ok
    }

    /// Number of joints reachable from the roots.
    pub fn count(&self) -> usize {
        fn count_from(skeleton: &Skeleton, joint: usize) -> usize {
            1 + skeleton.joints[joint]
                .children
                .iter()
                .map(|&c| count_from(skeleton, c))
                .sum::<usize>()
        }
        self.roots.iter().map(|&r| count_from(self, r)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, index: usize) -> &Joint {
        &self.joints[index]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn world_bone_transforms(&self) -> &[glm::Mat4] {
        &self.world_bone_transforms
    }

    /// Poses every joint by blending its global transform at `time0` and
    /// `time1`; `weight0` is the share of `time0`.
    pub fn update(
        &mut self,
        evaluator: &TransformEvaluator,
        time0: FbxTime,
        time1: FbxTime,
        weight0: f32,
    ) {
        if self.world_bone_transforms.len() != self.joints.len() {
            self.world_bone_transforms = vec![glm::identity(); self.joints.len()];
        }

        for (index, joint) in self.joints.iter_mut().enumerate() {
            let pose0 = evaluator.global_trs(joint.node, Some(time0));
            let (position, rotation) = if weight0 < 1.0 {
                let pose1 = evaluator.global_trs(joint.node, Some(time1));
                (
                    lerp_vec3(&pose0.translation, &pose1.translation, weight0),
                    lerp_euler_degrees(&pose0.rotation, &pose1.rotation, weight0),
                )
            } else {
                (pose0.translation, pose0.rotation)
            };

            joint.posed_position = position;
            self.world_bone_transforms[index] = rigid(&position, &rotation) * joint.inverse_bind_pose;
        }
    }

    /// Parent to child segments of the current pose.
    pub fn bone_lines(&self) -> Vec<(glm::Vec3, glm::Vec3)> {
        self.joints
            .iter()
            .filter_map(|j| {
                let parent = self.joints.get(j.parent?)?;
                Some((parent.posed_position, j.posed_position))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Skeleton {
        let mut s = Skeleton::new();
        let hips = s.add_joint("Hips", 1, None, &glm::identity());
        let spine = s.add_joint(
            "Spine",
            2,
            Some(hips),
            &glm::translation(&glm::vec3(0.0, 1.0, 0.0)),
        );
        s.add_joint(
            "Head",
            3,
            Some(spine),
            &glm::translation(&glm::vec3(0.0, 2.0, 0.0)),
        );
        s.add_joint("Prop", 4, None, &glm::identity());
        s
    }

    #[test]
    fn counts_every_root() {
        assert_eq!(chain().count(), 4);
        assert_eq!(chain().roots().len(), 2);
    }

    #[test]
    fn cluster_names_match_case_insensitively() {
        let mut s = chain();
        assert_eq!(s.assign_cluster_id(0, "head"), Some(2));
        assert_eq!(s.joint(2).cluster_index, Some(0));
        assert_eq!(s.assign_cluster_id(1, "PROP"), Some(3));
        assert_eq!(s.assign_cluster_id(2, "Tail"), None);
    }

    #[test]
    fn check_fails_until_all_joints_bound() {
        let mut s = chain();
        for (i, name) in ["Hips", "Spine", "Head"].iter().enumerate() {
            s.assign_cluster_id(i, name);
        }
        assert!(!s.check_cluster_indices());
        s.assign_cluster_id(3, "Prop");
        assert!(s.check_cluster_indices());
    }

    #[test]
    fn inverse_bind_pose_undoes_bind() {
        let s = chain();
        let head = s.joint(2);
        let at_bind = glm::translation(&head.position) * head.inverse_bind_pose;
        assert!((at_bind[(1, 3)]).abs() < 1e-5);
    }

    #[test]
    fn bone_lines_link_parents() {
        let s = chain();
        let lines = s.bone_lines();
        assert_eq!(lines.len(), 2);
        assert!((lines[1].1.y - 2.0).abs() < 1e-5);
    }
}
