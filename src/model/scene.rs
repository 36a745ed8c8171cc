// Scene import: walks the model tree from the root, building the skeleton from
// limb nodes and queueing meshes, then binds meshes (skinned when possible)
// and the first animation stack.

use super::dump::attribute_names;
use super::import_args::ImportArgs;
use super::material::Material;
use super::mesh::MeshData;
use super::skeleton::Skeleton;
use super::skin::SkinnedMeshData;
use crate::animation::{Animation, Animator};
use crate::error::DemoError;
use crate::fbx::{
    AttributeKind, Document, Object, ObjectId, SkeletonKind, TransformEvaluator,
};
use nalgebra_glm as glm;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub enum SceneMesh {
    Static(MeshData),
    Skinned(SkinnedMeshData),
}

impl SceneMesh {
    pub fn name(&self) -> &str {
        match self {
            SceneMesh::Static(m) => &m.name,
            SceneMesh::Skinned(m) => &m.name,
        }
    }

    pub fn material(&self) -> &Material {
        match self {
            SceneMesh::Static(m) => &m.material,
            SceneMesh::Skinned(m) => &m.material,
        }
    }

    pub fn material_mut(&mut self) -> &mut Material {
        match self {
            SceneMesh::Static(m) => &mut m.material,
            SceneMesh::Skinned(m) => &mut m.material,
        }
    }

    pub fn index_count(&self) -> usize {
        match self {
            SceneMesh::Static(m) => m.indices.len(),
            SceneMesh::Skinned(m) => m.indices.len(),
        }
    }
}

/// Mesh node found during the walk, imported once the skeleton is complete.
struct PendingMesh {
    model: ObjectId,
    geometry: ObjectId,
    material: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    pub folder_path: PathBuf,
    pub meshes: Vec<SceneMesh>,
    pub skeleton: Option<Skeleton>,
    pub animator: Option<Animator>,
    pub frame_rate: f64,
    pub args: ImportArgs,
    evaluator: Option<TransformEvaluator>,
}

/// Global scale outside this tolerance of 1 is reported.
const SCALE_TOLERANCE: f32 = 1e-4;

impl Scene {
    pub fn load(path: &Path, args: &ImportArgs) -> Result<Self, DemoError> {
        log::info!("Loading scene: {}", path.display());
        let bytes = std::fs::read(path)
            .map_err(|e| DemoError::new("scene-read").with_arg("path", path.display()).push_std(e))?;
        let doc = Document::from_bytes(&bytes)
            .map_err(|e| DemoError::new("scene-parse").with_arg("path", path.display()).push_std(e))?;

        let folder = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_document(&doc, &name, &folder, args))
    }

    pub fn from_document(doc: &Document, name: &str, folder: &Path, args: &ImportArgs) -> Self {
        let mut scene = Scene {
            name: name.to_string(),
            folder_path: folder.to_path_buf(),
            meshes: Vec::new(),
            skeleton: None,
            animator: None,
            frame_rate: doc.frame_rate(),
            args: *args,
            evaluator: None,
        };

        for (_, node, attribute) in attribute_names(doc) {
            log::debug!("node '{}': {}", node, attribute);
        }
        if (doc.unit_scale() - 1.0).abs() > 1e-6 {
            log::info!("file unit scale factor is {}", doc.unit_scale());
        }

        let bind = TransformEvaluator::new(doc);
        let mut pending = Vec::new();
        for model in doc.root_models() {
            scene.import_node(doc, &bind, model, None, &mut pending, 0);
        }
        scene.import_meshes(doc, pending);

        if scene.skeleton.is_some() && scene.import_animations(doc) {
            // pose once so palettes are valid before the first frame
            scene.update(0.0);
        }

        log::info!(
            "scene '{}': {} meshes, {} joints, animated: {}",
            scene.name,
            scene.meshes.len(),
            scene.skeleton.as_ref().map_or(0, Skeleton::count),
            scene.animator.is_some()
        );
        scene
    }

    fn import_node(
        &mut self,
        doc: &Document,
        bind: &TransformEvaluator,
        model: &Object,
        current_joint: Option<usize>,
        pending: &mut Vec<PendingMesh>,
        depth: usize,
    ) {
        if depth > 256 {
            log::error!("node tree deeper than 256 levels at '{}'", model.name);
            return;
        }

        let global = bind.global_trs(model.id, None);
        log::debug!(
            "node '{}' t={:?} r={:?}",
            model.name,
            global.translation.as_slice(),
            global.rotation.as_slice()
        );
        if (global.scaling - glm::vec3(1.0, 1.0, 1.0)).abs().max() > SCALE_TOLERANCE {
            log::warn!(
                "node '{}' has non-unit global scale {:?}",
                model.name,
                global.scaling.as_slice()
            );
        }
        if bind.node(model.id).is_some_and(|n| n.has_geometric_offset()) {
            log::warn!("node '{}' has a geometric transform, which is ignored", model.name);
        }

        let mut joint_for_children = current_joint;
        match doc.attribute(model) {
            AttributeKind::Skeleton(SkeletonKind::LimbNode) => {
                let skeleton = self.skeleton.get_or_insert_with(Skeleton::new);
                let bind_global = bind.global(model.id, None);
                let joint = skeleton.add_joint(&model.name, model.id, current_joint, &bind_global);
                log::debug!("joint {} '{}' parent {:?}", joint, model.name, current_joint);
                joint_for_children = Some(joint);
            }
            AttributeKind::Skeleton(kind) => {
                log::info!("skeleton node '{}' is {:?}, not a limb node; skipped", model.name, kind);
            }
            AttributeKind::Mesh => {
                if let Some(geometry) = doc.geometry(model.id) {
                    pending.push(PendingMesh {
                        model: model.id,
                        geometry: geometry.id,
                        material: doc.materials(model.id).next().map(|m| m.id),
                    });
                }
            }
            AttributeKind::Null | AttributeKind::None => {}
            other => {
                log::info!("node '{}': attribute {} not imported", model.name, other.type_name());
            }
        }

        for child in doc.child_models(model.id) {
            self.import_node(doc, bind, child, joint_for_children, pending, depth + 1);
        }
    }

    fn import_meshes(&mut self, doc: &Document, pending: Vec<PendingMesh>) {
        for mesh in pending {
            let (Some(model), Some(geometry)) = (doc.object(mesh.model), doc.object(mesh.geometry))
            else {
                continue;
            };
            let material = match mesh.material.and_then(|id| doc.object(id)) {
                Some(m) => Material::import(doc, m, &self.folder_path),
                None => {
                    log::warn!("mesh '{}' has no material, using defaults", model.name);
                    Material::default()
                }
            };

            let skinned = match self.skeleton.as_mut() {
                Some(skeleton) if doc.skins(geometry.id).next().is_some() => {
                    match SkinnedMeshData::import(
                        doc,
                        &model.name,
                        geometry,
                        material.clone(),
                        skeleton,
                        &self.args,
                    ) {
                        Ok(m) => Some(m),
                        Err(e) => {
                            log::error!("skinning '{}' failed: {}, importing as static", model.name, e);
                            None
                        }
                    }
                }
                _ => None,
            };

            self.meshes.push(match skinned {
                Some(m) => SceneMesh::Skinned(m),
                None => SceneMesh::Static(MeshData::import(&model.name, geometry, material, &self.args)),
            });
        }
    }

    fn import_animations(&mut self, doc: &Document) -> bool {
        let stacks = doc.animation_stacks();
        let Some(stack) = stacks.first() else {
            log::info!("scene '{}' has no animations", self.name);
            return false;
        };
        if stacks.len() > 1 {
            log::warn!(
                "{} animation stacks found, only '{}' is imported",
                stacks.len(),
                stack.name
            );
        }

        let layers = stack.id.map(|id| doc.animation_layers(id)).unwrap_or_default();
        let Some(layer) = layers.first() else {
            log::warn!("animation stack '{}' has no layers", stack.name);
            return false;
        };
        if layers.len() > 1 {
            log::warn!("{} animation layers found, only the first is used", layers.len());
        }

        let evaluator = TransformEvaluator::with_layer(doc, layer.id);
        let (mut start, mut stop) = (stack.local_start, stack.local_stop);
        if stop <= start {
            if let Some((first, last)) = evaluator.key_span() {
                (start, stop) = (first, last);
            }
        }
        log::info!("animation '{}': {} to {}", stack.name, start, stop);

        self.animator = Some(Animator::new(start, stop));
        self.evaluator = Some(evaluator);
        true
    }

    /// Advances the animator by `dt` seconds and poses the skeleton.
    pub fn update(&mut self, dt: f32) {
        let (Some(skeleton), Some(animator), Some(evaluator)) = (
            self.skeleton.as_mut(),
            self.animator.as_mut(),
            self.evaluator.as_ref(),
        ) else {
            return;
        };
        animator.update(dt);
        skeleton.update(
            evaluator,
            animator.current0(),
            animator.current1(),
            animator.weight0(),
        );
    }

    pub fn transition_to(&mut self, animation: Animation, transition_time: f32) {
        if let Some(animator) = self.animator.as_mut() {
            animator.transition_to(animation, transition_time);
        }
    }

    pub fn is_animated(&self) -> bool {
        self.animator.is_some()
    }

    pub fn evaluator(&self) -> Option<&TransformEvaluator> {
        self.evaluator.as_ref()
    }

    /// Every texture file referenced by the scene's materials.
    pub fn texture_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for mesh in &self.meshes {
            let m = mesh.material();
            for p in [&m.diffuse_texture, &m.normal_map].into_iter().flatten() {
                if !paths.contains(p) {
                    paths.push(p.clone());
                }
            }
        }
        paths
    }
}
