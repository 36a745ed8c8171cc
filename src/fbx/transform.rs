// Node transform evaluation: local TRS with pre/post rotation, animated through
// curve nodes of one animation layer, composed up the parent chain.

use super::curve::AnimCurve;
use super::document::{Document, Object, ObjectId};
use super::time::FbxTime;
use nalgebra_glm as glm;
use std::collections::HashMap;

/// Euler rotation order, named by the order the axes are applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationOrder {
    #[default]
    Xyz,
    Xzy,
    Yzx,
    Yxz,
    Zxy,
    Zyx,
    SphericXyz,
}

impl RotationOrder {
    pub fn from_fbx(value: i64) -> Self {
        match value {
            1 => RotationOrder::Xzy,
            2 => RotationOrder::Yzx,
            3 => RotationOrder::Yxz,
            4 => RotationOrder::Zxy,
            5 => RotationOrder::Zyx,
            6 => RotationOrder::SphericXyz,
            _ => RotationOrder::Xyz,
        }
    }

    /// Rotation matrix for Euler angles in radians.
    pub fn matrix(self, radians: &glm::Vec3) -> glm::Mat4 {
        let x = glm::rotation(radians.x, &glm::vec3(1.0, 0.0, 0.0));
        let y = glm::rotation(radians.y, &glm::vec3(0.0, 1.0, 0.0));
        let z = glm::rotation(radians.z, &glm::vec3(0.0, 0.0, 1.0));
        // column vectors: the first applied axis is the rightmost factor
        match self {
            RotationOrder::Xyz => z * y * x,
            RotationOrder::Xzy => y * z * x,
            RotationOrder::Yzx => x * z * y,
            RotationOrder::Yxz => z * x * y,
            RotationOrder::Zxy => y * x * z,
            RotationOrder::Zyx => x * y * z,
            RotationOrder::SphericXyz => {
                log::warn!("spheric XYZ rotation order is not supported, using identity");
                glm::identity()
            }
        }
    }

    /// Same as [`RotationOrder::matrix`] with angles in degrees.
    pub fn matrix_degrees(self, degrees: &glm::Vec3) -> glm::Mat4 {
        self.matrix(&glm::radians(degrees))
    }
}

/// Static and animated transform data of one model node.
#[derive(Debug, Clone)]
pub struct NodeTransform {
    pub name: String,
    pub parent: Option<ObjectId>,
    pub translation: glm::Vec3,
    pub rotation: glm::Vec3,
    pub scaling: glm::Vec3,
    pub pre_rotation: glm::Vec3,
    pub post_rotation: glm::Vec3,
    pub rotation_order: RotationOrder,
    pub geometric_translation: glm::Vec3,
    pub geometric_rotation: glm::Vec3,
    pub geometric_scaling: glm::Vec3,
    translation_curves: [Option<AnimCurve>; 3],
    rotation_curves: [Option<AnimCurve>; 3],
    scaling_curves: [Option<AnimCurve>; 3],
}

fn vec3_of(object: &Object, name: &str, default: glm::Vec3) -> glm::Vec3 {
    object
        .properties
        .vec3(name)
        .map(|v| glm::vec3(v[0] as f32, v[1] as f32, v[2] as f32))
        .unwrap_or(default)
}

impl NodeTransform {
    pub fn from_model(doc: &Document, model: &Object) -> Self {
        let zero = glm::Vec3::zeros();
        let one = glm::vec3(1.0, 1.0, 1.0);
        Self {
            name: model.name.clone(),
            parent: doc.parent_model(model.id),
            translation: vec3_of(model, "Lcl Translation", zero),
            rotation: vec3_of(model, "Lcl Rotation", zero),
            scaling: vec3_of(model, "Lcl Scaling", one),
            pre_rotation: vec3_of(model, "PreRotation", zero),
            post_rotation: vec3_of(model, "PostRotation", zero),
            rotation_order: RotationOrder::from_fbx(
                model.properties.i64("RotationOrder").unwrap_or(0),
            ),
            geometric_translation: vec3_of(model, "GeometricTranslation", zero),
            geometric_rotation: vec3_of(model, "GeometricRotation", zero),
            geometric_scaling: vec3_of(model, "GeometricScaling", one),
            translation_curves: Default::default(),
            rotation_curves: Default::default(),
            scaling_curves: Default::default(),
        }
    }

    fn sample(curves: &[Option<AnimCurve>; 3], base: glm::Vec3, time: Option<FbxTime>) -> glm::Vec3 {
        let Some(time) = time else {
            return base;
        };
        let mut out = base;
        for (axis, curve) in curves.iter().enumerate() {
            if let Some(curve) = curve {
                if !curve.is_empty() {
                    out[axis] = curve.evaluate(time);
                }
            }
        }
        out
    }

    /// Local matrix at `time`; `None` evaluates the static (bind) values.
    pub fn local_matrix(&self, time: Option<FbxTime>) -> glm::Mat4 {
        let t = Self::sample(&self.translation_curves, self.translation, time);
        let r = Self::sample(&self.rotation_curves, self.rotation, time);
        let s = Self::sample(&self.scaling_curves, self.scaling, time);

        let pre = RotationOrder::Xyz.matrix_degrees(&self.pre_rotation);
        let post = RotationOrder::Xyz.matrix_degrees(&self.post_rotation);
        let post_inv = glm::transpose(&post);
        let rot = self.rotation_order.matrix_degrees(&r);

        glm::translation(&t) * pre * rot * post_inv * glm::scaling(&s)
    }

    pub fn has_geometric_offset(&self) -> bool {
        self.geometric_translation != glm::Vec3::zeros()
            || self.geometric_rotation != glm::Vec3::zeros()
            || self.geometric_scaling != glm::vec3(1.0, 1.0, 1.0)
    }
}

/// Decomposed global transform: translation, XYZ Euler degrees and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: glm::Vec3,
    pub rotation: glm::Vec3,
    pub scaling: glm::Vec3,
}

/// Split an affine matrix into translation, XYZ Euler angles in degrees and scale.
pub fn decompose(m: &glm::Mat4) -> Trs {
    let translation = glm::vec3(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    let col = |c: usize| glm::vec3(m[(0, c)], m[(1, c)], m[(2, c)]);
    let scaling = glm::vec3(glm::length(&col(0)), glm::length(&col(1)), glm::length(&col(2)));

    let safe = |s: f32| if s.abs() > f32::EPSILON { s } else { 1.0 };
    let r = |row: usize, c: usize| m[(row, c)] / safe(scaling[c]);

    let sy = -r(2, 0);
    let (x, y, z) = if sy.abs() < 0.999_999 {
        (r(2, 1).atan2(r(2, 2)), sy.asin(), r(1, 0).atan2(r(0, 0)))
    } else {
        // gimbal lock: fold the z rotation into x
        (
            (-r(1, 2)).atan2(r(1, 1)),
            std::f32::consts::FRAC_PI_2.copysign(sy),
            0.0,
        )
    };

    Trs {
        translation,
        rotation: glm::degrees(&glm::vec3(x, y, z)),
        scaling,
    }
}

/// Evaluates model transforms of a document, optionally animated by one layer.
#[derive(Debug, Clone, Default)]
pub struct TransformEvaluator {
    nodes: HashMap<ObjectId, NodeTransform>,
}

impl TransformEvaluator {
    /// Static transforms only.
    pub fn new(doc: &Document) -> Self {
        let nodes = doc
            .objects_of_kind("Model")
            .map(|m| (m.id, NodeTransform::from_model(doc, m)))
            .collect();
        Self { nodes }
    }

    /// Transforms animated by the curve nodes of `layer`.
    pub fn with_layer(doc: &Document, layer: ObjectId) -> Self {
        let mut evaluator = Self::new(doc);
        let mut bound = 0usize;

        for curve_node in doc.sources_of_kind(layer, "AnimationCurveNode") {
            for (target, property) in doc.property_destinations(curve_node.id) {
                let Some(node) = evaluator.nodes.get_mut(&target.id) else {
                    continue;
                };
                let slot = match property {
                    "Lcl Translation" => &mut node.translation_curves,
                    "Lcl Rotation" => &mut node.rotation_curves,
                    "Lcl Scaling" => &mut node.scaling_curves,
                    other => {
                        log::debug!("ignoring animated property '{}' on '{}'", other, node.name);
                        continue;
                    }
                };
                for (curve, channel) in doc.property_sources(curve_node.id) {
                    if curve.kind != "AnimationCurve" {
                        continue;
                    }
                    let axis = match channel {
                        "d|X" => 0,
                        "d|Y" => 1,
                        "d|Z" => 2,
                        _ => continue,
                    };
                    slot[axis] = Some(AnimCurve::from_node(&curve.node));
                    bound += 1;
                }
            }
        }

        log::debug!("bound {bound} animation curves");
        evaluator
    }

    /// First and last key time over every bound curve.
    pub fn key_span(&self) -> Option<(FbxTime, FbxTime)> {
        let mut span: Option<(FbxTime, FbxTime)> = None;
        for node in self.nodes.values() {
            let curves = node
                .translation_curves
                .iter()
                .chain(&node.rotation_curves)
                .chain(&node.scaling_curves)
                .flatten();
            for curve in curves {
                if let (Some(a), Some(b)) = (curve.first_time(), curve.last_time()) {
                    span = Some(match span {
                        Some((s, e)) => (s.min(a), e.max(b)),
                        None => (a, b),
                    });
                }
            }
        }
        span
    }

    pub fn node(&self, id: ObjectId) -> Option<&NodeTransform> {
        self.nodes.get(&id)
    }

    /// Global matrix at `time`; `None` is the bind (non-animated) pose.
    pub fn global(&self, id: ObjectId, time: Option<FbxTime>) -> glm::Mat4 {
        let mut result = glm::identity();
        let mut current = Some(id);
        // guard against malformed cyclic parent links
        let mut depth = 0;
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get(&node_id) else {
                break;
            };
            result = node.local_matrix(time) * result;
            current = node.parent;
            depth += 1;
            if depth > 1024 {
                log::error!("parent chain of node {id} does not terminate");
                break;
            }
        }
        result
    }

    pub fn global_trs(&self, id: ObjectId, time: Option<FbxTime>) -> Trs {
        decompose(&self.global(id, time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn xyz_applies_x_first() {
        // 90 deg about X then 90 deg about Y moves +Y onto +Z then onto +X
        let m = RotationOrder::Xyz.matrix_degrees(&glm::vec3(90.0, 90.0, 0.0));
        let v = m * glm::vec4(0.0, 1.0, 0.0, 0.0);
        assert!(approx(v.x, 1.0) && approx(v.y, 0.0) && approx(v.z, 0.0));
    }

    #[test]
    fn orders_differ_for_compound_rotations() {
        let angles = glm::vec3(30.0, 45.0, 60.0);
        let a = RotationOrder::Xyz.matrix_degrees(&angles);
        let b = RotationOrder::Zyx.matrix_degrees(&angles);
        assert!(!approx(a[(0, 1)], b[(0, 1)]));
    }

    #[test]
    fn decompose_recovers_single_axis_rotation() {
        for angles in [
            glm::vec3(35.0, 0.0, 0.0),
            glm::vec3(0.0, -50.0, 0.0),
            glm::vec3(0.0, 0.0, 120.0),
            glm::vec3(10.0, 20.0, 30.0),
        ] {
            let m = glm::translation(&glm::vec3(1.0, 2.0, 3.0))
                * RotationOrder::Xyz.matrix_degrees(&angles);
            let trs = decompose(&m);
            assert!(approx(trs.translation.y, 2.0));
            assert!(approx(trs.rotation.x, angles.x), "{:?}", trs.rotation);
            assert!(approx(trs.rotation.y, angles.y), "{:?}", trs.rotation);
            assert!(approx(trs.rotation.z, angles.z), "{:?}", trs.rotation);
        }
    }

    #[test]
    fn decompose_reports_scale() {
        let m = glm::scaling(&glm::vec3(2.0, 3.0, 4.0));
        let trs = decompose(&m);
        assert!(approx(trs.scaling.x, 2.0) && approx(trs.scaling.z, 4.0));
        assert!(approx(trs.rotation.x, 0.0));
    }
}
