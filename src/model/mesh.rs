// Geometry extraction: control points and polygon corners flattened into one
// vertex per corner, with normals, tangents and UVs read from layer 0 or
// generated when missing.

use super::import_args::ImportArgs;
use super::material::Material;
use crate::fbx::{Node, Object};
use nalgebra_glm as glm;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TangentVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
}

/// A static mesh ready for upload.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<TangentVertex>,
    pub indices: Vec<u32>,
    pub material: Material,
}

/// Corner vertices of a geometry and the control point each one came from.
#[derive(Debug, Clone, Default)]
pub struct Corners {
    pub vertices: Vec<TangentVertex>,
    pub control_points: Vec<usize>,
    pub indices: Vec<u32>,
    pub control_point_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Mapping {
    ByControlPoint,
    ByPolygonVertex,
    ByPolygon,
    AllSame,
}

/// One `LayerElement*` block of a geometry.
#[derive(Debug, Clone)]
struct LayerElement {
    mapping: Mapping,
    data: Vec<f64>,
    index: Option<Vec<i32>>,
    width: usize,
}

impl LayerElement {
    fn read(geometry: &Node, element: &str, data: &str, index: &str, width: usize) -> Option<Self> {
        let node = geometry
            .children_named(element)
            .find(|n| n.prop(0).and_then(|p| p.as_i64()).unwrap_or(0) == 0)?;

        let mapping = match node.child_str("MappingInformationType").unwrap_or("") {
            "ByControlPoint" | "ByVertice" | "ByVertex" => Mapping::ByControlPoint,
            "ByPolygonVertex" => Mapping::ByPolygonVertex,
            "ByPolygon" => Mapping::ByPolygon,
            "AllSame" => Mapping::AllSame,
            other => {
                log::warn!("{element}: unsupported mapping mode '{other}'");
                return None;
            }
        };
        let indexed = match node.child_str("ReferenceInformationType").unwrap_or("Direct") {
            "Direct" => false,
            "IndexToDirect" | "Index" => true,
            other => {
                log::warn!("{element}: unsupported reference mode '{other}'");
                return None;
            }
        };

        let data = node.child_value(data)?.to_f64_vec()?;
        let index = if indexed {
            Some(node.child_value(index)?.to_i32_vec()?)
        } else {
            None
        };

        Some(Self {
            mapping,
            data,
            index,
            width,
        })
    }

    fn value(&self, control_point: usize, polygon_vertex: usize, polygon: usize) -> Option<&[f64]> {
        let key = match self.mapping {
            Mapping::ByControlPoint => control_point,
            Mapping::ByPolygonVertex => polygon_vertex,
            Mapping::ByPolygon => polygon,
            Mapping::AllSame => 0,
        };
        let slot = match &self.index {
            Some(index) => usize::try_from(*index.get(key)?).ok()?,
            None => key,
        };
        self.data.get(slot * self.width..slot * self.width + self.width)
    }
}

struct Polygon {
    /// (control point, polygon-vertex index) per corner
    corners: Vec<(usize, usize)>,
}

fn read_polygons(geometry: &Node, control_point_count: usize) -> Vec<Polygon> {
    let indices = geometry
        .child_value("PolygonVertexIndex")
        .and_then(|p| p.to_i32_vec())
        .unwrap_or_default();

    let mut polygons = Vec::new();
    let mut corners = Vec::new();
    for (pv, &raw) in indices.iter().enumerate() {
        // a negative index closes the polygon and stores !index
        let (cp, last) = if raw < 0 { (!raw, true) } else { (raw, false) };
        let cp = cp as usize;
        if cp >= control_point_count {
            log::warn!("polygon vertex {pv} references missing control point {cp}");
        }
        corners.push((cp.min(control_point_count.saturating_sub(1)), pv));
        if last {
            polygons.push(Polygon {
                corners: std::mem::take(&mut corners),
            });
        }
    }
    if !corners.is_empty() {
        polygons.push(Polygon { corners });
    }
    polygons
}

impl Corners {
    /// Flatten a `Geometry` object into corner vertices and triangle indices.
    pub fn extract(geometry: &Object, args: &ImportArgs) -> Self {
        let node = &geometry.node;
        let points = node
            .child_value("Vertices")
            .and_then(|p| p.to_f64_vec())
            .unwrap_or_default();
        let control_point_count = points.len() / 3;
        let polygons = read_polygons(node, control_point_count);

        let mut out = Corners {
            control_point_count,
            ..Default::default()
        };
        if control_point_count == 0 {
            log::warn!("geometry '{}' has no control points", geometry.name);
            return out;
        }

        let non_triangles = polygons.iter().filter(|p| p.corners.len() != 3).count();
        if non_triangles > 0 {
            log::warn!(
                "geometry '{}' has {} non-triangle polygons, fan triangulating",
                geometry.name,
                non_triangles
            );
        }

        let normals = LayerElement::read(node, "LayerElementNormal", "Normals", "NormalsIndex", 3);
        let tangents =
            LayerElement::read(node, "LayerElementTangent", "Tangents", "TangentsIndex", 3);
        let uvs = LayerElement::read(node, "LayerElementUV", "UV", "UVIndex", 2);
        if uvs.is_none() {
            log::warn!("geometry '{}' has no UVs", geometry.name);
        }

        let mut normals_ok = normals.is_some();
        let mut tangents_ok = tangents.is_some();

        for (polygon_index, polygon) in polygons.iter().enumerate() {
            if polygon.corners.len() < 3 {
                continue;
            }
            let base = out.vertices.len() as u32;
            for &(cp, pv) in &polygon.corners {
                let p = &points[cp * 3..cp * 3 + 3];
                let mut v = TangentVertex {
                    position: [p[0] as f32, p[1] as f32, p[2] as f32],
                    ..Default::default()
                };

                if let Some(uv) = uvs.as_ref().and_then(|e| e.value(cp, pv, polygon_index)) {
                    v.uv = [uv[0] as f32, uv[1] as f32];
                }
                if normals_ok {
                    match normals.as_ref().and_then(|e| e.value(cp, pv, polygon_index)) {
                        Some(n) => v.normal = [n[0] as f32, n[1] as f32, n[2] as f32],
                        None => {
                            log::warn!("geometry '{}': bad normal data, regenerating", geometry.name);
                            normals_ok = false;
                        }
                    }
                }
                if tangents_ok {
                    match tangents.as_ref().and_then(|e| e.value(cp, pv, polygon_index)) {
                        Some(t) => v.tangent = [t[0] as f32, t[1] as f32, t[2] as f32],
                        None => {
                            log::warn!(
                                "geometry '{}': stopped importing tangents, generating instead",
                                geometry.name
                            );
                            tangents_ok = false;
                        }
                    }
                }

                out.vertices.push(v);
                out.control_points.push(cp);
            }
            for i in 1..polygon.corners.len() as u32 - 1 {
                out.indices.extend_from_slice(&[base, base + i, base + i + 1]);
            }
        }

        if !normals_ok {
            out.generate_normals();
        }
        if !tangents_ok {
            out.generate_tangents();
        }
        out.apply(args);
        out
    }

    /// Smooth normals: area-weighted face normals summed per control point.
    fn generate_normals(&mut self) {
        let mut sums = vec![glm::Vec3::zeros(); self.control_point_count];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = glm::Vec3::from(self.vertices[a].position);
            let pb = glm::Vec3::from(self.vertices[b].position);
            let pc = glm::Vec3::from(self.vertices[c].position);
            let face = glm::cross(&(pb - pa), &(pc - pa));
            for &corner in &[a, b, c] {
                sums[self.control_points[corner]] += face;
            }
        }
        for (v, &cp) in self.vertices.iter_mut().zip(&self.control_points) {
            let n = sums[cp];
            let n = if glm::length(&n) > f32::EPSILON {
                glm::normalize(&n)
            } else {
                glm::vec3(0.0, 1.0, 0.0)
            };
            v.normal = n.into();
        }
    }

    /// Per control point tangents from UV gradients, orthogonalised against
    /// each corner's normal.
    fn generate_tangents(&mut self) {
        let mut sums = vec![glm::Vec3::zeros(); self.control_point_count];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (va, vb, vc) = (&self.vertices[a], &self.vertices[b], &self.vertices[c]);
            let e1 = glm::Vec3::from(vb.position) - glm::Vec3::from(va.position);
            let e2 = glm::Vec3::from(vc.position) - glm::Vec3::from(va.position);
            let du1 = vb.uv[0] - va.uv[0];
            let dv1 = vb.uv[1] - va.uv[1];
            let du2 = vc.uv[0] - va.uv[0];
            let dv2 = vc.uv[1] - va.uv[1];
            let det = du1 * dv2 - du2 * dv1;
            let tangent = if det.abs() > 1e-12 {
                (e1 * dv2 - e2 * dv1) / det
            } else {
                e1
            };
            for &corner in &[a, b, c] {
                sums[self.control_points[corner]] += tangent;
            }
        }
        for (v, &cp) in self.vertices.iter_mut().zip(&self.control_points) {
            let n = glm::Vec3::from(v.normal);
            let t = sums[cp] - n * glm::dot(&n, &sums[cp]);
            let t = if glm::length(&t) > f32::EPSILON {
                glm::normalize(&t)
            } else {
                any_perpendicular(&n)
            };
            v.tangent = t.into();
        }
    }

    fn apply(&mut self, args: &ImportArgs) {
        for v in &mut self.vertices {
            if args.flip_uvs {
                v.uv[1] = 1.0 - v.uv[1];
            }
            if args.invert_z_scale {
                v.position[2] = -v.position[2];
                v.normal[2] = -v.normal[2];
                v.tangent[2] = -v.tangent[2];
            }
        }
        if args.invert_winding_order {
            for tri in self.indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }
    }
}

fn any_perpendicular(n: &glm::Vec3) -> glm::Vec3 {
    let axis = if n.x.abs() < 0.9 {
        glm::vec3(1.0, 0.0, 0.0)
    } else {
        glm::vec3(0.0, 1.0, 0.0)
    };
    glm::normalize(&glm::cross(n, &axis))
}

impl MeshData {
    pub fn import(name: &str, geometry: &Object, material: Material, args: &ImportArgs) -> Self {
        let corners = Corners::extract(geometry, args);
        log::info!(
            "mesh '{}': {} vertices, {} triangles",
            name,
            corners.vertices.len(),
            corners.indices.len() / 3
        );
        Self {
            name: name.to_string(),
            vertices: corners.vertices,
            indices: corners.indices,
            material,
        }
    }
}
