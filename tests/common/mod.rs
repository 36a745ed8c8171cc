//! Minimal binary FBX writer for building test documents in memory.
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use fbxdemo::fbx::reader::MAGIC;
use fbxdemo::fbx::{Document, FbxTime, Node, Property};

pub const VERSION: u32 = 7400;

pub fn node(name: &str, properties: Vec<Property>, children: Vec<Node>) -> Node {
    Node {
        name: name.to_string(),
        properties,
        children,
    }
}

pub fn s(value: &str) -> Property {
    Property::String(value.to_string())
}

/// `Name: value` child record.
pub fn field(name: &str, value: Property) -> Node {
    node(name, vec![value], vec![])
}

/// A `P` entry of a `Properties70` block holding three doubles.
pub fn p_vec3(name: &str, v: [f64; 3]) -> Node {
    node(
        "P",
        vec![
            s(name),
            s(name),
            s(""),
            s("A"),
            Property::F64(v[0]),
            Property::F64(v[1]),
            Property::F64(v[2]),
        ],
        vec![],
    )
}

pub fn p_time(name: &str, time: FbxTime) -> Node {
    node(
        "P",
        vec![s(name), s("KTime"), s("Time"), s(""), Property::I64(time.0)],
        vec![],
    )
}

fn write_property(out: &mut Vec<u8>, p: &Property) {
    fn array_header(out: &mut Vec<u8>, code: u8, count: usize, bytes: usize) {
        out.push(code);
        out.write_u32::<LittleEndian>(count as u32).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
        out.write_u32::<LittleEndian>(bytes as u32).unwrap();
    }

    match p {
        Property::Bool(v) => {
            out.push(b'C');
            out.push(*v as u8);
        }
        Property::I16(v) => {
            out.push(b'Y');
            out.write_i16::<LittleEndian>(*v).unwrap();
        }
        Property::I32(v) => {
            out.push(b'I');
            out.write_i32::<LittleEndian>(*v).unwrap();
        }
        Property::I64(v) => {
            out.push(b'L');
            out.write_i64::<LittleEndian>(*v).unwrap();
        }
        Property::F32(v) => {
            out.push(b'F');
            out.write_f32::<LittleEndian>(*v).unwrap();
        }
        Property::F64(v) => {
            out.push(b'D');
            out.write_f64::<LittleEndian>(*v).unwrap();
        }
        Property::String(v) => {
            out.push(b'S');
            out.write_u32::<LittleEndian>(v.len() as u32).unwrap();
            out.extend_from_slice(v.as_bytes());
        }
        Property::Raw(v) => {
            out.push(b'R');
            out.write_u32::<LittleEndian>(v.len() as u32).unwrap();
            out.extend_from_slice(v);
        }
        Property::BoolArray(v) => {
            array_header(out, b'b', v.len(), v.len());
            out.extend(v.iter().map(|&b| b as u8));
        }
        Property::I32Array(v) => {
            array_header(out, b'i', v.len(), v.len() * 4);
            for x in v {
                out.write_i32::<LittleEndian>(*x).unwrap();
            }
        }
        Property::I64Array(v) => {
            array_header(out, b'l', v.len(), v.len() * 8);
            for x in v {
                out.write_i64::<LittleEndian>(*x).unwrap();
            }
        }
        Property::F32Array(v) => {
            array_header(out, b'f', v.len(), v.len() * 4);
            for x in v {
                out.write_f32::<LittleEndian>(*x).unwrap();
            }
        }
        Property::F64Array(v) => {
            array_header(out, b'd', v.len(), v.len() * 8);
            for x in v {
                out.write_f64::<LittleEndian>(*x).unwrap();
            }
        }
    }
}

fn write_node(out: &mut Vec<u8>, n: &Node) {
    let start = out.len();
    out.extend_from_slice(&[0u8; 12]);
    out.push(n.name.len() as u8);
    out.extend_from_slice(n.name.as_bytes());

    let props_start = out.len();
    for p in &n.properties {
        write_property(out, p);
    }
    let props_len = out.len() - props_start;

    if !n.children.is_empty() {
        for child in &n.children {
            write_node(out, child);
        }
        out.extend_from_slice(&[0u8; 13]);
    }

    let end = out.len() as u32;
    out[start..start + 4].copy_from_slice(&end.to_le_bytes());
    out[start + 4..start + 8].copy_from_slice(&(n.properties.len() as u32).to_le_bytes());
    out[start + 8..start + 12].copy_from_slice(&(props_len as u32).to_le_bytes());
}

pub fn encode(nodes: &[Node]) -> Vec<u8> {
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&[0x1a, 0x00]);
    out.write_u32::<LittleEndian>(VERSION).unwrap();
    for n in nodes {
        write_node(&mut out, n);
    }
    out.extend_from_slice(&[0u8; 13]);
    out
}

/// Builds the `Objects` and `Connections` sections of a document.
#[derive(Default)]
pub struct FbxBuilder {
    objects: Vec<Node>,
    connections: Vec<Node>,
    next_id: i64,
}

impl FbxBuilder {
    pub fn new() -> Self {
        Self {
            next_id: 1000,
            ..Default::default()
        }
    }

    fn object(&mut self, kind: &str, name: &str, class: &str, props: Vec<Node>, mut extra: Vec<Node>) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        let mut children = vec![node("Properties70", vec![], props)];
        children.append(&mut extra);
        self.objects.push(node(
            kind,
            vec![
                Property::I64(id),
                s(&format!("{name}\0\u{1}{kind}")),
                s(class),
            ],
            children,
        ));
        id
    }

    pub fn connect(&mut self, child: i64, parent: i64) {
        self.connections.push(node(
            "C",
            vec![s("OO"), Property::I64(child), Property::I64(parent)],
            vec![],
        ));
    }

    pub fn connect_property(&mut self, child: i64, parent: i64, property: &str) {
        self.connections.push(node(
            "C",
            vec![s("OP"), Property::I64(child), Property::I64(parent), s(property)],
            vec![],
        ));
    }

    /// A model under `parent` (0 is the scene root) with a local translation.
    pub fn model(&mut self, name: &str, class: &str, parent: i64, translation: [f64; 3]) -> i64 {
        let id = self.object(
            "Model",
            name,
            class,
            vec![p_vec3("Lcl Translation", translation)],
            vec![],
        );
        self.connect(id, parent);
        id
    }

    pub fn joint(&mut self, name: &str, parent: i64, translation: [f64; 3]) -> i64 {
        self.model(name, "LimbNode", parent, translation)
    }

    /// Mesh geometry attached to `model`. `polygons` uses the file's
    /// convention of a bit-inverted last index per polygon.
    pub fn geometry(
        &mut self,
        model: i64,
        points: &[[f64; 3]],
        polygons: &[i32],
        uvs: Option<&[[f64; 2]]>,
    ) -> i64 {
        let mut extra = vec![
            field("Vertices", Property::F64Array(points.iter().flatten().copied().collect())),
            field("PolygonVertexIndex", Property::I32Array(polygons.to_vec())),
        ];
        if let Some(uvs) = uvs {
            extra.push(node(
                "LayerElementUV",
                vec![Property::I32(0)],
                vec![
                    field("MappingInformationType", s("ByControlPoint")),
                    field("ReferenceInformationType", s("Direct")),
                    field("UV", Property::F64Array(uvs.iter().flatten().copied().collect())),
                ],
            ));
        }
        let id = self.object("Geometry", "Geometry", "Mesh", vec![], extra);
        self.connect(id, model);
        id
    }

    /// A skin deformer on `geometry`; `skinning_type` is written as is.
    pub fn skin(&mut self, geometry: i64, skinning_type: &str) -> i64 {
        let id = self.object(
            "Deformer",
            "Skin",
            "Skin",
            vec![],
            vec![field("SkinningType", s(skinning_type))],
        );
        self.connect(id, geometry);
        id
    }

    /// A cluster of `skin`, linked to `joint` when given.
    pub fn cluster(&mut self, skin: i64, name: &str, joint: Option<i64>, indexes: &[i32], weights: &[f64]) -> i64 {
        let id = self.object(
            "Deformer",
            name,
            "Cluster",
            vec![],
            vec![
                field("Indexes", Property::I32Array(indexes.to_vec())),
                field("Weights", Property::F64Array(weights.to_vec())),
            ],
        );
        self.connect(id, skin);
        if let Some(joint) = joint {
            self.connect(joint, id);
        }
        id
    }

    pub fn material(&mut self, model: i64, name: &str, shading: &str, diffuse: [f64; 3], specular: [f64; 3]) -> i64 {
        let id = self.object(
            "Material",
            name,
            "",
            vec![p_vec3("DiffuseColor", diffuse), p_vec3("SpecularColor", specular)],
            vec![field("ShadingModel", s(shading))],
        );
        self.connect(id, model);
        id
    }

    pub fn texture(&mut self, material: i64, property: &str, file_name: &str) -> i64 {
        let id = self.object(
            "Texture",
            "Texture",
            "",
            vec![],
            vec![field("FileName", s(file_name))],
        );
        self.connect_property(id, material, property);
        id
    }

    /// Animation stack with one layer; `span` of `None` leaves the stack's
    /// local time unset.
    pub fn animation(&mut self, name: &str, span: Option<(FbxTime, FbxTime)>) -> i64 {
        let props = span
            .map(|(a, b)| vec![p_time("LocalStart", a), p_time("LocalStop", b)])
            .unwrap_or_default();
        let stack = self.object("AnimationStack", name, "", props, vec![]);
        let layer = self.object("AnimationLayer", "BaseLayer", "", vec![], vec![]);
        self.connect(layer, stack);
        layer
    }

    /// Keys one axis ("d|X", "d|Y" or "d|Z") of a transform property.
    pub fn curve(&mut self, layer: i64, target: i64, property: &str, axis: &str, keys: &[(FbxTime, f32)]) {
        let curve_node = self.object("AnimationCurveNode", "T", "", vec![], vec![]);
        self.connect(curve_node, layer);
        self.connect_property(curve_node, target, property);
        let curve = self.object(
            "AnimationCurve",
            "",
            "",
            vec![],
            vec![
                field("KeyTime", Property::I64Array(keys.iter().map(|k| k.0.0).collect())),
                field("KeyValueFloat", Property::F32Array(keys.iter().map(|k| k.1).collect())),
            ],
        );
        self.connect_property(curve, curve_node, axis);
    }

    pub fn bytes(&self) -> Vec<u8> {
        encode(&[
            node(
                "GlobalSettings",
                vec![],
                vec![node(
                    "Properties70",
                    vec![],
                    vec![node(
                        "P",
                        vec![s("TimeMode"), s("enum"), s(""), s(""), Property::I32(6)],
                        vec![],
                    )],
                )],
            ),
            node("Objects", vec![], self.objects.clone()),
            node("Connections", vec![], self.connections.clone()),
        ])
    }

    pub fn document(&self) -> Document {
        Document::from_bytes(&self.bytes()).expect("test document parses")
    }
}
