use super::FbxError;
use super::node::{Node, Property};
use super::reader::{self, FbxFile};
use super::time::FbxTime;
use std::collections::HashMap;

pub type ObjectId = i64;

/// Id of the implicit scene root that top-level models connect to.
pub const ROOT_ID: ObjectId = 0;

/// `Properties70` block: property name to its type and trailing values.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: HashMap<String, PropertyEntry>,
}

#[derive(Debug, Clone)]
pub struct PropertyEntry {
    pub type_name: String,
    pub values: Vec<Property>,
}

impl Properties {
    pub fn from_node(node: Option<&Node>) -> Self {
        let mut entries = HashMap::new();
        for p in node.into_iter().flat_map(|n| n.children_named("P")) {
            let Some(name) = p.prop(0).and_then(Property::as_str) else {
                continue;
            };
            let type_name = p.prop(1).and_then(Property::as_str).unwrap_or_default().to_string();
            let values = p.properties.iter().skip(4).cloned().collect();
            entries.insert(name.to_string(), PropertyEntry { type_name, values });
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, type_name: &str, values: Vec<Property>) {
        self.entries.insert(
            name.to_string(),
            PropertyEntry {
                type_name: type_name.to_string(),
                values,
            },
        );
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.values.first()?.as_f64()
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.values.first()?.as_i64()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name)?.values.first()?.as_str()
    }

    pub fn vec3(&self, name: &str) -> Option<[f64; 3]> {
        let v = &self.get(name)?.values;
        Some([v.first()?.as_f64()?, v.get(1)?.as_f64()?, v.get(2)?.as_f64()?])
    }
}

/// One entry of the `Objects` section.
#[derive(Debug, Clone)]
pub struct Object {
    pub id: ObjectId,
    /// Record name: `Model`, `Geometry`, `Deformer`, ...
    pub kind: String,
    pub name: String,
    /// Third property: `Mesh`, `LimbNode`, `Skin`, `Cluster`, ...
    pub sub_class: String,
    pub properties: Properties,
    pub node: Node,
}

impl Object {
    fn from_node(node: Node) -> Option<Self> {
        let id = node.prop(0)?.as_i64()?;
        let raw_name = node.prop(1).and_then(Property::as_str).unwrap_or_default();
        // binary names are stored as "Name\0\x01Class"
        let name = raw_name.split("\0\u{1}").next().unwrap_or_default().to_string();
        let sub_class = node
            .prop(2)
            .and_then(Property::as_str)
            .unwrap_or_default()
            .to_string();
        let properties = Properties::from_node(node.child("Properties70"));
        Some(Self {
            id,
            kind: node.name.clone(),
            name,
            sub_class,
            properties,
            node,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub child: ObjectId,
    pub parent: ObjectId,
    pub property: Option<String>,
}

/// Time span of an animation stack or take.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimStack {
    pub id: Option<ObjectId>,
    pub name: String,
    pub local_start: FbxTime,
    pub local_stop: FbxTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkeletonKind {
    LimbNode,
    Limb,
    Root,
    Effector,
}

/// What a model node carries, the equivalent of a node attribute type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Skeleton(SkeletonKind),
    Mesh,
    Null,
    Other(String),
    None,
}

impl AttributeKind {
    pub fn type_name(&self) -> &str {
        match self {
            AttributeKind::Skeleton(_) => "eSkeleton",
            AttributeKind::Mesh => "eMesh",
            AttributeKind::Null => "eNull",
            AttributeKind::Other(name) => name,
            AttributeKind::None => "undefined",
        }
    }
}

/// The object graph of an FBX file.
#[derive(Debug, Clone)]
pub struct Document {
    pub version: u32,
    objects: Vec<Object>,
    by_id: HashMap<ObjectId, usize>,
    connections: Vec<Connection>,
    pub global_settings: Properties,
    takes: Vec<AnimStack>,
}

impl Document {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FbxError> {
        Ok(Self::from_file(reader::parse(bytes)?))
    }

    pub fn from_file(file: FbxFile) -> Self {
        let version = file.version;
        let mut objects = Vec::new();
        let mut connections = Vec::new();
        let mut global_settings = Properties::default();
        let mut takes = Vec::new();

        for node in file.nodes {
            match node.name.as_str() {
                "Objects" => {
                    for child in node.children {
                        if let Some(object) = Object::from_node(child) {
                            objects.push(object);
                        }
                    }
                }
                "Connections" => {
                    for c in node.children_named("C") {
                        if let Some(connection) = parse_connection(c) {
                            connections.push(connection);
                        }
                    }
                }
                "GlobalSettings" => {
                    global_settings = Properties::from_node(node.child("Properties70"));
                }
                "Takes" => {
                    for take in node.children_named("Take") {
                        if let Some(stack) = parse_take(take) {
                            takes.push(stack);
                        }
                    }
                }
                _ => {}
            }
        }

        let by_id = objects.iter().enumerate().map(|(i, o)| (o.id, i)).collect();
        log::debug!(
            "FBX document: {} objects, {} connections",
            objects.len(),
            connections.len()
        );

        Self {
            version,
            objects,
            by_id,
            connections,
            global_settings,
            takes,
        }
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.by_id.get(&id).map(|&i| &self.objects[i])
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    pub fn objects_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Object> + 'a {
        self.objects.iter().filter(move |o| o.kind == kind)
    }

    /// Objects connected into `parent`, in connection order.
    pub fn sources<'a>(&'a self, parent: ObjectId) -> impl Iterator<Item = &'a Object> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.parent == parent)
            .filter_map(move |c| self.object(c.child))
    }

    pub fn sources_of_kind<'a>(
        &'a self,
        parent: ObjectId,
        kind: &'a str,
    ) -> impl Iterator<Item = &'a Object> + 'a {
        self.sources(parent).filter(move |o| o.kind == kind)
    }

    /// Object connected into `parent` through the named property.
    pub fn source_by_property(&self, parent: ObjectId, property: &str) -> Option<&Object> {
        self.connections
            .iter()
            .filter(|c| c.parent == parent && c.property.as_deref() == Some(property))
            .find_map(|c| self.object(c.child))
    }

    /// Property connections into `parent`: (source object, property name).
    pub fn property_sources<'a>(
        &'a self,
        parent: ObjectId,
    ) -> impl Iterator<Item = (&'a Object, &'a str)> + 'a {
        self.connections.iter().filter(move |c| c.parent == parent).filter_map(move |c| {
            let property = c.property.as_deref()?;
            Some((self.object(c.child)?, property))
        })
    }

    /// Property connections out of `child`: (destination object, property name).
    pub fn property_destinations<'a>(
        &'a self,
        child: ObjectId,
    ) -> impl Iterator<Item = (&'a Object, &'a str)> + 'a {
        self.connections.iter().filter(move |c| c.child == child).filter_map(move |c| {
            let property = c.property.as_deref()?;
            Some((self.object(c.parent)?, property))
        })
    }

    pub fn root_models(&self) -> impl Iterator<Item = &Object> {
        self.child_models(ROOT_ID)
    }

    pub fn child_models(&self, parent: ObjectId) -> impl Iterator<Item = &Object> {
        self.connections
            .iter()
            .filter(move |c| c.parent == parent && c.property.is_none())
            .filter_map(move |c| self.object(c.child))
            .filter(|o| o.kind == "Model")
    }

    /// Parent model of a model, `None` for models attached to the scene root.
    pub fn parent_model(&self, model: ObjectId) -> Option<ObjectId> {
        self.connections
            .iter()
            .filter(|c| c.child == model && c.property.is_none())
            .filter_map(|c| self.object(c.parent))
            .find(|o| o.kind == "Model")
            .map(|o| o.id)
    }

    pub fn geometry(&self, model: ObjectId) -> Option<&Object> {
        self.sources_of_kind(model, "Geometry").next()
    }

    pub fn materials(&self, model: ObjectId) -> impl Iterator<Item = &Object> {
        self.sources_of_kind(model, "Material")
    }

    pub fn attribute(&self, model: &Object) -> AttributeKind {
        if let Some(geometry) = self.geometry(model.id) {
            if geometry.sub_class == "Mesh" {
                return AttributeKind::Mesh;
            }
            return AttributeKind::Other(geometry.sub_class.clone());
        }
        let sub_class = match self.sources_of_kind(model.id, "NodeAttribute").next() {
            Some(attribute) => attribute.sub_class.as_str(),
            None => model.sub_class.as_str(),
        };
        match sub_class {
            "LimbNode" => AttributeKind::Skeleton(SkeletonKind::LimbNode),
            "Limb" => AttributeKind::Skeleton(SkeletonKind::Limb),
            "Root" => AttributeKind::Skeleton(SkeletonKind::Root),
            "Effector" => AttributeKind::Skeleton(SkeletonKind::Effector),
            "Null" => AttributeKind::Null,
            "" | "Mesh" => AttributeKind::None,
            other => AttributeKind::Other(other.to_string()),
        }
    }

    /// Skin deformers attached to a geometry.
    pub fn skins(&self, geometry: ObjectId) -> impl Iterator<Item = &Object> {
        self.sources_of_kind(geometry, "Deformer")
            .filter(|d| d.sub_class == "Skin")
    }

    pub fn clusters(&self, skin: ObjectId) -> impl Iterator<Item = &Object> {
        self.sources_of_kind(skin, "Deformer")
            .filter(|d| d.sub_class == "Cluster")
    }

    /// The joint model a cluster is bound to.
    pub fn cluster_link(&self, cluster: ObjectId) -> Option<&Object> {
        self.sources_of_kind(cluster, "Model").next()
    }

    /// Frames per second from `GlobalSettings`, 24 when unspecified.
    pub fn frame_rate(&self) -> f64 {
        let custom = self.global_settings.f64("CustomFrameRate").unwrap_or(-1.0);
        match self.global_settings.i64("TimeMode").unwrap_or(0) {
            1 => 120.0,
            2 => 100.0,
            3 => 60.0,
            4 => 50.0,
            5 => 48.0,
            6 | 7 => 30.0,
            8 | 9 => 29.97,
            10 => 25.0,
            11 => 24.0,
            12 => 1000.0,
            13 => 23.976,
            14 if custom > 0.0 => custom,
            15 => 96.0,
            16 => 72.0,
            17 => 59.94,
            18 => 119.88,
            _ => 24.0,
        }
    }

    /// Unit scale relative to centimetres.
    pub fn unit_scale(&self) -> f64 {
        self.global_settings.f64("UnitScaleFactor").unwrap_or(1.0)
    }

    /// Animation stacks with their local time spans, falling back to `Takes`.
    pub fn animation_stacks(&self) -> Vec<AnimStack> {
        let mut stacks = Vec::new();
        for stack in self.objects_of_kind("AnimationStack") {
            let take = self.takes.iter().find(|t| t.name == stack.name);
            let start = stack
                .properties
                .i64("LocalStart")
                .map(FbxTime)
                .or(take.map(|t| t.local_start));
            let stop = stack
                .properties
                .i64("LocalStop")
                .map(FbxTime)
                .or(take.map(|t| t.local_stop));
            stacks.push(AnimStack {
                id: Some(stack.id),
                name: stack.name.clone(),
                local_start: start.unwrap_or(FbxTime::ZERO),
                local_stop: stop.unwrap_or(FbxTime::ZERO),
            });
        }
        if stacks.is_empty() {
            stacks.extend(self.takes.iter().cloned());
        }
        stacks
    }

    pub fn animation_layers(&self, stack: ObjectId) -> Vec<&Object> {
        self.sources_of_kind(stack, "AnimationLayer").collect()
    }
}

fn parse_connection(node: &Node) -> Option<Connection> {
    let kind = node.prop(0)?.as_str()?;
    let child = node.prop(1)?.as_i64()?;
    let parent = node.prop(2)?.as_i64()?;
    let property = match kind {
        "OP" | "PP" => node.prop(3).and_then(Property::as_str).map(str::to_string),
        _ => None,
    };
    Some(Connection {
        child,
        parent,
        property,
    })
}

fn parse_take(node: &Node) -> Option<AnimStack> {
    let name = node.prop(0)?.as_str()?.to_string();
    let local = node.child("LocalTime")?;
    Some(AnimStack {
        id: None,
        name,
        local_start: FbxTime(local.prop(0)?.as_i64()?),
        local_stop: FbxTime(local.prop(1)?.as_i64()?),
    })
}
