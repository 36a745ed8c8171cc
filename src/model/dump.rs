use crate::fbx::{Document, Object, ObjectId, TransformEvaluator};
use serde::Serialize;

/// Printable view of one node of the scene tree.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub attribute: String,
    pub translation: [f32; 3],
    pub rotation: [f32; 3],
    pub scaling: [f32; 3],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSummary>,
}

fn summarize(doc: &Document, evaluator: &TransformEvaluator, model: &Object, depth: usize) -> NodeSummary {
    let (translation, rotation, scaling) = match evaluator.node(model.id) {
        Some(n) => (n.translation.into(), n.rotation.into(), n.scaling.into()),
        None => ([0.0; 3], [0.0; 3], [1.0; 3]),
    };
    let children = if depth < 256 {
        doc.child_models(model.id)
            .map(|c| summarize(doc, evaluator, c, depth + 1))
            .collect()
    } else {
        Vec::new()
    };
    NodeSummary {
        name: model.name.clone(),
        attribute: doc.attribute(model).type_name().to_string(),
        translation,
        rotation,
        scaling,
        children,
    }
}

/// The model tree below the scene root.
pub fn node_tree(doc: &Document) -> Vec<NodeSummary> {
    let evaluator = TransformEvaluator::new(doc);
    doc.root_models()
        .map(|m| summarize(doc, &evaluator, m, 0))
        .collect()
}

/// Model tree as pretty JSON.
pub fn node_tree_json(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&node_tree(doc))
}

/// Attribute type names of every model, for the import log.
pub fn attribute_names(doc: &Document) -> Vec<(ObjectId, String, String)> {
    doc.objects_of_kind("Model")
        .map(|m| (m.id, m.name.clone(), doc.attribute(m).type_name().to_string()))
        .collect()
}
