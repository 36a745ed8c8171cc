use crate::fbx::{Document, Object};
use std::path::{Path, PathBuf};

/// Surface parameters of an imported mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub colour: [f32; 3],
    pub specular_colour: [f32; 3],
    pub specular_power: f32,
    pub diffuse_texture: Option<PathBuf>,
    pub normal_map: Option<PathBuf>,
    pub displacement_map: Option<PathBuf>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            colour: [1.0, 1.0, 1.0],
            specular_colour: [4.0, 4.0, 4.0],
            specular_power: 20.0,
            diffuse_texture: None,
            normal_map: None,
            displacement_map: None,
        }
    }
}

/// Phong specular is scaled up to match the lighting model's range.
const SPECULAR_SCALE: f32 = 5.0;

impl Material {
    pub fn import(doc: &Document, material: &Object, folder: &Path) -> Self {
        let mut out = Material {
            name: material.name.clone(),
            ..Default::default()
        };

        out.diffuse_texture = texture_for(doc, material, &["DiffuseColor", "Diffuse"])
            .map(|file| folder.join(file));
        out.normal_map = texture_for(doc, material, &["NormalMap"]).map(|file| folder.join(file));
        if let Some(bump) = texture_for(doc, material, &["Bump", "DisplacementColor"]) {
            if out.normal_map.is_none() {
                out.normal_map = Some(folder.join(normal_map_name(&bump)));
            }
            out.displacement_map = Some(folder.join(bump));
        }

        let props = &material.properties;
        let rgb = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| props.vec3(n))
                .map(|v| [v[0] as f32, v[1] as f32, v[2] as f32])
        };

        if let Some(diffuse) = rgb(&["DiffuseColor", "Diffuse"]) {
            out.colour = diffuse;
        }

        let shading = material
            .node
            .child_str("ShadingModel")
            .unwrap_or("lambert")
            .to_ascii_lowercase();
        if shading == "phong" {
            if let Some(specular) = rgb(&["SpecularColor", "Specular"]) {
                out.specular_colour = specular.map(|c| c * SPECULAR_SCALE);
            }
            if let Some(power) = props.f64("ShininessExponent").or(props.f64("Shininess")) {
                out.specular_power = power as f32;
            }
        } else {
            out.specular_colour = [0.0; 3];
        }

        log::debug!(
            "material '{}' ({}): diffuse {:?} texture {:?}",
            out.name,
            shading,
            out.colour,
            out.diffuse_texture
        );
        out
    }
}

/// Bare file name of the first texture bound to one of `properties`.
fn texture_for(doc: &Document, material: &Object, properties: &[&str]) -> Option<String> {
    let source = properties
        .iter()
        .find_map(|p| doc.source_by_property(material.id, p))?;

    let texture = match source.kind.as_str() {
        "Texture" => source,
        "LayeredTexture" => {
            log::warn!(
                "layered textures are not supported, using the first layer of '{}'",
                source.name
            );
            doc.sources_of_kind(source.id, "Texture").next()?
        }
        other => {
            log::warn!("unexpected {} bound as texture of '{}'", other, material.name);
            return None;
        }
    };

    let path = texture
        .node
        .child_str("FileName")
        .filter(|s| !s.is_empty())
        .or_else(|| texture.node.child_str("RelativeFilename"))
        .or_else(|| texture.properties.str("Path"))?;
    Some(file_name_only(path).to_string())
}

/// Strips any directory part, accepting both separators.
pub fn file_name_only(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// `stone.png` -> `stone-normal.png`
pub fn normal_map_name(file: &str) -> String {
    match file.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-normal.{ext}"),
        None => format!("{file}-normal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_windows_and_unix_directories() {
        assert_eq!(file_name_only("C:\\art\\robot\\body.png"), "body.png");
        assert_eq!(file_name_only("/home/art/body.png"), "body.png");
        assert_eq!(file_name_only("body.png"), "body.png");
    }

    #[test]
    fn derives_normal_map_name() {
        assert_eq!(normal_map_name("wall.tga"), "wall-normal.tga");
        assert_eq!(normal_map_name("wall"), "wall-normal");
    }

    #[test]
    fn default_material_is_white_and_shiny() {
        let m = Material::default();
        assert_eq!(m.colour, [1.0; 3]);
        assert_eq!(m.specular_colour, [4.0; 3]);
        assert_eq!(m.specular_power, 20.0);
    }
}
