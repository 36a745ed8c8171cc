use crate::CONFY_APP_NAME;
use crate::animation::{AnimationClip, default_clips};
use crate::renderer::DEFAULT_SHADOW_RESOLUTION;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Adds confy `load`/`save` under the given config name.
macro_rules! confy_section {
    ($ty:ty, $name:literal) => {
        impl $ty {
            pub fn load() -> Self {
                confy::load(CONFY_APP_NAME, $name).unwrap_or_else(|e| {
                    log::warn!("settings '{}' not loaded: {}", $name, e);
                    Self::default()
                })
            }

            pub fn save(&self) {
                if let Err(e) = confy::store(CONFY_APP_NAME, $name, self) {
                    log::warn!("settings '{}' not saved: {}", $name, e);
                }
            }
        }
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub wireframe_mode: bool,
    pub disable_post_processing: bool,
    pub render_scene: bool,
    pub render_character: bool,
    pub show_depth: bool,
    pub fov: f32,
    pub far_plane: f32,
    pub camera_speed: f32,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            wireframe_mode: false,
            disable_post_processing: false,
            render_scene: true,
            render_character: true,
            show_depth: false,
            fov: 60.0,
            far_plane: 100.0,
            camera_speed: 5.0,
            window_width: 1280,
            window_height: 720,
        }
    }
}

confy_section!(DisplaySettings, "display");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    pub apply_lighting: bool,
    pub normal_mapping: bool,
    pub shadow_map_resolution: u32,
    pub shadow_bias: f32,
    pub show_shadow_maps: bool,
    pub show_out_of_range: bool,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            apply_lighting: true,
            normal_mapping: true,
            shadow_map_resolution: DEFAULT_SHADOW_RESOLUTION,
            shadow_bias: 0.002,
            show_shadow_maps: false,
            show_out_of_range: false,
        }
    }
}

confy_section!(LightingSettings, "lighting");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingSettings {
    pub enabled: bool,
    pub tonemapping: bool,
    pub exposure: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
    pub vignette: f32,
    pub fog_colour: [f32; 3],
    /// Linear depth where fog starts.
    pub fog_start: f32,
    pub fog_strength: f32,
    pub apply_lut: bool,
    pub show_lut: bool,
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tonemapping: true,
            exposure: 1.687,
            brightness: -0.072,
            contrast: 0.434,
            hue: 0.0,
            saturation: 0.855,
            value: 1.0,
            vignette: 0.3,
            fog_colour: [9.0 / 255.0, 72.0 / 255.0, 72.0 / 255.0],
            fog_start: 10.0,
            fog_strength: 1.0,
            apply_lut: true,
            show_lut: false,
        }
    }
}

confy_section!(GradingSettings, "grading");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub enabled: bool,
    pub threshold: f32,
    pub intensity: f32,
    /// Blur radius in pixels of the bloom target.
    pub distance: u32,
}

pub const MAX_BLUR_DISTANCE: u32 = 256;

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.6,
            intensity: 1.0,
            distance: 200,
        }
    }
}

confy_section!(BloomSettings, "bloom");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub count: u32,
    pub size: f32,
    pub max_speed: f32,
    /// Spawn box corners.
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: 1024,
            size: 0.4,
            max_speed: 35.0,
            min: [-72.0, 27.0, -14.0],
            max: [1.0, 29.0, 42.0],
        }
    }
}

confy_section!(ParticleSettings, "particles");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub clips: Vec<AnimationClip>,
    pub initial_clip: String,
    pub transition_time: f32,
    pub time_scale: f32,
    pub render_bones: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            clips: default_clips(),
            initial_clip: "Walk".to_string(),
            transition_time: 1.0,
            time_scale: 1.0,
            render_bones: false,
        }
    }
}

confy_section!(AnimationSettings, "animation");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub resource_dir: PathBuf,
    pub scene: PathBuf,
    pub character: PathBuf,
    pub lut: PathBuf,
    /// Normal map forced onto the character's first mesh, if any.
    pub character_normal_map: Option<PathBuf>,
    pub character_specular: [f32; 3],
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("res"),
            scene: PathBuf::from("scene/scene.fbx"),
            character: PathBuf::from("Robo_01.fbx"),
            lut: PathBuf::from("LUTs/Lut_blue.png"),
            character_normal_map: Some(PathBuf::from("normalmap.png")),
            character_specular: [5.0, 5.0, 5.0],
        }
    }
}

impl AssetSettings {
    pub fn scene_path(&self) -> PathBuf {
        self.resource_dir.join(&self.scene)
    }

    pub fn character_path(&self) -> PathBuf {
        self.resource_dir.join(&self.character)
    }

    pub fn lut_path(&self) -> PathBuf {
        self.resource_dir.join(&self.lut)
    }
}

confy_section!(AssetSettings, "assets");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub show_ui: bool,
    pub show_texture_panel: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            show_ui: true,
            show_texture_panel: false,
        }
    }
}

confy_section!(UiSettings, "ui");

// Aggregate struct for convenience
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub display: DisplaySettings,
    pub lighting: LightingSettings,
    pub grading: GradingSettings,
    pub bloom: BloomSettings,
    pub particles: ParticleSettings,
    pub animation: AnimationSettings,
    pub assets: AssetSettings,
    pub ui: UiSettings,
}

impl Settings {
    pub fn load() -> Self {
        Self {
            display: DisplaySettings::load(),
            lighting: LightingSettings::load(),
            grading: GradingSettings::load(),
            bloom: BloomSettings::load(),
            particles: ParticleSettings::load(),
            animation: AnimationSettings::load(),
            assets: AssetSettings::load(),
            ui: UiSettings::load(),
        }
    }

    pub fn save(&self) {
        self.display.save();
        self.lighting.save();
        self.grading.save();
        self.bloom.save();
        self.particles.save();
        self.animation.save();
        self.assets.save();
        self.ui.save();
    }

    /// Whether the frame goes through the post-processing chain.
    pub fn post_processing(&self) -> bool {
        !self.display.wireframe_mode && !self.display.disable_post_processing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let grading: GradingSettings = serde_json::from_str(r#"{ "exposure": 2.0 }"#).unwrap();
        assert_eq!(grading.exposure, 2.0);
        assert_eq!(grading.saturation, 0.855);
        assert!(grading.enabled);
    }

    #[test]
    fn asset_paths_join_resource_dir() {
        let assets = AssetSettings::default();
        assert_eq!(assets.scene_path(), PathBuf::from("res/scene/scene.fbx"));
        assert_eq!(assets.character_path(), PathBuf::from("res/Robo_01.fbx"));
    }

    #[test]
    fn wireframe_disables_post_processing() {
        let mut settings = Settings::default();
        assert!(settings.post_processing());
        settings.display.wireframe_mode = true;
        assert!(!settings.post_processing());
    }

    #[test]
    fn default_clips_include_walk() {
        let animation = AnimationSettings::default();
        assert!(animation.clips.iter().any(|c| c.name == animation.initial_clip));
    }
}
