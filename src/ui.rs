use crate::renderer::camera::CameraState;
use crate::renderer::{LightKind, LightRig, SHADOW_RESOLUTIONS};
use crate::settings::{MAX_BLUR_DISTANCE, Settings};

/// Weight of the newest frame in the smoothed frame time.
const FRAME_TIME_SMOOTHING: f32 = 0.05;

/// What the panels asked the app to do this frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UiActions {
    pub reset_camera: bool,
    /// Index into the animation clip table.
    pub play_clip: Option<usize>,
}

pub struct Ui {
    frame_time: f32,
}

impl Ui {
    pub fn new() -> Self {
        Self { frame_time: 0.0 }
    }

    /// Feeds one frame's duration into the FPS average.
    pub fn tick(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.frame_time = if self.frame_time == 0.0 {
            dt
        } else {
            self.frame_time + (dt - self.frame_time) * FRAME_TIME_SMOOTHING
        };
    }

    pub fn fps(&self) -> f32 {
        if self.frame_time > 0.0 { 1.0 / self.frame_time } else { 0.0 }
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        settings: &mut Settings,
        lights: &mut LightRig,
        camera: &mut CameraState,
        wireframe_supported: bool,
    ) -> UiActions {
        let mut actions = UiActions::default();

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.label(format!("FPS: {:.0}", self.fps()));
                ui.label(format!("({:.2} ms)", self.frame_time * 1000.0));
                ui.separator();
                if ui
                    .button(if settings.ui.show_texture_panel {
                        "✅ Textures"
                    } else {
                        "⬜ Textures"
                    })
                    .clicked()
                {
                    settings.ui.show_texture_panel = !settings.ui.show_texture_panel;
                }
                ui.separator();
                ui.label("Tab hides the UI");
            });
        });

        egui::Window::new("Debug")
            .default_width(340.0)
            .default_pos([10.0, 40.0])
            .resizable(true)
            .vscroll(true)
            .show(ctx, |ui| {
                egui::CollapsingHeader::new("Scene parameters")
                    .default_open(true)
                    .show(ui, |ui| {
                        actions.reset_camera =
                            scene_section(ui, settings, camera, wireframe_supported);
                    });
                egui::CollapsingHeader::new("Lighting").show(ui, |ui| {
                    lighting_section(ui, settings, lights);
                });
                egui::CollapsingHeader::new("Colour grading").show(ui, |ui| {
                    grading_section(ui, settings);
                });
                egui::CollapsingHeader::new("Bloom").show(ui, |ui| {
                    let bloom = &mut settings.bloom;
                    ui.checkbox(&mut bloom.enabled, "Enabled");
                    ui.add(egui::Slider::new(&mut bloom.threshold, 0.0..=2.0).text("Threshold"));
                    ui.add(egui::Slider::new(&mut bloom.intensity, 0.0..=4.0).text("Intensity"));
                    ui.add(
                        egui::Slider::new(&mut bloom.distance, 1..=MAX_BLUR_DISTANCE)
                            .text("Blur distance"),
                    );
                });
                egui::CollapsingHeader::new("Particles").show(ui, |ui| {
                    let particles = &mut settings.particles;
                    ui.add(egui::Slider::new(&mut particles.size, 0.01..=2.0).text("Size"));
                    ui.add(egui::Slider::new(&mut particles.max_speed, 0.0..=100.0).text("Speed"));
                    ui.label(format!("{} particles", particles.count));
                });
                egui::CollapsingHeader::new("Animations")
                    .default_open(true)
                    .show(ui, |ui| {
                        actions.play_clip = animation_section(ui, settings);
                    });
            });

        actions
    }
}

impl Default for Ui {
    fn default() -> Self {
        Self::new()
    }
}

fn vec3_drag(ui: &mut egui::Ui, label: &str, value: &mut [f32; 3], speed: f64) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        for v in value.iter_mut() {
            changed |= ui.add(egui::DragValue::new(v).speed(speed)).changed();
        }
    });
    changed
}

/// Returns true when the camera reset was requested.
fn scene_section(
    ui: &mut egui::Ui,
    settings: &mut Settings,
    camera: &mut CameraState,
    wireframe_supported: bool,
) -> bool {
    let display = &mut settings.display;
    ui.add_enabled(
        wireframe_supported,
        egui::Checkbox::new(&mut display.wireframe_mode, "Wireframe"),
    );
    ui.checkbox(&mut display.disable_post_processing, "Disable post-processing");
    ui.checkbox(&mut display.render_scene, "View scene");
    ui.checkbox(&mut display.render_character, "View character");
    ui.checkbox(&mut display.show_depth, "Show depth");

    ui.add(egui::Slider::new(&mut display.fov, 10.0..=150.0).text("FOV"));
    ui.add(
        egui::Slider::new(&mut display.far_plane, 1.0..=1000.0)
            .text("Far plane")
            .logarithmic(true),
    );
    vec3_drag(ui, "Camera", &mut camera.position, 0.1);
    ui.add(egui::Slider::new(&mut display.camera_speed, 0.1..=20.0).text("Camera speed"));

    ui.button("Reset camera").clicked()
}

fn lighting_section(ui: &mut egui::Ui, settings: &mut Settings, lights: &mut LightRig) {
    let lighting = &mut settings.lighting;
    ui.checkbox(&mut lighting.apply_lighting, "Apply lighting");
    ui.checkbox(&mut lighting.normal_mapping, "Normal mapping");

    ui.horizontal(|ui| {
        ui.label("Shadow maps:");
        for res in SHADOW_RESOLUTIONS {
            ui.selectable_value(&mut lighting.shadow_map_resolution, res, res.to_string());
        }
    });
    ui.add(
        egui::Slider::new(&mut lighting.shadow_bias, 0.0..=0.05)
            .text("Bias")
            .logarithmic(true),
    );
    ui.checkbox(&mut lighting.show_shadow_maps, "Show shadow maps");
    ui.checkbox(&mut lighting.show_out_of_range, "Show out-of-range");

    ui.horizontal(|ui| {
        ui.label("Ambient");
        ui.color_edit_button_rgb(&mut lights.ambient);
    });

    ui.separator();
    let mut reset = None;
    for (i, light) in lights.lights.iter_mut().enumerate() {
        egui::CollapsingHeader::new(format!("{}: {}", i, light.name))
            .id_salt(("light", i))
            .show(ui, |ui| {
                egui::ComboBox::from_id_salt(("light-kind", i))
                    .selected_text(light.kind.label())
                    .show_ui(ui, |ui| {
                        for kind in LightKind::ALL {
                            ui.selectable_value(&mut light.kind, kind, kind.label());
                        }
                    });
                ui.checkbox(&mut light.casts_shadow, "Casts shadow");
                vec3_drag(ui, "Position", &mut light.position, 0.1);
                vec3_drag(ui, "Direction", &mut light.direction, 0.01);
                ui.horizontal(|ui| {
                    ui.label("Diffuse");
                    ui.color_edit_button_rgb(&mut light.diffuse);
                });
                ui.horizontal(|ui| {
                    vec3_drag(ui, "Attenuation", &mut light.attenuation, 0.01);
                    if ui.small_button("⟲").clicked() {
                        light.reset_attenuation();
                    }
                });
                for a in light.attenuation.iter_mut() {
                    *a = a.max(0.0);
                }
                match light.kind {
                    LightKind::Directional => {
                        ui.add(
                            egui::Slider::new(&mut light.shadow_size, 1.0..=200.0).text("Shadow size"),
                        );
                    }
                    LightKind::Spot | LightKind::Point => {
                        ui.add(egui::Slider::new(&mut light.fov, 1.0..=179.0).text("FOV"));
                    }
                    LightKind::Inactive => {}
                }
                if ui.button("Reset light").clicked() {
                    reset = Some(i);
                }
            });
    }
    if let Some(i) = reset {
        lights.reset(i);
    }
}

fn grading_section(ui: &mut egui::Ui, settings: &mut Settings) {
    let grading = &mut settings.grading;
    ui.checkbox(&mut grading.enabled, "Enabled");
    ui.checkbox(&mut grading.tonemapping, "Tonemapping");
    ui.add(egui::Slider::new(&mut grading.exposure, 0.0..=5.0).text("Exposure"));
    ui.add(egui::Slider::new(&mut grading.brightness, -1.0..=1.0).text("Brightness"));
    ui.add(egui::Slider::new(&mut grading.contrast, -1.0..=1.0).text("Contrast"));
    ui.add(egui::Slider::new(&mut grading.hue, -180.0..=180.0).text("Hue"));
    ui.add(egui::Slider::new(&mut grading.saturation, 0.0..=2.0).text("Saturation"));
    ui.add(egui::Slider::new(&mut grading.value, 0.0..=2.0).text("Value"));
    ui.add(egui::Slider::new(&mut grading.vignette, 0.0..=1.0).text("Vignette"));

    ui.separator();
    ui.horizontal(|ui| {
        ui.label("Fog colour");
        ui.color_edit_button_rgb(&mut grading.fog_colour);
    });
    ui.add(egui::Slider::new(&mut grading.fog_start, 0.0..=200.0).text("Fog start"));
    ui.add(egui::Slider::new(&mut grading.fog_strength, 0.0..=1.0).text("Fog strength"));

    ui.separator();
    ui.checkbox(&mut grading.apply_lut, "Apply LUT");
    ui.checkbox(&mut grading.show_lut, "Show LUT");
}

fn animation_section(ui: &mut egui::Ui, settings: &mut Settings) -> Option<usize> {
    let animation = &mut settings.animation;
    let mut play = None;
    ui.horizontal_wrapped(|ui| {
        for (i, clip) in animation.clips.iter().enumerate() {
            if ui.button(&clip.name).clicked() {
                play = Some(i);
            }
        }
    });
    ui.checkbox(&mut animation.render_bones, "Render bones");
    ui.add(egui::Slider::new(&mut animation.time_scale, 0.0..=3.0).text("Time scale"));
    ui.add(egui::Slider::new(&mut animation.transition_time, 0.0..=3.0).text("Transition (s)"));
    play
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_sets_fps_directly() {
        let mut ui = Ui::new();
        assert_eq!(ui.fps(), 0.0);
        ui.tick(0.02);
        assert!((ui.fps() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn frame_time_is_smoothed() {
        let mut ui = Ui::new();
        ui.tick(0.01);
        ui.tick(0.02);
        assert!(ui.fps() < 100.0 && ui.fps() > 50.0);
        ui.tick(0.0);
        assert!(ui.fps() < 100.0 && ui.fps() > 50.0);
    }
}
