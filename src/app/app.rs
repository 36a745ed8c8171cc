use crate::animation::find_clip;
use crate::error::DemoError;
use crate::model::{ImportArgs, Scene, SceneMesh};
use crate::renderer::camera::{CameraController, CameraState};
use crate::renderer::{LightKind, LightRig, Renderer, SceneSlot};
use crate::settings::{AssetSettings, Settings};
use crate::texture::loader::TextureLoadResult;
use crate::texture::manager::{TextureManager, TextureStatus};
use crate::texture::panel::TexturePanel;
use crate::ui::{Ui, UiActions};
use super::lamp::LampBlink;
use egui_wgpu::ScreenDescriptor;
use egui_winit::State;
use nalgebra_glm as glm;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::Window;

/// Trackpad pixels per scroll line.
const PIXELS_PER_LINE: f32 = 20.0;

pub struct EventResponse {
    pub repaint: bool,
    pub exit: bool,
}

impl EventResponse {
    fn none() -> Self {
        Self {
            repaint: false,
            exit: false,
        }
    }
}

/// Walks the character around a point in the street: offset 3 units, turned
/// by `yaw` about y, then placed at (-10, 0, -2.5). The character is imported
/// without the z mirror, so it is mirrored here.
pub fn character_world(yaw: f32) -> glm::Mat4 {
    let place = glm::translation(&glm::vec3(-10.0, 0.0, -2.5));
    let turn = glm::rotation(yaw, &glm::vec3(0.0, 1.0, 0.0));
    let offset = glm::translation(&glm::vec3(-3.0, 0.0, 0.0));
    let mirror = glm::scaling(&glm::vec3(1.0, 1.0, -1.0));
    place * turn * offset * mirror
}

/// Forces the configured normal map and specular colour onto the first mesh.
pub fn dress_character(meshes: &mut [SceneMesh], assets: &AssetSettings) {
    let Some(mesh) = meshes.first_mut() else {
        return;
    };
    let material = mesh.material_mut();
    if let Some(normal_map) = &assets.character_normal_map {
        material.normal_map = Some(assets.resource_dir.join(normal_map));
    }
    material.specular_colour = assets.character_specular;
}

pub struct App {
    pub window: Arc<Window>,
    ui: Ui,
    renderer: Renderer,
    camera_controller: CameraController,
    egui_state: State,
    egui_wants_pointer: bool,
    egui_wants_keyboard: bool,
    texture_panel: TexturePanel,
    pub(crate) texture_manager: TextureManager,
    pub(crate) texture_sender: UnboundedSender<TextureLoadResult>,
    texture_receiver: UnboundedReceiver<TextureLoadResult>,
    pub(crate) runtime: tokio::runtime::Handle,
    settings: Settings,
    lights: LightRig,
    scene: Option<Scene>,
    character: Option<Scene>,
    character_yaw: f32,
    lamp: LampBlink,
    last_frame: Instant,
}

impl App {
    pub async fn new(
        event_loop: &ActiveEventLoop,
        runtime: tokio::runtime::Handle,
        resource_dir: Option<PathBuf>,
    ) -> Result<Self, DemoError> {
        let mut settings = Settings::load();
        if let Some(dir) = resource_dir {
            log::info!("resource directory: {}", dir.display());
            settings.assets.resource_dir = dir;
        }

        let window_attrs = Window::default_attributes()
            .with_title("FBX Demo")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                settings.display.window_width.max(320),
                settings.display.window_height.max(240),
            ));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let renderer = Renderer::new(&window, &settings).await?;

        let egui_ctx = renderer.egui_context();
        egui_ctx.options_mut(|options| {
            options.max_passes = std::num::NonZeroUsize::MIN.saturating_add(1);
        });
        let egui_state = State::new(
            egui_ctx,
            egui::viewport::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        let camera_controller =
            CameraController::new(CameraState::default(), settings.display.camera_speed);
        let (texture_sender, texture_receiver) = unbounded_channel();

        Ok(Self {
            window,
            ui: Ui::new(),
            renderer,
            camera_controller,
            egui_state,
            egui_wants_pointer: false,
            egui_wants_keyboard: false,
            texture_panel: TexturePanel::new(),
            texture_manager: TextureManager::new(),
            texture_sender,
            texture_receiver,
            runtime,
            settings,
            lights: LightRig::default(),
            scene: None,
            character: None,
            character_yaw: 0.0,
            lamp: LampBlink::new(),
            last_frame: Instant::now(),
        })
    }

    /// Imports the street scene and the character. A file that fails to load
    /// is logged and left out.
    pub fn load_scenes(&mut self) {
        let assets = self.settings.assets.clone();

        match Scene::load(&assets.scene_path(), &ImportArgs::default()) {
            Ok(scene) => {
                self.renderer
                    .upload_scene(SceneSlot::Scene, &scene, &mut self.texture_manager);
                self.scene = Some(scene);
            }
            Err(e) => log::error!("scene not loaded: {}", e),
        }

        let args = ImportArgs {
            invert_z_scale: false,
            ..ImportArgs::default()
        };
        match Scene::load(&assets.character_path(), &args) {
            Ok(mut character) => {
                dress_character(&mut character.meshes, &assets);
                self.renderer
                    .upload_scene(SceneSlot::Character, &character, &mut self.texture_manager);
                let animation = &self.settings.animation;
                match find_clip(&animation.clips, &animation.initial_clip) {
                    Some(clip) => {
                        character.transition_to(clip.to_animation(character.frame_rate), 0.0)
                    }
                    None => log::warn!("initial clip '{}' not in clip table", animation.initial_clip),
                }
                self.character = Some(character);
            }
            Err(e) => log::error!("character not loaded: {}", e),
        }

        let pending: Vec<usize> = self
            .texture_manager
            .textures
            .iter()
            .filter(|t| t.status == TextureStatus::NotLoaded)
            .map(|t| t.texture_id)
            .collect();
        log::info!("loading {} textures", pending.len());
        for texture_id in pending {
            self.start_texture_load(texture_id);
        }
        self.last_frame = Instant::now();
    }

    pub fn handle_event(&mut self, event: &WindowEvent) -> EventResponse {
        let egui_response = self.egui_state.on_window_event(&self.window, event);
        let egui_repaint = EventResponse {
            repaint: egui_response.repaint,
            exit: false,
        };

        match event {
            WindowEvent::CloseRequested => {
                self.settings.save();
                return EventResponse {
                    repaint: false,
                    exit: true,
                };
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return egui_repaint;
                };
                let pressed = event.state == ElementState::Pressed;
                // releases always reach the camera so keys never stick
                if pressed && (egui_response.consumed || self.egui_wants_keyboard) {
                    return egui_repaint;
                }
                match code {
                    KeyCode::Escape if pressed => {
                        self.settings.save();
                        return EventResponse {
                            repaint: false,
                            exit: true,
                        };
                    }
                    KeyCode::Tab if pressed && !event.repeat => {
                        self.settings.ui.show_ui = !self.settings.ui.show_ui;
                    }
                    _ => {
                        self.camera_controller.on_key(code, pressed);
                    }
                }
            }
            WindowEvent::Resized(size) => {
                self.renderer.resize(*size);
                if size.width > 0 && size.height > 0 {
                    self.settings.display.window_width = size.width;
                    self.settings.display.window_height = size.height;
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                if pressed && self.egui_wants_pointer {
                    return egui_repaint;
                }
                self.camera_controller.on_mouse_button(*button, pressed);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.camera_controller
                    .on_modifiers(modifiers.state().shift_key(), modifiers.state().alt_key());
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.egui_wants_pointer {
                    return egui_repaint;
                }
                self.camera_controller.on_mouse_move((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if self.egui_wants_pointer {
                    return egui_repaint;
                }
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.camera_controller.on_scroll(lines);
            }
            _ => {}
        }

        EventResponse::none()
    }

    /// Reconfigures the surface at the current window size.
    pub fn reconfigure(&mut self) {
        self.renderer.resize(self.window.inner_size());
    }

    fn drain_texture_results(&mut self) {
        while let Ok(result) = self.texture_receiver.try_recv() {
            match result {
                TextureLoadResult::Success {
                    texture_id,
                    rgba_data,
                    width,
                    height,
                } => {
                    let Some(info) = self.texture_manager.get_texture_mut(texture_id) else {
                        continue;
                    };
                    self.renderer
                        .load_texture_from_rgba(texture_id, info.kind, &rgba_data, width, height);
                    info.status = TextureStatus::Loaded;
                    info.width = width;
                    info.height = height;
                    log::debug!("texture {} loaded ({}x{})", texture_id, width, height);
                }
                TextureLoadResult::Error { texture_id, error } => {
                    log::warn!("texture {} failed: {}", texture_id, error);
                    if let Some(info) = self.texture_manager.get_texture_mut(texture_id) {
                        if !info.is_loaded() {
                            info.status = TextureStatus::Error(error);
                        }
                    }
                }
            }
        }
    }

    fn play_clip(&mut self, index: usize) {
        let animation = &self.settings.animation;
        let (Some(clip), Some(character)) = (animation.clips.get(index), self.character.as_mut())
        else {
            return;
        };
        log::info!("playing '{}'", clip.name);
        character.transition_to(
            clip.to_animation(character.frame_rate),
            animation.transition_time.max(0.0),
        );
    }

    /// Advances the demo by the time since the last frame.
    fn update(&mut self, dt: f32) {
        let scaled = dt * self.settings.animation.time_scale.max(0.0);
        if let Some(character) = self.character.as_mut() {
            character.update(scaled);
        }
        self.renderer.particles.step(scaled);

        if let Some(on) = self.lamp.update(dt, &mut rand::thread_rng()) {
            if let Some(lamp) = self.lights.lights.get_mut(0) {
                lamp.kind = if on { LightKind::Spot } else { LightKind::Inactive };
            }
        }
        self.character_yaw -= dt;

        self.camera_controller.speed = self.settings.display.camera_speed;
        self.camera_controller.update(dt);
    }

    fn upload_frame(&mut self) {
        let camera = self.camera_controller.state_mut();
        camera.fov = self.settings.display.fov;
        camera.far_plane = self.settings.display.far_plane;
        let uniform = camera.uniform(
            self.renderer.aspect(),
            self.renderer.particles.time,
            self.settings.lighting.normal_mapping,
        );

        self.renderer
            .set_shadow_resolution(self.settings.lighting.shadow_map_resolution);
        self.settings.lighting.shadow_map_resolution = self.renderer.shadow_resolution();
        self.renderer.prepare(&uniform, &self.lights, &self.settings);

        if let Some(scene) = &self.scene {
            self.renderer
                .update_scene(SceneSlot::Scene, scene, &glm::identity());
        }
        let world = character_world(self.character_yaw);
        let mut bone_lines = Vec::new();
        if let Some(character) = &self.character {
            self.renderer
                .update_scene(SceneSlot::Character, character, &world);
            if self.settings.animation.render_bones {
                if let Some(skeleton) = &character.skeleton {
                    let to_world = |p: &glm::Vec3| (world * glm::vec4(p.x, p.y, p.z, 1.0)).xyz();
                    bone_lines = skeleton
                        .bone_lines()
                        .iter()
                        .map(|(a, b)| (to_world(a), to_world(b)))
                        .collect();
                }
            }
        }
        self.renderer.update_bone_lines(&bone_lines);
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.drain_texture_results();

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.ui.tick(dt);
        self.update(dt);

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let egui_ctx = self.renderer.egui_context();
        let show_ui = self.settings.ui.show_ui;
        let wireframe_supported = self.renderer.wireframe_supported;

        let mut actions = UiActions::default();
        let mut texture_load_requests: Vec<usize> = Vec::new();

        let full_output = egui_ctx.run(raw_input, |ctx| {
            if !show_ui {
                return;
            }
            actions = self.ui.show(
                ctx,
                &mut self.settings,
                &mut self.lights,
                self.camera_controller.state_mut(),
                wireframe_supported,
            );
            if let Some(requests) = self.texture_panel.show(
                ctx,
                &self.texture_manager,
                &mut self.renderer,
                &mut self.settings.ui.show_texture_panel,
            ) {
                texture_load_requests = requests;
            }
        });

        self.egui_wants_pointer = egui_ctx.wants_pointer_input();
        self.egui_wants_keyboard = egui_ctx.wants_keyboard_input();

        for texture_id in texture_load_requests {
            self.start_texture_load(texture_id);
        }
        if actions.reset_camera {
            self.camera_controller.reset();
        }
        if let Some(index) = actions.play_clip {
            self.play_clip(index);
        }

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);
        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let size = self.window.inner_size();
        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        self.upload_frame();

        self.renderer.render(
            &self.settings,
            &self.lights,
            paint_jobs,
            full_output.textures_delta,
            screen_descriptor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn apply(m: &glm::Mat4, p: glm::Vec3) -> glm::Vec3 {
        (m * glm::vec4(p.x, p.y, p.z, 1.0)).xyz()
    }

    #[test]
    fn character_starts_three_units_left_of_pivot() {
        let p = apply(&character_world(0.0), glm::vec3(0.0, 0.0, 0.0));
        assert!((p - glm::vec3(-13.0, 0.0, -2.5)).norm() < EPSILON);
    }

    #[test]
    fn character_circles_the_pivot() {
        let pivot = glm::vec3(-10.0, 0.0, -2.5);
        for yaw in [0.5f32, 1.0, 2.0, -3.0] {
            let p = apply(&character_world(yaw), glm::vec3(0.0, 0.0, 0.0));
            assert!(((p - pivot).norm() - 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn character_model_is_mirrored_in_z() {
        let m = character_world(0.0);
        let p = apply(&m, glm::vec3(0.0, 0.0, 1.0));
        assert!((p - glm::vec3(-13.0, 0.0, -3.5)).norm() < EPSILON);
    }

    #[test]
    fn dressing_sets_normal_map_and_specular() {
        use crate::model::{Material, MeshData};
        let mut meshes = vec![SceneMesh::Static(MeshData {
            name: "body".to_string(),
            vertices: Vec::new(),
            indices: Vec::new(),
            material: Material::default(),
        })];
        dress_character(&mut meshes, &AssetSettings::default());
        let material = meshes[0].material();
        assert_eq!(material.normal_map, Some(PathBuf::from("res/normalmap.png")));
        assert_eq!(material.specular_colour, [5.0, 5.0, 5.0]);
    }
}
