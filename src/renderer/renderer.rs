use crate::error::DemoError;
use crate::model::Scene;
use crate::renderer::camera::CameraUniform;
use crate::renderer::gpu_mesh::GpuScene;
use crate::renderer::light::LightRig;
use crate::renderer::particles::ParticleSystem;
use crate::renderer::pipelines::{Layouts, Pipelines};
use crate::renderer::post::{PostChain, PostUniform};
use crate::renderer::shadow::ShadowMaps;
use crate::renderer::textures::GpuTextures;
use crate::renderer::vertex::LineVertex;
use crate::settings::Settings;
use crate::texture::{TextureKind, TextureManager};
use nalgebra_glm as glm;
use std::collections::HashMap;
use std::sync::Arc;

const BONE_COLOUR: [f32; 3] = [1.0, 0.9, 0.2];

/// Which of the two loaded scenes an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneSlot {
    Scene,
    Character,
}

pub struct Renderer {
    pub(crate) surface: wgpu::Surface<'static>,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) config: wgpu::SurfaceConfiguration,
    pub(crate) layouts: Layouts,
    pub(crate) pipelines: Pipelines,
    pub wireframe_supported: bool,
    pub(crate) camera_buffer: wgpu::Buffer,
    pub(crate) camera_bind_group: wgpu::BindGroup,
    pub(crate) textures: GpuTextures,
    pub(crate) shadows: ShadowMaps,
    pub(crate) post: PostChain,
    pub(crate) particles: ParticleSystem,
    pub(crate) scene: Option<GpuScene>,
    pub(crate) character: Option<GpuScene>,
    pub(crate) bone_buffer: wgpu::Buffer,
    pub(crate) num_bone_vertices: u32,
    pub(crate) egui_renderer: egui_wgpu::Renderer,
    egui_ctx: egui::Context,
    egui_textures: HashMap<usize, egui::TextureId>,
}

impl Renderer {
    pub async fn new(window: &Arc<winit::window::Window>, settings: &Settings) -> Result<Self, DemoError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let wireframe_supported = adapter.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        if !wireframe_supported {
            log::warn!("adapter has no line polygon mode, wireframe draws filled");
        }
        let required_features = if wireframe_supported {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features,
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: wgpu::MemoryHints::default(),
                ..Default::default()
            })
            .await?;
        log::info!("GPU adapter: {}", adapter.get_info().name);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| DemoError::new("surface-format").with_arg("reason", "no supported formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, &layouts, surface_format, wireframe_supported);

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: size_of::<CameraUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let textures = GpuTextures::new(&device, &queue);
        let shadows = ShadowMaps::new(&device, &layouts, settings.lighting.shadow_map_resolution);
        let (lut_data, lut_w, lut_h) = crate::texture::loader::load_lut(&settings.assets.lut_path());
        let post = PostChain::new(
            &device,
            &queue,
            &layouts,
            config.width,
            config.height,
            (&lut_data, lut_w, lut_h),
            shadows.array_view(),
        );
        let particles = ParticleSystem::new(&device, &layouts, &settings.particles);

        let bone_buffer = line_buffer(&device, 64);

        let egui_ctx = egui::Context::default();
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, Default::default());

        Ok(Self {
            surface,
            device,
            queue,
            config,
            layouts,
            pipelines,
            wireframe_supported,
            camera_buffer,
            camera_bind_group,
            textures,
            shadows,
            post,
            particles,
            scene: None,
            character: None,
            bone_buffer,
            num_bone_vertices: 0,
            egui_renderer,
            egui_ctx,
            egui_textures: HashMap::new(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.post.resize(
                &self.device,
                &self.layouts,
                new_size.width,
                new_size.height,
                self.shadows.array_view(),
            );
        }
    }

    pub fn egui_context(&self) -> egui::Context {
        self.egui_ctx.clone()
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    /// Creates GPU buffers for a freshly imported scene, registering its
    /// textures with the manager.
    pub fn upload_scene(&mut self, slot: SceneSlot, scene: &Scene, manager: &mut TextureManager) {
        manager.add_search_dir(&scene.folder_path);
        let gpu = GpuScene::new(&self.device, &self.layouts, &self.textures, manager, scene);
        log::info!("uploaded '{}': {} meshes", gpu.name, gpu.meshes.len());
        match slot {
            SceneSlot::Scene => self.scene = Some(gpu),
            SceneSlot::Character => self.character = Some(gpu),
        }
    }

    /// Writes the world matrix and current skinning palette of a scene.
    pub fn update_scene(&self, slot: SceneSlot, scene: &Scene, world: &glm::Mat4) {
        let gpu = match slot {
            SceneSlot::Scene => self.scene.as_ref(),
            SceneSlot::Character => self.character.as_ref(),
        };
        if let Some(gpu) = gpu {
            gpu.update(&self.queue, scene, world);
        }
    }

    /// Uploads a decoded texture and rebinds every mesh that samples it.
    pub fn load_texture_from_rgba(
        &mut self,
        texture_id: usize,
        kind: TextureKind,
        rgba_data: &[u8],
        width: u32,
        height: u32,
    ) {
        self.textures
            .load_rgba(&self.device, &self.queue, texture_id, kind, rgba_data, width, height);
        for gpu in [self.scene.as_mut(), self.character.as_mut()].into_iter().flatten() {
            gpu.rebind_texture(&self.device, &self.queue, &self.layouts, &self.textures, texture_id);
        }
        if let Some(old) = self.egui_textures.remove(&texture_id) {
            self.egui_renderer.free_texture(&old);
        }
    }

    /// Get egui TextureId for a loaded texture
    pub fn get_egui_texture_id(&mut self, texture_id: usize) -> Option<egui::TextureId> {
        if let Some(id) = self.egui_textures.get(&texture_id) {
            return Some(*id);
        }
        if !self.textures.is_loaded(texture_id) {
            return None;
        }
        let view = self.textures.view(Some(texture_id), TextureKind::Diffuse);
        let egui_texture_id =
            self.egui_renderer
                .register_native_texture(&self.device, view, wgpu::FilterMode::Linear);
        self.egui_textures.insert(texture_id, egui_texture_id);
        Some(egui_texture_id)
    }

    /// Replaces the skeleton debug lines, one segment per parent/child pair,
    /// already in world space.
    pub fn update_bone_lines(&mut self, lines: &[(glm::Vec3, glm::Vec3)]) {
        let vertices: Vec<LineVertex> = lines
            .iter()
            .flat_map(|(a, b)| {
                [
                    LineVertex {
                        position: [a.x, a.y, a.z],
                        color: BONE_COLOUR,
                    },
                    LineVertex {
                        position: [b.x, b.y, b.z],
                        color: BONE_COLOUR,
                    },
                ]
            })
            .collect();
        let needed = (vertices.len() * size_of::<LineVertex>()) as wgpu::BufferAddress;
        if needed > self.bone_buffer.size() {
            self.bone_buffer = line_buffer(&self.device, vertices.len());
        }
        if !vertices.is_empty() {
            self.queue
                .write_buffer(&self.bone_buffer, 0, bytemuck::cast_slice(&vertices));
        }
        self.num_bone_vertices = vertices.len() as u32;
    }

    /// Recreates the shadow maps when the requested size changed.
    pub fn set_shadow_resolution(&mut self, resolution: u32) {
        if self.shadows.resize(&self.device, &self.layouts, resolution) {
            self.post
                .rebind(&self.device, &self.layouts, self.shadows.array_view());
        }
    }

    pub fn shadow_resolution(&self) -> u32 {
        self.shadows.resolution()
    }

    /// Writes the per-frame uniforms: camera, lights and their shadow
    /// cameras, post-processing and particles.
    pub fn prepare(&self, camera: &CameraUniform, lights: &LightRig, settings: &Settings) {
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(camera));
        let lighting = &settings.lighting;
        self.shadows.update(
            &self.queue,
            lights,
            lighting.shadow_bias,
            lighting.show_out_of_range,
            lighting.apply_lighting,
        );
        let [near, far] = [camera.params[0], camera.params[1]];
        self.post.write_uniform(
            &self.queue,
            &PostUniform::new(&settings.grading, &settings.bloom, near, far),
        );
        self.particles.write_uniform(&self.queue, &settings.particles);
    }
}

fn line_buffer(device: &wgpu::Device, vertices: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Bone Line Buffer"),
        size: (vertices.max(2) * size_of::<LineVertex>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
