use crate::renderer::camera::CameraUniform;
use crate::renderer::light::{LightRig, LightsUniform, MAX_LIGHTS};
use crate::renderer::pipelines::{DEPTH_FORMAT, Layouts};

pub const DEFAULT_SHADOW_RESOLUTION: u32 = 1024;
pub const SHADOW_RESOLUTIONS: [u32; 5] = [256, 512, 1024, 2048, 4096];

/// Snaps a configured resolution to the closest supported size.
pub fn valid_resolution(resolution: u32) -> u32 {
    SHADOW_RESOLUTIONS
        .iter()
        .copied()
        .min_by_key(|r| r.abs_diff(resolution))
        .unwrap_or(DEFAULT_SHADOW_RESOLUTION)
}

struct ShadowTexture {
    array_view: wgpu::TextureView,
    layer_views: Vec<wgpu::TextureView>,
}

impl ShadowTexture {
    fn new(device: &wgpu::Device, resolution: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Maps"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: MAX_LIGHTS as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Shadow Map Array View"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let layer_views = (0..MAX_LIGHTS as u32)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Shadow Map Layer View"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        Self {
            array_view,
            layer_views,
        }
    }
}

/// One depth layer per light slot, the light uniform and the group that
/// binds both for the lit pass.
pub struct ShadowMaps {
    resolution: u32,
    texture: ShadowTexture,
    sampler: wgpu::Sampler,
    lights_buffer: wgpu::Buffer,
    pub lights_bind_group: wgpu::BindGroup,
    camera_buffers: Vec<wgpu::Buffer>,
    camera_bind_groups: Vec<wgpu::BindGroup>,
}

impl ShadowMaps {
    pub fn new(device: &wgpu::Device, layouts: &Layouts, resolution: u32) -> Self {
        let resolution = valid_resolution(resolution);
        let texture = ShadowTexture::new(device, resolution);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lights Buffer"),
            size: size_of::<LightsUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights_bind_group = lights_bind_group(device, layouts, &lights_buffer, &texture, &sampler);

        let mut camera_buffers = Vec::with_capacity(MAX_LIGHTS);
        let mut camera_bind_groups = Vec::with_capacity(MAX_LIGHTS);
        for _ in 0..MAX_LIGHTS {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Shadow Camera Buffer"),
                size: size_of::<CameraUniform>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            camera_bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Shadow Camera Bind Group"),
                layout: &layouts.camera,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            }));
            camera_buffers.push(buffer);
        }

        Self {
            resolution,
            texture,
            sampler,
            lights_buffer,
            lights_bind_group,
            camera_buffers,
            camera_bind_groups,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Recreates the depth layers at a new size. Returns whether anything
    /// changed, in which case views bound elsewhere must be rebuilt.
    pub fn resize(&mut self, device: &wgpu::Device, layouts: &Layouts, resolution: u32) -> bool {
        let resolution = valid_resolution(resolution);
        if resolution == self.resolution {
            return false;
        }
        log::info!("shadow maps resized to {}x{}", resolution, resolution);
        self.resolution = resolution;
        self.texture = ShadowTexture::new(device, resolution);
        self.lights_bind_group =
            lights_bind_group(device, layouts, &self.lights_buffer, &self.texture, &self.sampler);
        true
    }

    /// Writes the light uniform and each shadowed light's camera.
    pub fn update(
        &self,
        queue: &wgpu::Queue,
        rig: &LightRig,
        shadow_bias: f32,
        show_out_of_range: bool,
        apply_lighting: bool,
    ) {
        let uniform = rig.uniform(shadow_bias, show_out_of_range, apply_lighting);
        queue.write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(&uniform));

        for (light, buffer) in rig.lights.iter().zip(&self.camera_buffers) {
            if !light.has_shadow() {
                continue;
            }
            let camera = CameraUniform {
                view_proj: light.view_proj().into(),
                view: light.view().into(),
                position: [light.position[0], light.position[1], light.position[2], 1.0],
                params: [0.0; 4],
            };
            queue.write_buffer(buffer, 0, bytemuck::bytes_of(&camera));
        }
    }

    pub fn array_view(&self) -> &wgpu::TextureView {
        &self.texture.array_view
    }

    pub fn layer_view(&self, index: usize) -> Option<&wgpu::TextureView> {
        self.texture.layer_views.get(index)
    }

    pub fn camera_bind_group(&self, index: usize) -> Option<&wgpu::BindGroup> {
        self.camera_bind_groups.get(index)
    }
}

fn lights_bind_group(
    device: &wgpu::Device,
    layouts: &Layouts,
    lights_buffer: &wgpu::Buffer,
    texture: &ShadowTexture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Lights Bind Group"),
        layout: &layouts.lights,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: lights_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.array_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
