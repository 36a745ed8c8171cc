use crate::renderer::pipelines::{DEPTH_FORMAT, HDR_FORMAT, Layouts};
use crate::renderer::textures::upload_rgba;
use crate::settings::{BloomSettings, GradingSettings, MAX_BLUR_DISTANCE};

/// Bloom targets are rendered at this fraction of the window size.
pub const BLOOM_SCALE: f32 = 0.7;

/// Debug overlay slots; each draw reads its own 256-byte aligned uniform.
pub const DEBUG_SLOTS: usize = 16;
const DEBUG_STRIDE: wgpu::BufferAddress = 256;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniform {
    /// exposure, brightness, contrast, hue in degrees
    pub grade: [f32; 4],
    /// saturation, value, vignette, tonemapping
    pub tone: [f32; 4],
    /// rgb fog colour, fog strength
    pub fog: [f32; 4],
    /// fog start, near, far, apply lut
    pub depth: [f32; 4],
    /// threshold, intensity, blur distance in pixels, unused
    pub bloom: [f32; 4],
}

fn flag(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

impl PostUniform {
    pub fn new(grading: &GradingSettings, bloom: &BloomSettings, near: f32, far: f32) -> Self {
        let [fr, fg, fb] = grading.fog_colour;
        Self {
            grade: [grading.exposure, grading.brightness, grading.contrast, grading.hue],
            tone: [
                grading.saturation,
                grading.value,
                grading.vignette,
                flag(grading.tonemapping),
            ],
            fog: [fr, fg, fb, grading.fog_strength.clamp(0.0, 1.0)],
            depth: [grading.fog_start, near, far, flag(grading.apply_lut)],
            bloom: [
                bloom.threshold,
                bloom.intensity,
                bloom.distance.min(MAX_BLUR_DISTANCE) as f32,
                0.0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct DebugUniform {
    /// layer, near, far, unused
    params: [f32; 4],
}

fn render_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

pub fn bloom_size(width: u32, height: u32) -> (u32, u32) {
    let scale = |v: u32| ((v as f32 * BLOOM_SCALE) as u32).max(1);
    (scale(width), scale(height))
}

/// Window-sized offscreen targets.
pub struct PostTargets {
    pub hdr: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    pub graded: wgpu::TextureView,
    pub bloom_a: wgpu::TextureView,
    pub bloom_b: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl PostTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (bw, bh) = bloom_size(width, height);
        Self {
            hdr: render_target(device, "HDR Target", width, height, HDR_FORMAT),
            depth: render_target(device, "Scene Depth", width, height, DEPTH_FORMAT),
            graded: render_target(device, "Graded Target", width, height, HDR_FORMAT),
            bloom_a: render_target(device, "Bloom Target A", bw, bh, HDR_FORMAT),
            bloom_b: render_target(device, "Bloom Target B", bw, bh, HDR_FORMAT),
            width,
            height,
        }
    }
}

/// Bind groups for a post chain that starts from one source image.
pub struct SourceGroups {
    pub bloom: wgpu::BindGroup,
    pub combine: wgpu::BindGroup,
    pub blit: wgpu::BindGroup,
}

/// Post-processing resources: targets, the grading LUT, the uniform and the
/// bind groups wiring them together, plus the debug overlay group.
pub struct PostChain {
    pub targets: PostTargets,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    lut: wgpu::TextureView,
    pub grade: wgpu::BindGroup,
    /// Bloom pass two: blurs `bloom_a` into `bloom_b`.
    pub blur: wgpu::BindGroup,
    pub from_graded: SourceGroups,
    pub from_hdr: SourceGroups,
    debug_buffer: wgpu::Buffer,
    pub debug: wgpu::BindGroup,
}

impl PostChain {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &Layouts,
        width: u32,
        height: u32,
        lut: (&[u8], u32, u32),
        shadow_array: &wgpu::TextureView,
    ) -> Self {
        let targets = PostTargets::new(device, width, height);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Post Uniform Buffer"),
            size: size_of::<PostUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let (data, lw, lh) = lut;
        let lut = upload_rgba(device, queue, "Grading LUT", data, lw, lh, wgpu::TextureFormat::Rgba8Unorm);
        let debug_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Debug Uniform Buffer"),
            size: DEBUG_STRIDE * DEBUG_SLOTS as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let groups = Groups::new(
            device,
            layouts,
            &targets,
            &uniform_buffer,
            &sampler,
            &lut,
            &debug_buffer,
            shadow_array,
        );
        Self {
            targets,
            uniform_buffer,
            sampler,
            lut,
            grade: groups.grade,
            blur: groups.blur,
            from_graded: groups.from_graded,
            from_hdr: groups.from_hdr,
            debug_buffer,
            debug: groups.debug,
        }
    }

    /// Recreates the targets when the window size changed and rebinds
    /// everything that reads them.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        layouts: &Layouts,
        width: u32,
        height: u32,
        shadow_array: &wgpu::TextureView,
    ) {
        if width != self.targets.width || height != self.targets.height {
            self.targets = PostTargets::new(device, width, height);
        }
        self.rebind(device, layouts, shadow_array);
    }

    /// Rebuilds the bind groups, e.g. after the shadow maps were recreated.
    pub fn rebind(&mut self, device: &wgpu::Device, layouts: &Layouts, shadow_array: &wgpu::TextureView) {
        let groups = Groups::new(
            device,
            layouts,
            &self.targets,
            &self.uniform_buffer,
            &self.sampler,
            &self.lut,
            &self.debug_buffer,
            shadow_array,
        );
        self.grade = groups.grade;
        self.blur = groups.blur;
        self.from_graded = groups.from_graded;
        self.from_hdr = groups.from_hdr;
        self.debug = groups.debug;
    }

    pub fn write_uniform(&self, queue: &wgpu::Queue, uniform: &PostUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Writes the parameters of overlay `slot` and returns its dynamic offset.
    pub fn write_debug(&self, queue: &wgpu::Queue, slot: usize, layer: u32, near: f32, far: f32) -> u32 {
        let slot = slot.min(DEBUG_SLOTS - 1);
        let offset = DEBUG_STRIDE * slot as wgpu::BufferAddress;
        let uniform = DebugUniform {
            params: [layer as f32, near, far, 0.0],
        };
        queue.write_buffer(&self.debug_buffer, offset, bytemuck::bytes_of(&uniform));
        offset as u32
    }
}

struct Groups {
    grade: wgpu::BindGroup,
    blur: wgpu::BindGroup,
    from_graded: SourceGroups,
    from_hdr: SourceGroups,
    debug: wgpu::BindGroup,
}

impl Groups {
    #[allow(clippy::too_many_arguments)]
    fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        targets: &PostTargets,
        uniform_buffer: &wgpu::Buffer,
        sampler: &wgpu::Sampler,
        lut: &wgpu::TextureView,
        debug_buffer: &wgpu::Buffer,
        shadow_array: &wgpu::TextureView,
    ) -> Self {
        let post_group = |label: &str, source: &wgpu::TextureView, second: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &layouts.post,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(second),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::TextureView(&targets.depth),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: wgpu::BindingResource::TextureView(lut),
                    },
                ],
            })
        };
        let source_groups = |source: &wgpu::TextureView| SourceGroups {
            bloom: post_group("Bloom Bind Group", source, source),
            combine: post_group("Combine Bind Group", source, &targets.bloom_b),
            blit: post_group("Blit Bind Group", source, source),
        };

        let debug = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Debug Bind Group"),
            layout: &layouts.debug,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: debug_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(size_of::<DebugUniform>() as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.depth),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(shadow_array),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(lut),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Self {
            grade: post_group("Colour Grading Bind Group", &targets.hdr, &targets.hdr),
            blur: post_group("Vertical Blur Bind Group", &targets.bloom_a, &targets.bloom_a),
            from_graded: source_groups(&targets.graded),
            from_hdr: source_groups(&targets.hdr),
            debug,
        }
    }
}
