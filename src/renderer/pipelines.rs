use crate::model::{SkinVertex, TangentVertex};
use crate::renderer::vertex::{LineVertex, ParticleInstance};

/// Offscreen colour target of the geometry passes.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(
    binding: u32,
    sample_type: wgpu::TextureSampleType,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn float_texture(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        wgpu::TextureSampleType::Float { filterable: true },
        wgpu::TextureViewDimension::D2,
    )
}

fn sampler_entry(binding: u32, ty: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

/// Bind group layouts shared by the pipelines and the resources bound to them.
pub struct Layouts {
    pub camera: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub lights: wgpu::BindGroupLayout,
    pub particles: wgpu::BindGroupLayout,
    pub post: wgpu::BindGroupLayout,
    pub debug: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;

        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[uniform_entry(0, vertex_fragment, false)],
        });
        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, false)],
        });
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT, false),
                float_texture(1),
                float_texture(2),
                sampler_entry(3, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let lights = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lights Bind Group Layout"),
            entries: &[
                uniform_entry(0, vertex_fragment, false),
                texture_entry(
                    1,
                    wgpu::TextureSampleType::Depth,
                    wgpu::TextureViewDimension::D2Array,
                ),
                sampler_entry(2, wgpu::SamplerBindingType::Comparison),
            ],
        });
        let particles = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particles Bind Group Layout"),
            entries: &[uniform_entry(0, vertex_fragment, false)],
        });
        let post = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT, false),
                float_texture(1),
                float_texture(2),
                sampler_entry(3, wgpu::SamplerBindingType::Filtering),
                texture_entry(4, wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::D2),
                float_texture(5),
            ],
        });
        let debug = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Debug Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT, true),
                texture_entry(1, wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::D2),
                texture_entry(
                    2,
                    wgpu::TextureSampleType::Depth,
                    wgpu::TextureViewDimension::D2Array,
                ),
                float_texture(3),
                sampler_entry(4, wgpu::SamplerBindingType::Filtering),
            ],
        });

        Self {
            camera,
            object,
            material,
            lights,
            particles,
            post,
            debug,
        }
    }
}

/// One geometry pipeline's varying parts.
struct GeometryDesc<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    module: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    fragment_entry: Option<&'a str>,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    blend: Option<wgpu::BlendState>,
    topology: wgpu::PrimitiveTopology,
    polygon_mode: wgpu::PolygonMode,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
    depth_bias: wgpu::DepthBiasState,
}

fn geometry_pipeline(device: &wgpu::Device, desc: GeometryDesc) -> wgpu::RenderPipeline {
    let targets = [Some(wgpu::ColorTargetState {
        format: HDR_FORMAT,
        blend: desc.blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: Some(desc.vertex_entry),
            buffers: desc.buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: desc.fragment_entry.map(|entry| wgpu::FragmentState {
            module: desc.module,
            entry_point: Some(entry),
            targets: &targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: desc.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Cw,
            cull_mode: None,
            polygon_mode: desc.polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: desc.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: desc.depth_bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// A static/skinned pair of the same pass.
pub struct MeshPipelines {
    pub static_mesh: wgpu::RenderPipeline,
    pub skinned_mesh: wgpu::RenderPipeline,
}

impl MeshPipelines {
    pub fn get(&self, skinned: bool) -> &wgpu::RenderPipeline {
        if skinned { &self.skinned_mesh } else { &self.static_mesh }
    }
}

pub struct Pipelines {
    pub lit: MeshPipelines,
    pub wireframe: MeshPipelines,
    pub depth: MeshPipelines,
    pub shadow: MeshPipelines,
    pub line: wgpu::RenderPipeline,
    pub particles: wgpu::RenderPipeline,
    pub grade: wgpu::RenderPipeline,
    pub bloom: wgpu::RenderPipeline,
    pub blur_vertical: wgpu::RenderPipeline,
    pub combine: wgpu::RenderPipeline,
    pub blit: wgpu::RenderPipeline,
    pub debug_depth: wgpu::RenderPipeline,
    pub debug_shadow: wgpu::RenderPipeline,
    pub debug_lut: wgpu::RenderPipeline,
}

impl Pipelines {
    /// `wireframe_supported` is false when the adapter lacks line polygon
    /// mode; the wireframe pipelines then draw filled.
    pub fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        surface_format: wgpu::TextureFormat,
        wireframe_supported: bool,
    ) -> Self {
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
        });
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/lines.wgsl").into()),
        });
        let particle_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/particles.wgsl").into()),
        });
        let post_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Post Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/post.wgsl").into()),
        });
        let debug_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Debug Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/debug.wgsl").into()),
        });

        let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lit Pipeline Layout"),
            bind_group_layouts: &[&layouts.camera, &layouts.object, &layouts.material, &layouts.lights],
            push_constant_ranges: &[],
        });
        let depth_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Depth Pipeline Layout"),
            bind_group_layouts: &[&layouts.camera, &layouts.object],
            push_constant_ranges: &[],
        });
        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[&layouts.camera],
            push_constant_ranges: &[],
        });
        let particle_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&layouts.camera, &layouts.particles],
            push_constant_ranges: &[],
        });
        let post_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Post Pipeline Layout"),
            bind_group_layouts: &[&layouts.post],
            push_constant_ranges: &[],
        });
        let debug_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Debug Pipeline Layout"),
            bind_group_layouts: &[&layouts.debug],
            push_constant_ranges: &[],
        });

        let static_buffers = [TangentVertex::desc()];
        let skinned_buffers = [SkinVertex::desc()];
        let mesh_pair = |label: &str,
                         layout: &wgpu::PipelineLayout,
                         entries: (&str, &str),
                         fragment: Option<&str>,
                         polygon_mode: wgpu::PolygonMode,
                         depth_compare: wgpu::CompareFunction,
                         depth_bias: wgpu::DepthBiasState| {
            let build = |skinned: bool| {
                geometry_pipeline(
                    device,
                    GeometryDesc {
                        label: &format!("{} ({})", label, if skinned { "skinned" } else { "static" }),
                        layout,
                        module: &scene_shader,
                        vertex_entry: if skinned { entries.1 } else { entries.0 },
                        fragment_entry: fragment,
                        buffers: if skinned { &skinned_buffers } else { &static_buffers },
                        blend: Some(wgpu::BlendState::REPLACE),
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        polygon_mode,
                        depth_write: true,
                        depth_compare,
                        depth_bias,
                    },
                )
            };
            MeshPipelines {
                static_mesh: build(false),
                skinned_mesh: build(true),
            }
        };

        let wire_mode = if wireframe_supported {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        };
        let lit_entries = ("vs_static", "vs_skinned");
        let depth_entries = ("vs_depth_static", "vs_depth_skinned");

        let lit = mesh_pair(
            "Lit Pipeline",
            &lit_layout,
            lit_entries,
            Some("fs_lit"),
            wgpu::PolygonMode::Fill,
            wgpu::CompareFunction::LessEqual,
            wgpu::DepthBiasState::default(),
        );
        let wireframe = mesh_pair(
            "Wireframe Pipeline",
            &lit_layout,
            lit_entries,
            Some("fs_lit"),
            wire_mode,
            wgpu::CompareFunction::LessEqual,
            wgpu::DepthBiasState::default(),
        );
        let depth = mesh_pair(
            "Depth Pipeline",
            &depth_layout,
            depth_entries,
            None,
            wgpu::PolygonMode::Fill,
            wgpu::CompareFunction::Less,
            wgpu::DepthBiasState::default(),
        );
        let shadow = mesh_pair(
            "Shadow Pipeline",
            &depth_layout,
            depth_entries,
            None,
            wgpu::PolygonMode::Fill,
            wgpu::CompareFunction::Less,
            wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        );

        let line = geometry_pipeline(
            device,
            GeometryDesc {
                label: "Line Pipeline",
                layout: &line_layout,
                module: &line_shader,
                vertex_entry: "vs_line",
                fragment_entry: Some("fs_line"),
                buffers: &[LineVertex::desc()],
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                topology: wgpu::PrimitiveTopology::LineList,
                polygon_mode: wgpu::PolygonMode::Fill,
                // bones stay visible through the mesh
                depth_write: false,
                depth_compare: wgpu::CompareFunction::Always,
                depth_bias: wgpu::DepthBiasState::default(),
            },
        );

        let particles = geometry_pipeline(
            device,
            GeometryDesc {
                label: "Particle Pipeline",
                layout: &particle_layout,
                module: &particle_shader,
                vertex_entry: "vs_particle",
                fragment_entry: Some("fs_particle"),
                buffers: &[ParticleInstance::desc()],
                blend: Some(ADDITIVE),
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                polygon_mode: wgpu::PolygonMode::Fill,
                depth_write: false,
                depth_compare: wgpu::CompareFunction::Less,
                depth_bias: wgpu::DepthBiasState::default(),
            },
        );

        let post = |label: &str, entry: &str, format: wgpu::TextureFormat| {
            fullscreen_pipeline(device, label, &post_layout, &post_shader, entry, format)
        };
        let debug = |label: &str, entry: &str| {
            fullscreen_pipeline(device, label, &debug_layout, &debug_shader, entry, surface_format)
        };

        Self {
            lit,
            wireframe,
            depth,
            shadow,
            line,
            particles,
            grade: post("Colour Grading Pipeline", "fs_grade", HDR_FORMAT),
            bloom: post("Bloom Pipeline", "fs_bloom", HDR_FORMAT),
            blur_vertical: post("Vertical Blur Pipeline", "fs_blur_vertical", HDR_FORMAT),
            combine: post("Combine Pipeline", "fs_combine", surface_format),
            blit: post("Blit Pipeline", "fs_blit", surface_format),
            debug_depth: debug("Depth View Pipeline", "fs_depth"),
            debug_shadow: debug("Shadow Map View Pipeline", "fs_shadow"),
            debug_lut: debug("LUT View Pipeline", "fs_lut"),
        }
    }
}
