use crate::model::{MAX_BONES, Material, Scene, SceneMesh};
use crate::renderer::pipelines::Layouts;
use crate::renderer::textures::GpuTextures;
use crate::texture::{TextureKind, TextureManager};
use nalgebra_glm as glm;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub bones: [[[f32; 4]; 4]; MAX_BONES],
}

impl ObjectUniform {
    fn new(model: &glm::Mat4) -> Self {
        let identity: [[f32; 4]; 4] = glm::Mat4::identity().into();
        Self {
            model: (*model).into(),
            bones: [identity; MAX_BONES],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub colour: [f32; 4],
    /// rgb specular colour, w power
    pub specular: [f32; 4],
    /// has diffuse, has normal map
    pub flags: [f32; 4],
}

impl MaterialUniform {
    pub fn new(material: &Material, has_diffuse: bool, has_normal: bool) -> Self {
        let [r, g, b] = material.colour;
        let [sr, sg, sb] = material.specular_colour;
        Self {
            colour: [r, g, b, 1.0],
            specular: [sr, sg, sb, material.specular_power],
            flags: [
                if has_diffuse { 1.0 } else { 0.0 },
                if has_normal { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

/// One mesh's GPU buffers and bind groups.
pub struct GpuMesh {
    pub name: String,
    pub skinned: bool,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    object_buffer: wgpu::Buffer,
    pub object_bind_group: wgpu::BindGroup,
    material: Material,
    material_buffer: wgpu::Buffer,
    pub material_bind_group: wgpu::BindGroup,
    diffuse_id: Option<usize>,
    normal_id: Option<usize>,
}

impl GpuMesh {
    pub fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        textures: &GpuTextures,
        manager: &mut TextureManager,
        mesh: &SceneMesh,
    ) -> Self {
        let (vertex_bytes, indices, skinned): (&[u8], &[u32], bool) = match mesh {
            SceneMesh::Static(m) => (bytemuck::cast_slice(&m.vertices), &m.indices, false),
            SceneMesh::Skinned(m) => (bytemuck::cast_slice(&m.vertices), &m.indices, true),
        };

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let object_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Object Buffer"),
            contents: bytemuck::bytes_of(&ObjectUniform::new(&glm::Mat4::identity())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let object_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout: &layouts.object,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: object_buffer.as_entire_binding(),
            }],
        });

        let material = mesh.material().clone();
        let diffuse_id = material
            .diffuse_texture
            .as_deref()
            .map(|p| manager.register(p, TextureKind::Diffuse));
        let normal_id = material
            .normal_map
            .as_deref()
            .map(|p| manager.register(p, TextureKind::NormalMap));

        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Buffer"),
            contents: bytemuck::bytes_of(&MaterialUniform::new(&material, false, false)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let material_bind_group =
            material_bind_group(device, layouts, textures, &material_buffer, diffuse_id, normal_id);

        Self {
            name: mesh.name().to_string(),
            skinned,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            object_buffer,
            object_bind_group,
            material,
            material_buffer,
            material_bind_group,
            diffuse_id,
            normal_id,
        }
    }

    pub fn uses_texture(&self, texture_id: usize) -> bool {
        self.diffuse_id == Some(texture_id) || self.normal_id == Some(texture_id)
    }

    /// Rebuilds the material bind group after a texture upload.
    pub fn rebind_textures(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &Layouts,
        textures: &GpuTextures,
    ) {
        let has_diffuse = self.diffuse_id.is_some_and(|id| textures.is_loaded(id));
        let has_normal = self.normal_id.is_some_and(|id| textures.is_loaded(id));
        queue.write_buffer(
            &self.material_buffer,
            0,
            bytemuck::bytes_of(&MaterialUniform::new(&self.material, has_diffuse, has_normal)),
        );
        self.material_bind_group = material_bind_group(
            device,
            layouts,
            textures,
            &self.material_buffer,
            self.diffuse_id,
            self.normal_id,
        );
    }

    pub fn write_model(&self, queue: &wgpu::Queue, model: &glm::Mat4) {
        let m: [[f32; 4]; 4] = (*model).into();
        queue.write_buffer(&self.object_buffer, 0, bytemuck::bytes_of(&m));
    }

    pub fn write_bones(&self, queue: &wgpu::Queue, palette: &[glm::Mat4]) {
        let bones: Vec<[[f32; 4]; 4]> = palette.iter().take(MAX_BONES).map(|m| (*m).into()).collect();
        if bones.is_empty() {
            return;
        }
        let offset = size_of::<[[f32; 4]; 4]>() as wgpu::BufferAddress;
        queue.write_buffer(&self.object_buffer, offset, bytemuck::cast_slice(&bones));
    }

    /// Binds vertex, index and object data and draws; camera, material and
    /// light groups are the caller's.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_bind_group(1, &self.object_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

fn material_bind_group(
    device: &wgpu::Device,
    layouts: &Layouts,
    textures: &GpuTextures,
    material_buffer: &wgpu::Buffer,
    diffuse_id: Option<usize>,
    normal_id: Option<usize>,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material Bind Group"),
        layout: &layouts.material,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: material_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(
                    textures.view(diffuse_id, TextureKind::Diffuse),
                ),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(
                    textures.view(normal_id, TextureKind::NormalMap),
                ),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&textures.sampler),
            },
        ],
    })
}

/// GPU side of an imported scene with its world matrix.
pub struct GpuScene {
    pub name: String,
    pub meshes: Vec<GpuMesh>,
}

impl GpuScene {
    pub fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        textures: &GpuTextures,
        manager: &mut TextureManager,
        scene: &Scene,
    ) -> Self {
        let meshes = scene
            .meshes
            .iter()
            .filter(|m| m.index_count() > 0)
            .map(|m| GpuMesh::new(device, layouts, textures, manager, m))
            .collect();
        Self {
            name: scene.name.clone(),
            meshes,
        }
    }

    /// Writes the world matrix and, for skinned meshes, the current palette.
    pub fn update(&self, queue: &wgpu::Queue, scene: &Scene, world: &glm::Mat4) {
        let uploaded = scene.meshes.iter().filter(|m| m.index_count() > 0);
        for (gpu, mesh) in self.meshes.iter().zip(uploaded) {
            gpu.write_model(queue, world);
            if let (SceneMesh::Skinned(m), Some(skeleton)) = (mesh, scene.skeleton.as_ref()) {
                gpu.write_bones(queue, &m.bone_palette(skeleton));
            }
        }
    }

    pub fn rebind_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &Layouts,
        textures: &GpuTextures,
        texture_id: usize,
    ) {
        for mesh in self.meshes.iter_mut().filter(|m| m.uses_texture(texture_id)) {
            mesh.rebind_textures(device, queue, layouts, textures);
        }
    }
}
