use crate::texture::TextureKind;
use std::collections::HashMap;

/// Uploaded material textures keyed by texture id, with 1x1 fallbacks for
/// anything not (yet) loaded.
pub struct GpuTextures {
    white: wgpu::TextureView,
    flat_normal: wgpu::TextureView,
    views: HashMap<usize, wgpu::TextureView>,
    pub(crate) sampler: wgpu::Sampler,
}

fn solid_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    rgba: [u8; 4],
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    upload_rgba(device, queue, label, &rgba, 1, 1, format)
}

pub(crate) fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    rgba_data: &[u8],
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    let texture_size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: texture_size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba_data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        texture_size,
    );

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl GpuTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = solid_texture(
            device,
            queue,
            "Default White Texture",
            [255, 255, 255, 255],
            wgpu::TextureFormat::Rgba8UnormSrgb,
        );
        let flat_normal = solid_texture(
            device,
            queue,
            "Flat Normal Texture",
            [128, 128, 255, 255],
            wgpu::TextureFormat::Rgba8Unorm,
        );
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            white,
            flat_normal,
            views: HashMap::new(),
            sampler,
        }
    }

    /// Uploads decoded RGBA8 data for `texture_id`, replacing any earlier upload.
    pub fn load_rgba(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture_id: usize,
        kind: TextureKind,
        rgba_data: &[u8],
        width: u32,
        height: u32,
    ) {
        let format = match kind {
            TextureKind::Diffuse => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureKind::NormalMap => wgpu::TextureFormat::Rgba8Unorm,
        };
        let view = upload_rgba(device, queue, "Loaded Texture", rgba_data, width, height, format);
        self.views.insert(texture_id, view);
        log::info!("Loaded texture {} ({}x{})", texture_id, width, height);
    }

    pub fn view(&self, texture_id: Option<usize>, kind: TextureKind) -> &wgpu::TextureView {
        match texture_id.and_then(|id| self.views.get(&id)) {
            Some(view) => view,
            None => match kind {
                TextureKind::Diffuse => &self.white,
                TextureKind::NormalMap => &self.flat_normal,
            },
        }
    }

    pub fn is_loaded(&self, texture_id: usize) -> bool {
        self.views.contains_key(&texture_id)
    }
}
