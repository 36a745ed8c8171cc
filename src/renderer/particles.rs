use crate::renderer::pipelines::Layouts;
use crate::renderer::vertex::ParticleInstance;
use crate::settings::ParticleSettings;
use rand::Rng;
use wgpu::util::DeviceExt;

/// Full lifetimes per second of animation time.
const CYCLES_PER_SECOND: f32 = 0.25;
const COLOUR: [f32; 4] = [0.8, 0.9, 1.0, 1.0];

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ParticlesUniform {
    /// quad size, max speed, cycles per second, unused
    params: [f32; 4],
    colour: [f32; 4],
}

/// Random spawn points inside the settings box, drifting down and along +z.
/// The phase in `velocity[3]` keeps particles out of step.
pub fn spawn_instances<R: Rng>(settings: &ParticleSettings, rng: &mut R) -> Vec<ParticleInstance> {
    let range = |rng: &mut R, a: f32, b: f32| {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if hi - lo > f32::EPSILON { rng.gen_range(lo..hi) } else { lo }
    };
    (0..settings.count)
        .map(|_| ParticleInstance {
            position: [
                range(rng, settings.min[0], settings.max[0]),
                range(rng, settings.min[1], settings.max[1]),
                range(rng, settings.min[2], settings.max[2]),
                1.0,
            ],
            velocity: [
                0.0,
                rng.gen_range(-1.0..-0.3),
                rng.gen_range(0.4..0.5),
                rng.gen_range(0.0..1.0),
            ],
        })
        .collect()
}

pub struct ParticleSystem {
    instance_buffer: wgpu::Buffer,
    count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Animation clock, advanced by scaled frame time.
    pub time: f32,
}

impl ParticleSystem {
    pub fn new(device: &wgpu::Device, layouts: &Layouts, settings: &ParticleSettings) -> Self {
        let instances = spawn_instances(settings, &mut rand::thread_rng());
        // a zero-sized vertex buffer is invalid
        let contents: &[u8] = if instances.is_empty() {
            &[0; size_of::<ParticleInstance>()]
        } else {
            bytemuck::cast_slice(&instances)
        };
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Instance Buffer"),
            contents,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particles Buffer"),
            contents: bytemuck::bytes_of(&uniform(settings)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particles Bind Group"),
            layout: &layouts.particles,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        log::debug!("spawned {} particles", instances.len());
        Self {
            instance_buffer,
            count: instances.len() as u32,
            uniform_buffer,
            bind_group,
            time: 0.0,
        }
    }

    pub fn step(&mut self, dt: f32) {
        self.time += dt;
    }

    pub fn write_uniform(&self, queue: &wgpu::Queue, settings: &ParticleSettings) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform(settings)));
    }

    /// Expects the particle pipeline and camera group to be set.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.count == 0 {
            return;
        }
        render_pass.set_bind_group(1, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        render_pass.draw(0..4, 0..self.count);
    }
}

fn uniform(settings: &ParticleSettings) -> ParticlesUniform {
    ParticlesUniform {
        params: [settings.size, settings.max_speed, CYCLES_PER_SECOND, 0.0],
        colour: COLOUR,
    }
}
