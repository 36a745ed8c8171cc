use crate::renderer::camera::NEAR_PLANE;
use crate::renderer::gpu_mesh::{GpuMesh, GpuScene};
use crate::renderer::light::LightRig;
use crate::renderer::pipelines::MeshPipelines;
use crate::renderer::post::DEBUG_SLOTS;
use crate::renderer::renderer::Renderer;
use crate::settings::Settings;
use egui_wgpu::ScreenDescriptor;

/// Background behind the post-processed scene.
const SCENE_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.2,
    b: 0.3,
    a: 1.0,
};
/// Background in wireframe mode or with post-processing off.
const PLAIN_CLEAR: wgpu::Color = wgpu::Color::WHITE;

const SHADOW_THUMBNAIL: f32 = 200.0;
const LUT_VIEW_SCALE: f32 = 2.0;

fn draw_scenes(
    render_pass: &mut wgpu::RenderPass<'_>,
    pipelines: &MeshPipelines,
    scenes: &[&GpuScene],
    per_mesh: impl Fn(&mut wgpu::RenderPass<'_>, &GpuMesh),
) {
    for scene in scenes {
        for mesh in &scene.meshes {
            render_pass.set_pipeline(pipelines.get(mesh.skinned));
            per_mesh(render_pass, mesh);
            mesh.draw(render_pass);
        }
    }
}

impl Renderer {
    fn visible_scenes(&self, settings: &Settings) -> Vec<&GpuScene> {
        let mut scenes = Vec::new();
        if settings.display.render_scene {
            scenes.extend(self.scene.as_ref());
        }
        if settings.display.render_character {
            scenes.extend(self.character.as_ref());
        }
        scenes
    }

    pub fn render(
        &mut self,
        settings: &Settings,
        lights: &LightRig,
        paint_jobs: Vec<egui::ClippedPrimitive>,
        textures_delta: egui::TexturesDelta,
        screen_descriptor: ScreenDescriptor,
    ) -> Result<(), wgpu::SurfaceError> {
        // Skip rendering if window size is invalid (minimized, not ready, etc.)
        if self.config.width == 0 || self.config.height == 0 {
            return Ok(());
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let post_processing = settings.post_processing();
        let scenes = self.visible_scenes(settings);

        // Shadow maps, one layer per shadowed light
        if settings.lighting.apply_lighting {
            for (i, light) in lights.iter_shadowed() {
                let (Some(layer), Some(camera)) =
                    (self.shadows.layer_view(i), self.shadows.camera_bind_group(i))
                else {
                    continue;
                };
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Shadow Pass"),
                    color_attachments: &[],
                    depth_stencil_attachment: Some(depth_attachment(layer, wgpu::LoadOp::Clear(1.0))),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                log::trace!("shadow pass for '{}'", light.name);
                pass.set_bind_group(0, camera, &[]);
                draw_scenes(&mut pass, &self.pipelines.shadow, &scenes, |_, _| {});
            }
        }

        // Depth pre-pass for fog; skipped when nothing reads it
        if post_processing {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Depth Pre-pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(depth_attachment(
                    &self.post.targets.depth,
                    wgpu::LoadOp::Clear(1.0),
                )),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            draw_scenes(&mut pass, &self.pipelines.depth, &scenes, |_, _| {});
        }

        // Lit geometry into the HDR target
        {
            let (clear, depth_load) = if post_processing {
                (SCENE_CLEAR, wgpu::LoadOp::Load)
            } else {
                (PLAIN_CLEAR, wgpu::LoadOp::Clear(1.0))
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Geometry Pass"),
                color_attachments: &[Some(color_attachment(&self.post.targets.hdr, Some(clear)))],
                depth_stencil_attachment: Some(depth_attachment(&self.post.targets.depth, depth_load)),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            pass.set_bind_group(3, &self.shadows.lights_bind_group, &[]);
            let mesh_pipelines = if settings.display.wireframe_mode {
                &self.pipelines.wireframe
            } else {
                &self.pipelines.lit
            };
            draw_scenes(&mut pass, mesh_pipelines, &scenes, |pass, mesh| {
                pass.set_bind_group(2, &mesh.material_bind_group, &[]);
            });

            pass.set_pipeline(&self.pipelines.particles);
            self.particles.draw(&mut pass);

            if settings.animation.render_bones
                && settings.display.render_character
                && self.num_bone_vertices > 0
            {
                pass.set_pipeline(&self.pipelines.line);
                pass.set_vertex_buffer(0, self.bone_buffer.slice(..));
                pass.draw(0..self.num_bone_vertices, 0..1);
            }
        }

        // Post-processing chain into the surface
        let grading = post_processing && settings.grading.enabled;
        let bloom = post_processing && settings.bloom.enabled;
        if grading {
            let mut pass = fullscreen_pass(&mut encoder, "Colour Grading Pass", &self.post.targets.graded);
            pass.set_pipeline(&self.pipelines.grade);
            pass.set_bind_group(0, &self.post.grade, &[]);
            pass.draw(0..3, 0..1);
        }
        let source = if grading {
            &self.post.from_graded
        } else {
            &self.post.from_hdr
        };
        if bloom {
            {
                let mut pass = fullscreen_pass(&mut encoder, "Bloom Pass", &self.post.targets.bloom_a);
                pass.set_pipeline(&self.pipelines.bloom);
                pass.set_bind_group(0, &source.bloom, &[]);
                pass.draw(0..3, 0..1);
            }
            {
                let mut pass = fullscreen_pass(&mut encoder, "Vertical Blur Pass", &self.post.targets.bloom_b);
                pass.set_pipeline(&self.pipelines.blur_vertical);
                pass.set_bind_group(0, &self.post.blur, &[]);
                pass.draw(0..3, 0..1);
            }
            let mut pass = fullscreen_pass(&mut encoder, "Combine Pass", &view);
            pass.set_pipeline(&self.pipelines.combine);
            pass.set_bind_group(0, &source.combine, &[]);
            pass.draw(0..3, 0..1);
        } else {
            let mut pass = fullscreen_pass(&mut encoder, "Blit Pass", &view);
            pass.set_pipeline(&self.pipelines.blit);
            pass.set_bind_group(0, &source.blit, &[]);
            pass.draw(0..3, 0..1);
        }

        // Debug overlays
        let overlays = self.debug_overlays(settings, lights);
        if !overlays.is_empty() {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Debug Overlay Pass"),
                color_attachments: &[Some(color_attachment(&view, None))],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            for overlay in &overlays {
                let pipeline = match overlay.kind {
                    OverlayKind::Depth => &self.pipelines.debug_depth,
                    OverlayKind::Shadow => &self.pipelines.debug_shadow,
                    OverlayKind::Lut => &self.pipelines.debug_lut,
                };
                let [x, y, w, h] = overlay.rect;
                pass.set_viewport(x, y, w, h, 0.0, 1.0);
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.post.debug, &[overlay.offset]);
                pass.draw(0..3, 0..1);
            }
        }

        // Render egui properly
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_desc = screen_descriptor;

        // Update egui buffers before rendering
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_desc,
        );

        {
            let mut egui_rpass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui render pass"),
                    color_attachments: &[Some(color_attachment(&view, None))],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();

            self.egui_renderer
                .render(&mut egui_rpass, &paint_jobs, &screen_desc);
        }

        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Lays out the enabled debug views and writes their uniforms.
    fn debug_overlays(&self, settings: &Settings, lights: &LightRig) -> Vec<Overlay> {
        let width = self.config.width as f32;
        let height = self.config.height as f32;
        let far = settings.display.far_plane;
        let mut overlays = Vec::new();
        let mut push = |kind: OverlayKind, rect: [f32; 4], layer: u32| {
            if overlays.len() >= DEBUG_SLOTS {
                return;
            }
            let offset = self.post.write_debug(&self.queue, overlays.len(), layer, NEAR_PLANE, far);
            overlays.push(Overlay { kind, rect, offset });
        };

        if settings.display.show_depth && settings.post_processing() {
            push(OverlayKind::Depth, [0.0, 0.0, width, height], 0);
        }
        if settings.grading.show_lut {
            let (w, h) = (256.0 * LUT_VIEW_SCALE, 16.0 * LUT_VIEW_SCALE);
            push(OverlayKind::Lut, [0.0, 0.0, w.min(width), h.min(height)], 0);
        }
        if settings.lighting.show_shadow_maps && settings.lighting.apply_lighting {
            let size = SHADOW_THUMBNAIL.min(width).min(height);
            for (slot, (i, _)) in lights.iter_shadowed().enumerate() {
                let x = slot as f32 * size;
                if x + size > width {
                    break;
                }
                push(OverlayKind::Shadow, [x, height - size, size, size], i as u32);
            }
        }
        overlays
    }
}

#[derive(Debug, Clone, Copy)]
enum OverlayKind {
    Depth,
    Shadow,
    Lut,
}

struct Overlay {
    kind: OverlayKind,
    /// x, y, width, height in pixels
    rect: [f32; 4],
    offset: u32,
}

fn color_attachment(
    view: &wgpu::TextureView,
    clear: Option<wgpu::Color>,
) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    }
}

fn depth_attachment(
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<f32>,
) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

fn fullscreen_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(color_attachment(target, Some(wgpu::Color::BLACK)))],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    })
}
