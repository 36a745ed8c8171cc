use crate::renderer::Renderer;
use crate::texture::manager::{TextureManager, TextureStatus};

const THUMBNAIL_SIZE: f32 = 48.0;

pub struct TexturePanel {
    viewer_texture_id: Option<usize>,
}

impl TexturePanel {
    pub fn new() -> Self {
        Self {
            viewer_texture_id: None,
        }
    }

    /// Returns the ids the user asked to (re)load.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        texture_manager: &TextureManager,
        renderer: &mut Renderer,
        show_panel: &mut bool,
    ) -> Option<Vec<usize>> {
        if !*show_panel {
            return None;
        }

        let mut load_requests = Vec::new();

        if let Some(texture_id) = self.viewer_texture_id {
            self.show_texture_viewer(ctx, texture_manager, renderer, texture_id);
        }

        egui::Window::new("Textures")
            .default_width(420.0)
            .default_height(500.0)
            .resizable(true)
            .open(show_panel)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(format!("Total: {}", texture_manager.textures.len()));
                    ui.separator();
                    ui.colored_label(
                        egui::Color32::GREEN,
                        format!("Loaded: {}", texture_manager.loaded_count()),
                    );
                    ui.separator();
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        format!("Loading: {}", texture_manager.loading_count()),
                    );
                    ui.separator();
                    ui.colored_label(
                        egui::Color32::RED,
                        format!("Errors: {}", texture_manager.error_count()),
                    );
                });

                ui.separator();

                ui.horizontal(|ui| {
                    if ui.button("Load All Missing").clicked() {
                        load_requests.extend(
                            texture_manager
                                .textures
                                .iter()
                                .filter(|t| t.status == TextureStatus::NotLoaded)
                                .map(|t| t.texture_id),
                        );
                    }
                    if ui.button("Retry Failed").clicked() {
                        load_requests.extend(
                            texture_manager
                                .textures
                                .iter()
                                .filter(|t| matches!(t.status, TextureStatus::Error(_)))
                                .map(|t| t.texture_id),
                        );
                    }
                });

                ui.separator();

                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for texture in &texture_manager.textures {
                            ui.group(|ui| {
                                ui.set_min_width(ui.available_width());
                                ui.horizontal(|ui| {
                                    let thumbnail = texture
                                        .is_loaded()
                                        .then(|| renderer.get_egui_texture_id(texture.texture_id))
                                        .flatten();
                                    match thumbnail {
                                        Some(id) => {
                                            let image = egui::Image::new(egui::load::SizedTexture::new(
                                                id,
                                                egui::vec2(THUMBNAIL_SIZE, THUMBNAIL_SIZE),
                                            ))
                                            .sense(egui::Sense::click());
                                            if ui.add(image).clicked() {
                                                self.viewer_texture_id = Some(texture.texture_id);
                                            }
                                        }
                                        None => {
                                            let (rect, _) = ui.allocate_exact_size(
                                                egui::vec2(THUMBNAIL_SIZE, THUMBNAIL_SIZE),
                                                egui::Sense::hover(),
                                            );
                                            ui.painter().circle_filled(
                                                rect.center(),
                                                6.0,
                                                texture.status_color(),
                                            );
                                        }
                                    }

                                    ui.vertical(|ui| {
                                        ui.horizontal(|ui| {
                                            ui.label(format!("#{}", texture.texture_id));
                                            ui.strong(texture.file_name());
                                            ui.label(
                                                egui::RichText::new(texture.kind.label()).weak(),
                                            );
                                        });
                                        if let Some(local_path) = &texture.local_path {
                                            ui.label(
                                                egui::RichText::new(local_path.display().to_string())
                                                    .small()
                                                    .color(egui::Color32::DARK_GREEN),
                                            );
                                        } else {
                                            ui.label(
                                                egui::RichText::new(texture.path.display().to_string())
                                                    .small(),
                                            );
                                        }
                                        ui.horizontal(|ui| {
                                            ui.colored_label(
                                                texture.status_color(),
                                                texture.status_text(),
                                            );
                                            match texture.status {
                                                TextureStatus::NotLoaded => {
                                                    if ui.small_button("Load").clicked() {
                                                        load_requests.push(texture.texture_id);
                                                    }
                                                }
                                                TextureStatus::Error(_) => {
                                                    if ui.small_button("Retry").clicked() {
                                                        load_requests.push(texture.texture_id);
                                                    }
                                                }
                                                _ => {}
                                            }
                                        });
                                    });
                                });
                            });
                            ui.add_space(4.0);
                        }
                    });
            });

        if load_requests.is_empty() {
            None
        } else {
            Some(load_requests)
        }
    }

    fn show_texture_viewer(
        &mut self,
        ctx: &egui::Context,
        texture_manager: &TextureManager,
        renderer: &mut Renderer,
        texture_id: usize,
    ) {
        let mut is_open = true;
        let title = texture_manager
            .get_texture(texture_id)
            .map(|t| t.file_name())
            .unwrap_or_else(|| texture_id.to_string());

        egui::Window::new(format!("🖼 {}", title))
            .id(egui::Id::new(("texture-viewer", texture_id)))
            .default_width(512.0)
            .default_height(512.0)
            .resizable(true)
            .open(&mut is_open)
            .show(ctx, |ui| {
                if let Some(egui_texture_id) = renderer.get_egui_texture_id(texture_id) {
                    let max_size = ui.available_size().min_elem().clamp(64.0, 512.0);
                    ui.image(egui::ImageSource::Texture(egui::load::SizedTexture::new(
                        egui_texture_id,
                        egui::vec2(max_size, max_size),
                    )));
                } else {
                    ui.label("⚠ Texture not loaded");
                }
            });

        if !is_open {
            self.viewer_texture_id = None;
        }
    }
}

impl Default for TexturePanel {
    fn default() -> Self {
        Self::new()
    }
}
