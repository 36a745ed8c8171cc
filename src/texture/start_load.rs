use crate::app::App;
use crate::texture::loader::{TextureLoadResult, load_texture};
use crate::texture::manager::TextureStatus;

impl App {
    /// Marks the texture as loading and decodes it on the runtime; the
    /// result is picked up by the next frame.
    pub(crate) fn start_texture_load(&mut self, texture_id: usize) {
        let Some(info) = self.texture_manager.get_texture_mut(texture_id) else {
            return;
        };
        if info.is_loading() {
            return;
        }
        let Some(path) = info.local_path.clone() else {
            info.status = TextureStatus::Missing;
            return;
        };
        info.status = TextureStatus::Loading;

        let sender = self.texture_sender.clone();
        self.runtime.spawn(async move {
            log::debug!("loading texture {}: {}", texture_id, path.display());
            let result = match load_texture(&path).await {
                Ok((rgba_data, width, height)) => TextureLoadResult::Success {
                    texture_id,
                    rgba_data,
                    width,
                    height,
                },
                Err(e) => TextureLoadResult::Error {
                    texture_id,
                    error: e.to_string(),
                },
            };
            // the app may already be gone
            let _ = sender.send(result);
        });
    }
}
