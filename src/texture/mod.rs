pub mod loader;
pub mod manager;
pub mod panel;
mod start_load;

pub use loader::{TextureLoadResult, decode_image, identity_lut, load_texture};
pub use manager::{TextureKind, TextureManager, TextureStatus};
pub use panel::TexturePanel;
