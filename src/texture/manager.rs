use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum TextureStatus {
    NotLoaded,
    Loading,
    Loaded,
    Missing,
    Error(String),
}

/// What a texture is sampled as; decides its GPU format and fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Diffuse,
    NormalMap,
}

impl TextureKind {
    pub fn label(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "diffuse",
            TextureKind::NormalMap => "normal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub texture_id: usize,
    /// Path as referenced by the material.
    pub path: PathBuf,
    pub kind: TextureKind,
    pub status: TextureStatus,
    pub local_path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
}

impl TextureInfo {
    pub fn new(texture_id: usize, path: PathBuf, kind: TextureKind) -> Self {
        Self {
            texture_id,
            path,
            kind,
            status: TextureStatus::NotLoaded,
            local_path: None,
            width: 0,
            height: 0,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, TextureStatus::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.status, TextureStatus::Loaded)
    }

    pub fn has_error(&self) -> bool {
        matches!(self.status, TextureStatus::Error(_) | TextureStatus::Missing)
    }

    pub fn status_text(&self) -> String {
        match &self.status {
            TextureStatus::NotLoaded => "Not Loaded".to_string(),
            TextureStatus::Loading => "Loading from disk...".to_string(),
            TextureStatus::Loaded => format!("Loaded ({}x{})", self.width, self.height),
            TextureStatus::Missing => "File not found".to_string(),
            TextureStatus::Error(err) => format!("Error: {}", err),
        }
    }

    pub fn status_color(&self) -> egui::Color32 {
        match &self.status {
            TextureStatus::NotLoaded => egui::Color32::GRAY,
            TextureStatus::Loading => egui::Color32::YELLOW,
            TextureStatus::Loaded => egui::Color32::GREEN,
            TextureStatus::Missing | TextureStatus::Error(_) => egui::Color32::RED,
        }
    }
}

#[derive(Debug, Default)]
pub struct TextureManager {
    pub textures: Vec<TextureInfo>,
    /// Extra directories searched after the texture's own folder.
    search_dirs: Vec<PathBuf>,
}

impl TextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_search_dir(&mut self, dir: &Path) {
        if !self.search_dirs.iter().any(|d| d == dir) {
            self.search_dirs.push(dir.to_path_buf());
        }
    }

    /// Registers a texture reference, returning the existing id when the same
    /// path was registered before.
    pub fn register(&mut self, path: &Path, kind: TextureKind) -> usize {
        if let Some(id) = self.id_for(path) {
            return id;
        }
        let id = self.textures.len();
        let mut info = TextureInfo::new(id, path.to_path_buf(), kind);
        info.local_path = self.find_local_path(path);
        if info.local_path.is_none() {
            log::warn!("texture not found: {}", path.display());
            info.status = TextureStatus::Missing;
        }
        self.textures.push(info);
        id
    }

    pub fn id_for(&self, path: &Path) -> Option<usize> {
        self.textures.iter().position(|t| t.path == path)
    }

    /// Exact path first, then a case-insensitive file name match in the
    /// texture's folder, its `textures/` subfolder and the search dirs.
    pub fn find_local_path(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        let file_name = path.file_name()?.to_string_lossy().to_lowercase();
        let mut dirs = Vec::new();
        if let Some(parent) = path.parent() {
            dirs.push(parent.to_path_buf());
            dirs.push(parent.join("textures"));
            dirs.push(parent.join("Textures"));
        }
        dirs.extend(self.search_dirs.iter().cloned());

        for dir in dirs {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if entry.file_name().to_string_lossy().to_lowercase() == file_name {
                    return Some(entry.path());
                }
            }
        }
        None
    }

    pub fn get_texture(&self, id: usize) -> Option<&TextureInfo> {
        self.textures.get(id)
    }

    pub fn get_texture_mut(&mut self, id: usize) -> Option<&mut TextureInfo> {
        self.textures.get_mut(id)
    }

    pub fn loading_count(&self) -> usize {
        self.textures.iter().filter(|t| t.is_loading()).count()
    }

    pub fn loaded_count(&self) -> usize {
        self.textures.iter().filter(|t| t.is_loaded()).count()
    }

    pub fn error_count(&self) -> usize {
        self.textures.iter().filter(|t| t.has_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fbxdemo-tex-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(dir.join("textures")).unwrap();
        dir
    }

    #[test]
    fn register_deduplicates() {
        let mut m = TextureManager::new();
        let a = m.register(Path::new("nowhere/a.png"), TextureKind::Diffuse);
        let b = m.register(Path::new("nowhere/a.png"), TextureKind::Diffuse);
        assert_eq!(a, b);
        assert_eq!(m.textures.len(), 1);
        assert_eq!(m.textures[0].status, TextureStatus::Missing);
        assert_eq!(m.error_count(), 1);
    }

    #[test]
    fn finds_texture_case_insensitively_in_subfolder() {
        let dir = temp_dir("case");
        std::fs::write(dir.join("textures").join("Robot_Diffuse.PNG"), b"x").unwrap();

        let m = TextureManager::new();
        let found = m.find_local_path(&dir.join("robot_diffuse.png"));
        assert_eq!(found, Some(dir.join("textures").join("Robot_Diffuse.PNG")));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn search_dirs_are_consulted() {
        let dir = temp_dir("search");
        std::fs::write(dir.join("glow.png"), b"x").unwrap();

        let mut m = TextureManager::new();
        m.add_search_dir(&dir);
        let id = m.register(Path::new("elsewhere/GLOW.png"), TextureKind::Diffuse);
        assert_eq!(m.textures[id].local_path, Some(dir.join("glow.png")));
        assert_eq!(m.textures[id].status, TextureStatus::NotLoaded);
        std::fs::remove_dir_all(&dir).ok();
    }
}
