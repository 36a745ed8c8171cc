//! Skinned-character demo: a native binary FBX reader, a scene importer with
//! skeletal animation blending, and a wgpu renderer with shadow maps, colour
//! grading and bloom under an egui debug overlay.

pub mod animation;
pub mod app;
pub mod error;
pub mod fbx;
pub mod model;
pub mod renderer;
pub mod settings;
pub mod texture;
pub mod ui;

/// Name under which confy stores the settings files.
pub const CONFY_APP_NAME: &str = "fbxdemo-rs";
