pub mod app;
pub mod handler;
pub mod lamp;

pub use app::{App, EventResponse, character_world};
pub use handler::AppHandler;
pub use lamp::LampBlink;
