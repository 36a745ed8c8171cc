use crate::app::app::App;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::WindowId;

pub struct AppHandler {
    pub app: Option<App>,
    pub resource_dir: Option<PathBuf>,
    pub runtime: Runtime,
}

impl AppHandler {
    pub fn new(runtime: Runtime, resource_dir: Option<PathBuf>) -> Self {
        Self {
            app: None,
            resource_dir,
            runtime,
        }
    }
}

impl ApplicationHandler for AppHandler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let runtime_handle = self.runtime.handle().clone();
        let created = pollster::block_on(App::new(
            event_loop,
            runtime_handle,
            self.resource_dir.clone(),
        ));
        match created {
            Ok(mut app) => {
                app.load_scenes();
                self.app = Some(app);
            }
            Err(e) => {
                log::error!("failed to start: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(app) = &mut self.app {
            let response = app.handle_event(&event);
            if response.repaint {
                app.window.request_redraw();
            }
            if response.exit {
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(app) = &mut self.app else {
            return;
        };
        match app.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => app.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("frame skipped: {:?}", e),
        }
        app.window.request_redraw();
    }
}
