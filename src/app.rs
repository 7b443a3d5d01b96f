//! Window shell and frame driver.
//!
//! [`run`] opens a window, builds the GPU context and renderer, initializes
//! the scene, then drives it from the host's redraw callback: each frame
//! computes the wall-clock delta since the previous callback (a nominal
//! 1/60 s on the first frame), calls `scene.update(elapsed_ms)`, and hands
//! the scene's graph root to the renderer. Stopping the callback stops
//! rendering; there is no internal scheduler and exactly one frame is in
//! flight.

use crate::gpu::GpuContext;
use crate::renderer::Renderer;
use crate::scene::Scene;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

/// Elapsed time reported for the very first frame.
const FIRST_FRAME_MS: f32 = 1000.0 / 60.0;

/// Window configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width in pixels.
    pub width: u32,
    /// Initial window height in pixels.
    pub height: u32,
}

impl AppConfig {
    /// Default configuration: 1280×720, titled "phaos".
    pub fn new() -> Self {
        Self {
            title: "phaos".to_string(),
            width: 1280,
            height: 720,
        }
    }

    /// Sets the window title.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Sets the initial window size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a scene with the default configuration.
pub fn run(scene: Box<dyn Scene>) {
    run_with_config(AppConfig::default(), scene);
}

/// Runs a scene in a window until it is closed.
///
/// # Panics
///
/// Panics if the event loop, window, device, or scene cannot be created —
/// all construction-time failures are fatal by design.
pub fn run_with_config(config: AppConfig, scene: Box<dyn Scene>) {
    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::Pending {
        config,
        scene: Some(scene),
    };

    event_loop.run_app(&mut app).unwrap();
}

enum App {
    Pending {
        config: AppConfig,
        scene: Option<Box<dyn Scene>>,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        renderer: Renderer,
        scene: Box<dyn Scene>,
        last_frame: Option<Instant>,
    },
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let App::Pending { config, scene } = self {
            let window_attrs = WindowAttributes::default()
                .with_title(&config.title)
                .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

            let window = Arc::new(event_loop.create_window(window_attrs).unwrap());
            let gpu = GpuContext::new(window.clone());
            let renderer = Renderer::new(&gpu);

            let mut scene = scene.take().unwrap();
            scene
                .initialize(&gpu, &renderer)
                .expect("Failed to initialize scene");

            *self = App::Running {
                window,
                gpu,
                renderer,
                scene,
                last_frame: None,
            };
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let App::Running {
            window,
            gpu,
            renderer,
            scene,
            last_frame,
        } = self
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
                renderer.resize(gpu, size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let elapsed_ms = match last_frame {
                    Some(previous) => now.duration_since(*previous).as_secs_f32() * 1000.0,
                    None => FIRST_FRAME_MS,
                };
                *last_frame = Some(now);

                scene.update(elapsed_ms);

                if let Err(error) = renderer.render(gpu, scene.graph_root()) {
                    log::error!("aborting: {}", error);
                    event_loop.exit();
                    return;
                }

                window.request_redraw();
            }
            _ => {}
        }
    }
}
