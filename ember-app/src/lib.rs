//! The application shell: an `App` trait driven by a minimal event pump.
//! Resizes funnel through unload/load, and a minimized window keeps
//! updating without drawing.

use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

bitflags::bitflags! {
    /// What an (un)load cycle must rebuild.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoadFlags: u32 {
        const SHADER = 0x1;
        const RESIZE = 0x2;
        const ALL = 0x3;
    }
}

/// Lifecycle contract the pump drives. `init`/`exit` run once per process;
/// `load`/`unload` bracket device-dependent state and re-run on resize;
/// `update` is CPU-only work, `draw` records and submits GPU work.
pub trait App {
    fn name(&self) -> &str {
        "Ember App"
    }

    fn init(&mut self, window: &Window) -> bool;

    fn exit(&mut self);

    fn load(&mut self, flags: LoadFlags, window: &Window) -> bool;

    fn unload(&mut self, flags: LoadFlags) -> bool;

    fn update(&mut self, delta_time: f32) -> bool;

    fn draw(&mut self) -> bool;
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { title: "Ember".to_string(), width: 1280, height: 720 }
    }
}

struct Runner<A: App> {
    app: A,
    config: AppConfig,
    window: Option<Window>,
    minimized: bool,
    pending_resize: bool,
    last_frame: Instant,
}

impl<A: App> Runner<A> {
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            self.app.unload(LoadFlags::ALL);
            self.app.exit();
            self.window = None;
        }
        event_loop.exit();
    }
}

impl<A: App> ApplicationHandler for Runner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        if !self.app.init(&window) {
            log::error!("app init failed");
            event_loop.exit();
            return;
        }
        if !self.app.load(LoadFlags::ALL, &window) {
            log::error!("app load failed");
            self.app.exit();
            event_loop.exit();
            return;
        }
        self.last_frame = Instant::now();
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(size) => {
                self.minimized = size.width == 0 || size.height == 0;
                if !self.minimized {
                    self.pending_resize = true;
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(window) = self.window.as_ref() else { return };

                if self.pending_resize {
                    self.pending_resize = false;
                    if !self.app.unload(LoadFlags::RESIZE) || !self.app.load(LoadFlags::RESIZE, window)
                    {
                        log::error!("failed to reload after resize");
                        self.shutdown(event_loop);
                        return;
                    }
                }

                let now = Instant::now();
                let delta_time = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;

                if !self.app.update(delta_time) {
                    self.shutdown(event_loop);
                    return;
                }
                // Headless behavior while minimized: keep updating, skip
                // drawing.
                if !self.minimized && !self.app.draw() {
                    self.shutdown(event_loop);
                    return;
                }
                window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Run `app` under the event pump until the window closes or a callback
/// signals failure.
pub fn run<A: App>(app: A, config: AppConfig) -> Result<(), winit::error::EventLoopError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut runner = Runner {
        app,
        config,
        window: None,
        minimized: false,
        pending_resize: false,
        last_frame: Instant::now(),
    };
    event_loop.run_app(&mut runner)
}
