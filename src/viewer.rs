//! Window host: builder, event routing, and frame scheduling.
//!
//! [`Viewer`] is the one parameterized entry point that used to be a
//! pile of near-identical demo loops: every knob (sub-steps, batches,
//! force shape, visuals) is a builder method, and `run()` owns the winit
//! event loop. Events are routed into [`ForceInput`] and the frame loop;
//! nothing outside [`FrameLoop`] touches simulation state.

use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, MouseButton, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::controller::{FrameLoop, LoopConfig, ParticleRenderer};
use crate::error::{RenderError, ViewerError};
use crate::gpu::{GpuState, ParticleRenderBuffer};
use crate::input::{ForceInput, ForceRamp, ScreenTransform};
use crate::reconcile::Reconciler;
use crate::sim::{ParticleView, Simulation};

/// Configures and runs a particle viewer over your simulation.
///
/// Use method chaining to configure, then call `.run()` to start.
///
/// ```ignore
/// Viewer::new(700.0, 700.0, || MySim::new(700.0, 700.0, 500))
///     .with_title("droplets")
///     .with_desired_count(500)
///     .with_force(2e8, 100.0)
///     .run()?;
/// ```
///
/// While running: hold the mouse (or a touch) to apply a force, `R`
/// resets the simulation, `P`/`ArrowUp` and `O`/`ArrowDown` grow and
/// shrink the population target by one spawn batch.
pub struct Viewer<S: Simulation> {
    title: String,
    window_size: (u32, u32),
    sim_size: (f32, f32),
    rebuild: Box<dyn FnMut() -> S>,
    config: LoopConfig,
    desired: Option<usize>,
    force_magnitude: f32,
    force_radius: f32,
    force_ramp: ForceRamp,
    spawn_batch: usize,
    despawn_batch: usize,
    spawn_region: Option<(f32, f32)>,
    particle_size: f32,
    tint: [f32; 4],
}

impl<S: Simulation + 'static> Viewer<S> {
    /// Create a viewer over a `sim_width x sim_height` simulation space.
    ///
    /// `rebuild` constructs the simulation with its full configuration;
    /// it runs once at startup and again on every reset.
    pub fn new<F>(sim_width: f32, sim_height: f32, rebuild: F) -> Self
    where
        F: FnMut() -> S + 'static,
    {
        Self {
            title: "plume".to_string(),
            window_size: (700, 700),
            sim_size: (sim_width, sim_height),
            rebuild: Box::new(rebuild),
            config: LoopConfig::default(),
            desired: None,
            force_magnitude: 2e8,
            force_radius: 100.0,
            force_ramp: ForceRamp::Constant,
            spawn_batch: 5,
            despawn_batch: 2,
            spawn_region: None,
            particle_size: 10.0,
            tint: [1.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    /// Sub-step count and per-step delta; the simulated time per frame
    /// is their product, independent of wall clock.
    pub fn with_substeps(mut self, substeps: u32, substep_dt: f32) -> Self {
        self.config.substeps = substeps;
        self.config.substep_dt = substep_dt;
        self
    }

    /// How many frames apart FPS publications are.
    pub fn with_publish_interval(mut self, frames: u64) -> Self {
        self.config.publish_every = frames.max(1);
        self
    }

    /// Rolling window of the FPS average, in frames.
    pub fn with_fps_window(mut self, samples: usize) -> Self {
        self.config.fps_window = samples;
        self
    }

    /// Particle-count target the reconciler converges toward. Defaults
    /// to the initial population.
    pub fn with_desired_count(mut self, desired: usize) -> Self {
        self.desired = Some(desired);
        self
    }

    /// Magnitude and falloff radius of the gesture force.
    pub fn with_force(mut self, magnitude: f32, radius: f32) -> Self {
        self.force_magnitude = magnitude;
        self.force_radius = radius;
        self
    }

    /// Magnitude policy while the gesture is held.
    pub fn with_force_ramp(mut self, ramp: ForceRamp) -> Self {
        self.force_ramp = ramp;
        self
    }

    /// Spawn and despawn batch sizes for population reconciliation.
    pub fn with_batch_sizes(mut self, spawn: usize, despawn: usize) -> Self {
        self.spawn_batch = spawn;
        self.despawn_batch = despawn;
        self
    }

    /// X range new particles spawn into. Defaults to the simulation
    /// width inset by 25 units on each side.
    pub fn with_spawn_region(mut self, x_min: f32, x_max: f32) -> Self {
        self.spawn_region = Some((x_min, x_max));
        self
    }

    /// Rendered quad size, in simulation units.
    pub fn with_particle_size(mut self, size: f32) -> Self {
        self.particle_size = size;
        self
    }

    /// Particle color and opacity.
    pub fn with_tint(mut self, tint: [f32; 4]) -> Self {
        self.tint = tint;
        self
    }

    /// Open the window and run until it closes.
    pub fn run(self) -> Result<(), ViewerError> {
        let (sim_width, sim_height) = self.sim_size;
        let transform = ScreenTransform::Canvas {
            sim_width,
            sim_height,
            flip_y: true,
        };
        let input = ForceInput::new(transform, self.force_magnitude, self.force_radius, self.force_ramp);
        let spawn_region = self
            .spawn_region
            .unwrap_or((25.0, (sim_width - 25.0).max(25.0)));
        let reconciler = Reconciler::new(self.spawn_batch, self.despawn_batch, spawn_region);

        let mut controller = FrameLoop::new(self.rebuild, input, reconciler, self.config);
        if let Some(desired) = self.desired {
            controller.set_desired(desired);
        }

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            title: self.title,
            window_size: self.window_size,
            sim_size: self.sim_size,
            particle_size: self.particle_size,
            tint: self.tint,
            spawn_batch: self.spawn_batch,
            controller,
            window: None,
            renderer: None,
            start: Instant::now(),
            last_fps: 0.0,
            fatal: None,
        };
        event_loop.run_app(&mut app)?;

        match app.fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// GPU context plus the instance buffer, drawing into the window surface.
struct WindowRenderer {
    gpu: GpuState,
    particles: ParticleRenderBuffer,
}

impl ParticleRenderer for WindowRenderer {
    fn draw(&mut self, particles: ParticleView<'_>, time_secs: f32) -> Result<(), RenderError> {
        self.particles
            .render(&self.gpu, &particles, time_secs)
            .map_err(RenderError::from)
    }
}

struct App<S: Simulation> {
    title: String,
    window_size: (u32, u32),
    sim_size: (f32, f32),
    particle_size: f32,
    tint: [f32; 4],
    spawn_batch: usize,
    controller: FrameLoop<S>,
    window: Option<Arc<Window>>,
    renderer: Option<WindowRenderer>,
    start: Instant,
    last_fps: f32,
    fatal: Option<ViewerError>,
}

impl<S: Simulation + 'static> App<S> {
    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::KeyR) => self.controller.request_reset(),
            PhysicalKey::Code(KeyCode::KeyP) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                let desired = self.controller.desired() + self.spawn_batch;
                self.controller.set_desired(desired);
            }
            PhysicalKey::Code(KeyCode::KeyO) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                let desired = self.controller.desired().saturating_sub(self.spawn_batch);
                self.controller.set_desired(desired);
            }
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_mut())
        else {
            return;
        };

        let now_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        match self.controller.frame(now_ms, renderer) {
            Ok(report) => {
                if report.fps.is_some() || report.stability_changed {
                    if let Some(fps) = report.fps {
                        self.last_fps = fps;
                    }
                    let status = if report.stable { "" } else { " [unstable]" };
                    window.set_title(&format!(
                        "{} | {:.1} FPS | {} particles{}",
                        self.title, self.last_fps, report.particles, status
                    ));
                }
            }
            Err(RenderError::Surface(e)) => match e {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    renderer.gpu.reconfigure();
                }
                wgpu::SurfaceError::OutOfMemory => {
                    log::error!("out of GPU memory, shutting down");
                    event_loop.exit();
                    return;
                }
                other => log::warn!("frame skipped: {:?}", other),
            },
        }

        window.request_redraw();
    }
}

impl<S: Simulation + 'static> ApplicationHandler for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.window_size;
        let attrs = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(width, height));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fatal = Some(ViewerError::Window(e));
                event_loop.exit();
                return;
            }
        };

        let gpu = match pollster::block_on(GpuState::new(window.clone())) {
            Ok(gpu) => gpu,
            Err(e) => {
                log::error!("GPU initialization failed: {}", e);
                self.fatal = Some(ViewerError::Gpu(e));
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.controller
            .input_mut()
            .set_surface_size(size.width as f32, size.height as f32);

        let (sim_width, sim_height) = self.sim_size;
        let particles = ParticleRenderBuffer::new(
            &gpu,
            sim_width,
            sim_height,
            self.controller.sim().len(),
            self.particle_size,
            self.tint,
        );

        self.renderer = Some(WindowRenderer { gpu, particles });
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.gpu.resize(size.width, size.height);
                }
                self.controller
                    .input_mut()
                    .set_surface_size(size.width as f32, size.height as f32);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.controller
                    .input_mut()
                    .moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    match state {
                        ElementState::Pressed => self.controller.input_mut().press(),
                        ElementState::Released => self.controller.input_mut().release(),
                    }
                }
            }
            WindowEvent::Touch(touch) => {
                let pos = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                let input = self.controller.input_mut();
                match touch.phase {
                    TouchPhase::Started => {
                        input.moved(pos);
                        input.press();
                    }
                    TouchPhase::Moved => input.moved(pos),
                    TouchPhase::Ended | TouchPhase::Cancelled => input.release(),
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(&event);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }
}
