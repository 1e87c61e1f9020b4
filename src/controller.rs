//! The per-frame orchestration protocol.
//!
//! [`FrameLoop`] sequences one frame in a fixed order: register the
//! timestamp, draw the state left by the previous frame, advance the
//! simulation in fixed sub-steps, honor a pending reset, clear and
//! re-apply the input force, reconcile the population, and report back
//! to the host. Scheduling the next frame belongs to the host (a
//! redraw-requested loop); nothing here suspends mid-step.
//!
//! Draw-before-step means the frame on screen always corresponds to the
//! state produced at the end of the previous frame, never to a partially
//! advanced one.

use crate::clock::FrameClock;
use crate::error::RenderError;
use crate::input::ForceInput;
use crate::reconcile::Reconciler;
use crate::sim::{ParticleView, Simulation};

/// Sink for the per-frame draw step.
///
/// Implemented by the GPU render bridge and by test doubles; the frame
/// loop only needs "draw whatever the view shows right now".
pub trait ParticleRenderer {
    fn draw(&mut self, particles: ParticleView<'_>, time_secs: f32) -> Result<(), RenderError>;
}

/// Fixed frame-loop constants, independent of wall-clock frame time.
///
/// The simulation is not wall-clock-adaptive: every frame advances it by
/// exactly `substeps * substep_dt` simulated seconds, whatever the
/// display refresh does.
#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    /// Simulation sub-steps per frame.
    pub substeps: u32,
    /// Simulated seconds per sub-step.
    pub substep_dt: f32,
    /// Publish the smoothed FPS every this many frames. Publishing every
    /// frame churns the UI for no benefit.
    pub publish_every: u64,
    /// Rolling window of the frame clock, in samples.
    pub fps_window: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            substeps: 2,
            substep_dt: 0.005,
            publish_every: 20,
            fps_window: 20,
        }
    }
}

/// What one frame wants the surrounding UI to know. Advisory only; no
/// acknowledgment expected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Smoothed FPS, populated on publish frames only.
    pub fps: Option<f32>,
    /// Live particle count after this frame's updates.
    pub particles: usize,
    /// False while the instability latch is raised.
    pub stable: bool,
    /// True on the frame where `stable` flipped.
    pub stability_changed: bool,
}

/// Top-level per-frame orchestrator over a [`Simulation`].
///
/// Owns the frame clock, the input force slot, the population
/// reconciler, and the simulation handle itself, plus the factory that
/// rebuilds the handle on reset.
pub struct FrameLoop<S: Simulation> {
    sim: S,
    rebuild: Box<dyn FnMut() -> S>,
    clock: FrameClock,
    input: ForceInput,
    reconciler: Reconciler,
    config: LoopConfig,
    desired: usize,
    unstable: bool,
    reset_pending: bool,
    frames: u64,
}

impl<S: Simulation + 'static> FrameLoop<S> {
    /// Build the loop, constructing the initial simulation from the
    /// factory. The desired count starts at whatever the fresh
    /// simulation reports.
    pub fn new<F>(rebuild: F, input: ForceInput, reconciler: Reconciler, config: LoopConfig) -> Self
    where
        F: FnMut() -> S + 'static,
    {
        let mut rebuild: Box<dyn FnMut() -> S> = Box::new(rebuild);
        let sim = rebuild();
        let desired = sim.len();
        Self {
            sim,
            rebuild,
            clock: FrameClock::new(config.fps_window),
            input,
            reconciler,
            config,
            desired,
            unstable: false,
            reset_pending: false,
            frames: 0,
        }
    }

    /// The live simulation. Read-only; mutation goes through the frame.
    #[inline]
    pub fn sim(&self) -> &S {
        &self.sim
    }

    #[inline]
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Input state, for the host's event callbacks to feed.
    #[inline]
    pub fn input_mut(&mut self) -> &mut ForceInput {
        &mut self.input
    }

    /// Ask for a fresh simulation at the next frame's reset point. The
    /// swap is deferred so a handle is never torn out from under an
    /// in-progress draw or force application.
    pub fn request_reset(&mut self) {
        self.reset_pending = true;
    }

    /// Set the particle-count target the reconciler converges toward.
    pub fn set_desired(&mut self, desired: usize) {
        self.desired = desired;
    }

    #[inline]
    pub fn desired(&self) -> usize {
        self.desired
    }

    /// Whether the instability latch is raised.
    #[inline]
    pub fn is_unstable(&self) -> bool {
        self.unstable
    }

    /// Run one frame at timestamp `now_ms`.
    ///
    /// A draw error aborts the frame where it happened; the recovery
    /// unit is the next scheduled frame or an explicit reset.
    pub fn frame<R: ParticleRenderer>(
        &mut self,
        now_ms: f64,
        renderer: &mut R,
    ) -> Result<FrameReport, RenderError> {
        self.clock.register(now_ms);

        renderer.draw(self.sim.particles(), (now_ms * 1e-3) as f32)?;

        let was_stable = !self.unstable;
        for _ in 0..self.config.substeps {
            self.sim.update(self.config.substep_dt);
            if self.sim.is_unstable() {
                self.unstable = true;
            }
        }
        if was_stable && self.unstable {
            log::warn!("simulation went unstable; holding the flag until reset");
        }

        if self.reset_pending {
            self.sim = (self.rebuild)();
            self.unstable = false;
            self.reset_pending = false;
            log::info!("simulation reset to initial configuration");
        }

        self.sim.clear_forces();
        if let Some(force) = self.input.sample(self.clock.delta()) {
            self.sim.add_force(force);
        }

        self.reconciler.reconcile(&mut self.sim, self.desired);

        let fps = (self.frames % self.config.publish_every == 0)
            .then(|| self.clock.smooth_fps());
        let stable = !self.unstable;
        let report = FrameReport {
            fps,
            particles: self.sim.len(),
            stable,
            stability_changed: stable != was_stable,
        };
        self.frames += 1;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ForceRamp, ScreenTransform};
    use crate::sim::Force;
    use glam::Vec2;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Update(f32),
        ClearForces,
        AddForce(Vec2),
        Spawn(usize),
        Despawn(usize),
    }

    /// Scripted simulation double recording every call the loop makes.
    struct ScriptSim {
        data: Vec<f32>,
        queued: i64,
        unstable_on_updates: Vec<u32>,
        updates: u32,
        ops: Vec<Op>,
    }

    impl ScriptSim {
        fn with_particles(count: usize) -> Self {
            let mut data = Vec::new();
            for i in 0..count {
                data.extend_from_slice(&[i as f32, 0.0, 0.0, 0.0]);
            }
            Self {
                data,
                queued: 0,
                unstable_on_updates: Vec::new(),
                updates: 0,
                ops: Vec::new(),
            }
        }
    }

    impl Simulation for ScriptSim {
        fn update(&mut self, dt: f32) {
            self.updates += 1;
            // Shift every particle so a draw can be dated against steps.
            for chunk in self.data.chunks_exact_mut(4) {
                chunk[0] += 1000.0;
            }
            self.ops.push(Op::Update(dt));
        }

        fn is_unstable(&self) -> bool {
            self.unstable_on_updates.contains(&self.updates)
        }

        fn len(&self) -> usize {
            self.data.len() / 4
        }

        fn queue_diff(&self) -> i64 {
            self.queued
        }

        fn queue_spawn(&mut self, count: usize, _x_min: f32, _x_max: f32) {
            self.queued += count as i64;
            self.ops.push(Op::Spawn(count));
        }

        fn queue_despawn(&mut self, count: usize) {
            self.queued -= count as i64;
            self.ops.push(Op::Despawn(count));
        }

        fn clear_forces(&mut self) {
            self.ops.push(Op::ClearForces);
        }

        fn add_force(&mut self, force: Force) {
            self.ops.push(Op::AddForce(force.position));
        }

        fn particles(&self) -> ParticleView<'_> {
            ParticleView::new(&self.data, 4)
        }
    }

    /// Renderer double that copies what each draw saw.
    #[derive(Default)]
    struct CaptureRenderer {
        frames: Vec<Vec<f32>>,
    }

    impl ParticleRenderer for CaptureRenderer {
        fn draw(&mut self, particles: ParticleView<'_>, _time: f32) -> Result<(), RenderError> {
            self.frames.push(particles.raw().to_vec());
            Ok(())
        }
    }

    fn test_input() -> ForceInput {
        let mut input = ForceInput::new(
            ScreenTransform::Identity,
            2e8,
            100.0,
            ForceRamp::Constant,
        );
        input.set_surface_size(700.0, 700.0);
        input
    }

    fn test_loop(initial: usize) -> FrameLoop<ScriptSim> {
        FrameLoop::new(
            move || ScriptSim::with_particles(initial),
            test_input(),
            Reconciler::new(5, 2, (25.0, 675.0)),
            LoopConfig::default(),
        )
    }

    #[test]
    fn draw_shows_the_previous_frames_state() {
        let mut frame_loop = test_loop(2);
        let mut renderer = CaptureRenderer::default();

        frame_loop.frame(0.0, &mut renderer).unwrap();
        frame_loop.frame(16.0, &mut renderer).unwrap();

        // Frame 1 drew untouched particles; frame 2 drew exactly the two
        // sub-steps of movement frame 1 produced, not its own.
        assert_eq!(renderer.frames[0][0], 0.0);
        assert_eq!(renderer.frames[1][0], 2000.0);
    }

    #[test]
    fn substeps_use_the_fixed_delta() {
        let mut frame_loop = test_loop(1);
        let mut renderer = CaptureRenderer::default();
        frame_loop.frame(0.0, &mut renderer).unwrap();

        let updates: Vec<_> = frame_loop
            .sim()
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Update(_)))
            .collect();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|op| **op == Op::Update(0.005)));
    }

    #[test]
    fn one_force_per_frame_while_held_none_otherwise() {
        let mut frame_loop = test_loop(1);
        let mut renderer = CaptureRenderer::default();

        frame_loop.frame(0.0, &mut renderer).unwrap();

        frame_loop.input_mut().moved(Vec2::new(100.0, 200.0));
        frame_loop.input_mut().press();
        frame_loop.frame(16.0, &mut renderer).unwrap();

        frame_loop.input_mut().release();
        frame_loop.frame(33.0, &mut renderer).unwrap();

        let forces: Vec<_> = frame_loop
            .sim()
            .ops
            .iter()
            .filter(|op| matches!(op, Op::AddForce(_)))
            .collect();
        assert_eq!(forces, vec![&Op::AddForce(Vec2::new(100.0, 200.0))]);

        // Every frame clears before any force is applied.
        let ops = &frame_loop.sim().ops;
        let clear_count = ops.iter().filter(|op| **op == Op::ClearForces).count();
        assert_eq!(clear_count, 3);
        let clear_idx = ops.iter().position(|op| *op == Op::ClearForces).unwrap();
        let force_idx = ops
            .iter()
            .position(|op| matches!(op, Op::AddForce(_)))
            .unwrap();
        assert!(clear_idx < force_idx);
    }

    #[test]
    fn force_clear_follows_every_substep_batch() {
        let mut frame_loop = test_loop(1);
        let mut renderer = CaptureRenderer::default();
        frame_loop.input_mut().press();
        frame_loop.frame(0.0, &mut renderer).unwrap();

        assert_eq!(
            frame_loop.sim().ops,
            vec![
                Op::Update(0.005),
                Op::Update(0.005),
                Op::ClearForces,
                Op::AddForce(Vec2::ZERO),
            ]
        );
    }

    #[test]
    fn instability_latches_until_reset() {
        let mut frame_loop = test_loop(1);
        let mut renderer = CaptureRenderer::default();

        // Unstable only during the first update; self-recovers after.
        frame_loop.sim.unstable_on_updates = vec![1];

        let report = frame_loop.frame(0.0, &mut renderer).unwrap();
        assert!(!report.stable);
        assert!(report.stability_changed);

        // The sim reports stable again, but the latch holds.
        let report = frame_loop.frame(16.0, &mut renderer).unwrap();
        assert!(!report.stable);
        assert!(!report.stability_changed);
        assert!(frame_loop.is_unstable());
    }

    #[test]
    fn reset_swaps_the_handle_and_clears_the_latch() {
        let mut frame_loop = test_loop(3);
        let mut renderer = CaptureRenderer::default();

        frame_loop.sim.unstable_on_updates = vec![1, 2, 3, 4, 5, 6];
        frame_loop.frame(0.0, &mut renderer).unwrap();
        assert!(frame_loop.is_unstable());

        frame_loop.request_reset();
        let report = frame_loop.frame(16.0, &mut renderer).unwrap();

        assert!(report.stable);
        assert!(report.stability_changed);
        assert_eq!(frame_loop.sim().len(), 3);
        // The sub-steps of that frame still ran on the old handle; the
        // fresh one has only seen the post-reset force clear.
        assert_eq!(frame_loop.sim().updates, 0);
        assert_eq!(frame_loop.sim().ops, vec![Op::ClearForces]);
    }

    #[test]
    fn reconciliation_converges_toward_the_desired_count() {
        let mut frame_loop = test_loop(2);
        let mut renderer = CaptureRenderer::default();

        frame_loop.set_desired(9);
        frame_loop.frame(0.0, &mut renderer).unwrap();
        frame_loop.frame(16.0, &mut renderer).unwrap();

        let spawns: Vec<_> = frame_loop
            .sim()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Spawn(n) => Some(*n),
                _ => None,
            })
            .collect();
        // Batch of 5, then the exact remainder of 2 under the effective
        // count rule.
        assert_eq!(spawns, vec![5, 2]);
    }

    #[test]
    fn fps_publishes_on_the_configured_cadence() {
        let config = LoopConfig {
            publish_every: 2,
            ..LoopConfig::default()
        };
        let mut frame_loop = FrameLoop::new(
            || ScriptSim::with_particles(1),
            test_input(),
            Reconciler::new(5, 2, (0.0, 700.0)),
            config,
        );
        let mut renderer = CaptureRenderer::default();

        let mut published = Vec::new();
        for i in 0..6 {
            let report = frame_loop.frame(i as f64 * 16.0, &mut renderer).unwrap();
            published.push(report.fps.is_some());
        }
        assert_eq!(published, vec![true, false, true, false, true, false]);
    }

    #[test]
    fn desired_count_defaults_to_the_initial_population() {
        let frame_loop = test_loop(42);
        assert_eq!(frame_loop.desired(), 42);
    }

    #[test]
    fn draw_error_aborts_the_frame_before_stepping() {
        struct FailingRenderer;
        impl ParticleRenderer for FailingRenderer {
            fn draw(&mut self, _: ParticleView<'_>, _: f32) -> Result<(), RenderError> {
                Err(RenderError::Surface(wgpu::SurfaceError::Timeout))
            }
        }

        let mut frame_loop = test_loop(1);
        assert!(frame_loop.frame(0.0, &mut FailingRenderer).is_err());
        // No partial frame: the simulation never advanced.
        assert!(frame_loop.sim().ops.is_empty());
    }
}
