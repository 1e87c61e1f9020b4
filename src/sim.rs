//! The simulation handle contract.
//!
//! The simulation that owns particle state is an external collaborator;
//! plume drives it exclusively through the [`Simulation`] trait and reads
//! its attribute memory through a [`ParticleView`]. The view borrows the
//! simulation, so it cannot outlive the next `update` call: the backing
//! region may be reallocated whenever the simulation advances or resizes.

use glam::Vec2;

/// A transient radial force, rebuilt from input state every frame.
///
/// Forces do not persist: the frame loop clears the simulation's force
/// set each frame and re-submits at most one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Force {
    /// Center of the force in simulation space.
    pub position: Vec2,
    /// Strength of the force.
    pub magnitude: f32,
    /// Falloff radius in simulation units.
    pub radius: f32,
}

impl Force {
    pub fn new(x: f32, y: f32, magnitude: f32, radius: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            magnitude,
            radius,
        }
    }
}

/// Read-only view of the simulation's raw particle attribute memory.
///
/// The layout is `len * stride` f32 fields, interleaved per particle:
/// 2D position first, 2D velocity next when the stride allows it, then
/// whatever else the simulation carries. Stride is a runtime value
/// reported by the simulation, never assumed at compile time.
#[derive(Debug, Clone, Copy)]
pub struct ParticleView<'a> {
    data: &'a [f32],
    stride: usize,
}

impl<'a> ParticleView<'a> {
    /// Wrap raw attribute memory. `stride` is the number of f32 fields
    /// per particle and must describe `data` exactly.
    ///
    /// # Panics
    ///
    /// Panics if the stride cannot hold a 2D position or does not divide
    /// the memory length. A silently truncated view would corrupt the
    /// visual output without signaling the cause.
    pub fn new(data: &'a [f32], stride: usize) -> Self {
        assert!(
            stride >= 2,
            "particle stride must cover a 2D position, got {stride}"
        );
        assert_eq!(
            data.len() % stride,
            0,
            "attribute memory length {} is not a multiple of stride {}",
            data.len(),
            stride
        );
        Self { data, stride }
    }

    /// Number of particle records in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.stride
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fields per particle record.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The underlying interleaved memory.
    #[inline]
    pub fn raw(&self) -> &'a [f32] {
        self.data
    }

    /// Position of particle `index`.
    pub fn position(&self, index: usize) -> Vec2 {
        let base = index * self.stride;
        Vec2::new(self.data[base], self.data[base + 1])
    }

    /// Velocity of particle `index`.
    ///
    /// # Panics
    ///
    /// Panics if the stride does not carry a velocity pair.
    pub fn velocity(&self, index: usize) -> Vec2 {
        assert!(
            self.stride >= 4,
            "stride {} carries no velocity fields",
            self.stride
        );
        let base = index * self.stride;
        Vec2::new(self.data[base + 2], self.data[base + 3])
    }
}

/// Contract for the externally-owned particle simulation.
///
/// Everything the frame loop needs from a simulation and nothing more:
/// fixed-step advancement, force injection, population queueing, a
/// stability signal, and per-frame access to raw particle memory. Test
/// doubles implement the same trait.
///
/// Reconstruction with identical configuration (for reset) is modeled as
/// a factory closure handed to [`FrameLoop`](crate::FrameLoop), not as a
/// trait method: the old handle is discarded wholesale.
pub trait Simulation {
    /// Advance one sub-step of `dt` seconds.
    fn update(&mut self, dt: f32);

    /// Whether the numerical state has gone unstable. The simulation may
    /// self-recover; the frame loop latches the flag regardless until an
    /// explicit reset.
    fn is_unstable(&self) -> bool;

    /// Live particle count.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signed count of queued spawns minus queued despawns that have not
    /// yet materialized in [`len`](Simulation::len).
    fn queue_diff(&self) -> i64;

    /// Queue `count` spawns inside the `[x_min, x_max]` region.
    fn queue_spawn(&mut self, count: usize, x_min: f32, x_max: f32);

    /// Queue `count` despawns.
    fn queue_despawn(&mut self, count: usize);

    /// Drop all active forces.
    fn clear_forces(&mut self);

    /// Register a force acting on subsequent updates.
    fn add_force(&mut self, force: Force);

    /// Borrow the raw attribute memory for the current frame only.
    fn particles(&self) -> ParticleView<'_>;
}
