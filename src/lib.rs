//! # Plume
//!
//! Frame-loop controller and GPU render bridge for real-time particle
//! simulations.
//!
//! Plume is the presentation layer for a simulation you own: it mirrors
//! the simulation's particle memory into a GPU instance buffer every
//! frame, advances the simulation in fixed sub-steps, forwards pointer
//! and touch gestures as transient forces, reconciles a desired
//! particle-count target through the simulation's spawn/despawn queue,
//! and reports stability and a smoothed frame rate back to the host.
//!
//! ## Quick Start
//!
//! ```ignore
//! use plume::prelude::*;
//!
//! struct Droplets { /* particle state */ }
//!
//! impl Simulation for Droplets {
//!     // update, forces, queueing, particles()...
//! }
//!
//! fn main() -> Result<(), plume::ViewerError> {
//!     Viewer::new(700.0, 700.0, || Droplets::new(700.0, 700.0, 500))
//!         .with_desired_count(500)
//!         .with_force(2e8, 100.0)
//!         .run()
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### The simulation is a black box
//!
//! Plume never looks inside the simulation. The [`Simulation`] trait is
//! the whole contract: advance, inject forces, queue population changes,
//! report stability, and expose raw particle memory as a
//! [`ParticleView`]. The view borrows the simulation, so it cannot be
//! held across an `update` call; the backing memory may move whenever
//! the simulation advances.
//!
//! ### One frame, fixed order
//!
//! Every frame runs the same sequence: clock, draw (of the previous
//! frame's state), sub-steps, deferred reset, force clear and re-apply,
//! population reconciliation, report. See [`FrameLoop`].
//!
//! ### The instance buffer tracks the population exactly
//!
//! [`ParticleRenderBuffer`] reallocates to the exact live count whenever
//! it changes and repacks the simulation's interleave into the
//! renderer's each frame. Strides are runtime values; nothing about the
//! particle layout is compiled in.
//!
//! | Component | Role |
//! |-----------|------|
//! | [`Viewer`] | window and event-loop host, builder-configured |
//! | [`FrameLoop`] | fixed per-frame orchestration |
//! | [`ParticleRenderBuffer`] | GPU instance buffer mirroring the population |
//! | [`FrameClock`] | rolling-window frame rate |
//! | [`ForceInput`] | pointer/touch gesture to simulation-space force |
//! | [`Reconciler`] | batched convergence toward a population target |

pub mod clock;
pub mod controller;
mod error;
pub mod gpu;
pub mod input;
pub mod reconcile;
pub mod shader;
pub mod sim;
mod viewer;

pub use clock::FrameClock;
pub use controller::{FrameLoop, FrameReport, LoopConfig, ParticleRenderer};
pub use error::{GpuError, RenderError, ViewerError};
pub use glam::Vec2;
pub use gpu::{pack_instances, GpuState, ParticleRenderBuffer, RENDER_STRIDE};
pub use input::{ForceInput, ForceRamp, ScreenTransform};
pub use reconcile::{Reconciler, Reconciliation};
pub use shader::PARTICLE_SHADER;
pub use sim::{Force, ParticleView, Simulation};
pub use viewer::Viewer;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use plume::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::FrameClock;
    pub use crate::controller::{FrameLoop, FrameReport, LoopConfig, ParticleRenderer};
    pub use crate::error::{GpuError, RenderError, ViewerError};
    pub use crate::input::{ForceInput, ForceRamp, ScreenTransform};
    pub use crate::reconcile::{Reconciler, Reconciliation};
    pub use crate::sim::{Force, ParticleView, Simulation};
    pub use crate::viewer::Viewer;
    pub use crate::Vec2;
}
