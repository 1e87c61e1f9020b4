//! Pointer and touch input, mapped to a simulation-space force.
//!
//! [`ForceInput`] owns the one piece of input state the frame loop cares
//! about: a single active press/drag/release gesture. Window callbacks
//! feed it through the transition methods, and the loop queries it
//! exactly once per frame with [`ForceInput::sample`]. Event handlers
//! never touch simulation state directly.
//!
//! # Usage
//!
//! ```
//! use plume::{ForceInput, ForceRamp, ScreenTransform, Vec2};
//!
//! let transform = ScreenTransform::Canvas {
//!     sim_width: 700.0,
//!     sim_height: 700.0,
//!     flip_y: true,
//! };
//! let mut input = ForceInput::new(transform, 2e8, 100.0, ForceRamp::Constant);
//! input.set_surface_size(1400.0, 1400.0);
//!
//! input.moved(Vec2::new(700.0, 1400.0));
//! input.press();
//! let force = input.sample(1.0 / 60.0).unwrap();
//! assert_eq!(force.position, Vec2::new(350.0, 0.0));
//! ```

use glam::Vec2;

use crate::sim::Force;

/// How UI pixel coordinates map into simulation space.
///
/// Callers must declare the convention in use; guessing it produces
/// forces that land mirrored or offscreen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScreenTransform {
    /// UI coordinates already are simulation coordinates.
    Identity,
    /// Normalize by the surface size, optionally flip Y (window pixels
    /// grow downward, most simulation spaces grow upward), then scale to
    /// the simulation extents.
    Canvas {
        sim_width: f32,
        sim_height: f32,
        flip_y: bool,
    },
}

impl ScreenTransform {
    /// Map a surface-pixel position into simulation space.
    pub fn apply(&self, pos: Vec2, surface: Vec2) -> Vec2 {
        match *self {
            ScreenTransform::Identity => pos,
            ScreenTransform::Canvas {
                sim_width,
                sim_height,
                flip_y,
            } => {
                if surface.x <= 0.0 || surface.y <= 0.0 {
                    return Vec2::ZERO;
                }
                let mut n = pos / surface;
                if flip_y {
                    n.y = 1.0 - n.y;
                }
                Vec2::new(n.x * sim_width, n.y * sim_height)
            }
        }
    }
}

/// Magnitude policy for a held gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForceRamp {
    /// The configured magnitude for as long as the gesture is held.
    Constant,
    /// Magnitude grows linearly with hold time, up to `max`.
    Linear { per_second: f32, max: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    held_secs: f32,
}

/// Single-gesture input state, queried once per frame.
///
/// Tracks the latest cursor position and whether a press is active.
/// Multiple simultaneous touches are not modeled: the most recent press
/// owns the one force slot.
#[derive(Debug)]
pub struct ForceInput {
    transform: ScreenTransform,
    magnitude: f32,
    radius: f32,
    ramp: ForceRamp,
    surface: Vec2,
    cursor: Vec2,
    gesture: Option<Gesture>,
}

impl ForceInput {
    pub fn new(transform: ScreenTransform, magnitude: f32, radius: f32, ramp: ForceRamp) -> Self {
        Self {
            transform,
            magnitude,
            radius,
            ramp,
            surface: Vec2::ZERO,
            cursor: Vec2::ZERO,
            gesture: None,
        }
    }

    /// Update the surface size used by the coordinate transform. Call on
    /// window resize.
    pub fn set_surface_size(&mut self, width: f32, height: f32) {
        self.surface = Vec2::new(width, height);
    }

    /// Record a cursor or touch position in surface pixels.
    pub fn moved(&mut self, pos: Vec2) {
        self.cursor = pos;
    }

    /// Begin a gesture at the current cursor position. A press while a
    /// gesture is active restarts it, ramp included.
    pub fn press(&mut self) {
        self.gesture = Some(Gesture { held_secs: 0.0 });
    }

    /// End the active gesture, if any.
    pub fn release(&mut self) {
        self.gesture = None;
    }

    /// Whether a gesture is currently held.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Produce this frame's force, advancing the ramp clock by `dt`.
    ///
    /// Returns `None` while no gesture is active. The frame loop calls
    /// this exactly once per frame, after clearing the simulation's
    /// force set.
    pub fn sample(&mut self, dt: f32) -> Option<Force> {
        let gesture = self.gesture.as_mut()?;
        let magnitude = match self.ramp {
            ForceRamp::Constant => self.magnitude,
            ForceRamp::Linear { per_second, max } => {
                (self.magnitude + per_second * gesture.held_secs).min(max)
            }
        };
        gesture.held_secs += dt;

        let position = self.transform.apply(self.cursor, self.surface);
        Some(Force {
            position,
            magnitude,
            radius: self.radius,
        })
    }
}
