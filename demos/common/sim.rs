//! A tiny ballistic particle toy shared by the demos.
//!
//! Implements just enough of the `Simulation` contract to drive the
//! viewer: gravity, wall bounces, radial gesture forces, a deferred
//! spawn/despawn queue, and a speed-limit instability signal. It stands
//! in for a real solver without being one.

use plume::{Force, ParticleView, Simulation, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// x, y, vx, vy, age. The extra field is deliberately past what the
/// renderer consumes, so the demos exercise the repack path.
const STRIDE: usize = 5;

const BOUNCE_DAMPING: f32 = 0.6;
const SPEED_LIMIT: f32 = 50_000.0;

pub struct Droplets {
    width: f32,
    height: f32,
    gravity: f32,
    data: Vec<f32>,
    forces: Vec<Force>,
    queued: i64,
    spawn_region: (f32, f32),
    unstable: bool,
    rng: StdRng,
}

impl Droplets {
    pub fn new(width: f32, height: f32, count: usize) -> Self {
        let mut sim = Self {
            width,
            height,
            gravity: -2000.0,
            data: Vec::with_capacity(count * STRIDE),
            forces: Vec::new(),
            queued: 0,
            spawn_region: (25.0, width - 25.0),
            unstable: false,
            rng: StdRng::seed_from_u64(0x5eed),
        };
        sim.materialize(count);
        sim
    }

    // Not every demo overrides gravity.
    #[allow(dead_code)]
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    fn materialize(&mut self, count: usize) {
        let (x_min, x_max) = self.spawn_region;
        for _ in 0..count {
            let x = self.rng.gen_range(x_min..x_max);
            let y = self.rng.gen_range(self.height * 0.5..self.height - 25.0);
            let vx = self.rng.gen_range(-30.0..30.0);
            self.data.extend_from_slice(&[x, y, vx, 0.0, 0.0]);
        }
    }

    fn drain_queue(&mut self) {
        if self.queued > 0 {
            self.materialize(self.queued as usize);
        } else if self.queued < 0 {
            let drop = ((-self.queued) as usize).min(self.len());
            self.data.truncate(self.data.len() - drop * STRIDE);
        }
        self.queued = 0;
    }
}

impl Simulation for Droplets {
    fn update(&mut self, dt: f32) {
        self.drain_queue();

        let count = self.data.len() / STRIDE;
        for i in 0..count {
            let base = i * STRIDE;
            let pos = Vec2::new(self.data[base], self.data[base + 1]);
            let mut vel = Vec2::new(self.data[base + 2], self.data[base + 3]);

            vel.y += self.gravity * dt;
            for force in &self.forces {
                let to_center = force.position - pos;
                let dist = to_center.length();
                if dist > 1e-3 && dist < force.radius {
                    let pull = force.magnitude * 2e-5 * (1.0 - dist / force.radius);
                    vel += to_center / dist * pull * dt;
                }
            }

            let mut next = pos + vel * dt;
            if next.x < 0.0 {
                next.x = 0.0;
                vel.x = -vel.x * BOUNCE_DAMPING;
            } else if next.x > self.width {
                next.x = self.width;
                vel.x = -vel.x * BOUNCE_DAMPING;
            }
            if next.y < 0.0 {
                next.y = 0.0;
                vel.y = -vel.y * BOUNCE_DAMPING;
            } else if next.y > self.height {
                next.y = self.height;
                vel.y = -vel.y * BOUNCE_DAMPING;
            }

            if !next.x.is_finite() || !next.y.is_finite() || vel.length() > SPEED_LIMIT {
                self.unstable = true;
            }

            self.data[base] = next.x;
            self.data[base + 1] = next.y;
            self.data[base + 2] = vel.x;
            self.data[base + 3] = vel.y;
            self.data[base + 4] += dt;
        }
    }

    fn is_unstable(&self) -> bool {
        self.unstable
    }

    fn len(&self) -> usize {
        self.data.len() / STRIDE
    }

    fn queue_diff(&self) -> i64 {
        self.queued
    }

    fn queue_spawn(&mut self, count: usize, x_min: f32, x_max: f32) {
        self.spawn_region = (x_min, x_max);
        self.queued += count as i64;
    }

    fn queue_despawn(&mut self, count: usize) {
        self.queued -= count as i64;
    }

    fn clear_forces(&mut self) {
        self.forces.clear();
    }

    fn add_force(&mut self, force: Force) {
        self.forces.push(force);
    }

    fn particles(&self) -> ParticleView<'_> {
        ParticleView::new(&self.data, STRIDE)
    }
}
