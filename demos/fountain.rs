//! Fountain variant: a denser, warmer spray with a ramping gesture
//! force. Holding the press makes the pull grow until it saturates.
//!
//! Run with: `cargo run --example fountain`

#[path = "common/sim.rs"]
mod sim;

use plume::{ForceRamp, Viewer};
use sim::Droplets;

const WIDTH: f32 = 900.0;
const HEIGHT: f32 = 700.0;

fn main() -> Result<(), plume::ViewerError> {
    Viewer::new(WIDTH, HEIGHT, || {
        Droplets::new(WIDTH, HEIGHT, 900).with_gravity(-1200.0)
    })
    .with_title("plume fountain")
    .with_window_size(900, 700)
    .with_desired_count(900)
    .with_force(1e8, 140.0)
    .with_force_ramp(ForceRamp::Linear {
        per_second: 2e8,
        max: 6e8,
    })
    .with_batch_sizes(10, 4)
    .with_particle_size(9.0)
    .with_tint([1.0, 0.7, 0.35, 0.85])
    .run()
}
