//! Interactive splash demo.
//!
//! Hold the mouse (or a finger) to pull droplets toward the cursor.
//! `R` resets, `P`/`ArrowUp` and `O`/`ArrowDown` grow and shrink the
//! population target.
//!
//! Run with: `cargo run --example splash`

#[path = "common/sim.rs"]
mod sim;

use plume::Viewer;
use sim::Droplets;

const WIDTH: f32 = 700.0;
const HEIGHT: f32 = 700.0;

fn main() -> Result<(), plume::ViewerError> {
    Viewer::new(WIDTH, HEIGHT, || Droplets::new(WIDTH, HEIGHT, 500))
        .with_title("plume splash")
        .with_desired_count(500)
        .with_substeps(2, 0.005)
        .with_force(2e8, 100.0)
        .with_batch_sizes(5, 2)
        .with_particle_size(12.0)
        .with_tint([0.35, 0.65, 1.0, 0.9])
        .run()
}
