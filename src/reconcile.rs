//! Batched reconciliation of the particle population.
//!
//! The simulation materializes spawns and despawns asynchronously, so a
//! desired-count target cannot be applied in one shot without overshoot:
//! requests already queued have not shown up in the live count yet.
//! [`Reconciler`] compares the target against `live + queue_diff` and
//! nudges the population by at most one batch per frame, which bounds
//! per-frame population change and keeps the visual impact smooth.

use crate::sim::Simulation;

/// What a reconciliation step requested from the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Effective count already matches the target.
    Converged,
    /// Queued this many spawns.
    Spawned(usize),
    /// Queued this many despawns.
    Despawned(usize),
}

/// Converges the simulation population toward a desired count, one batch
/// per frame.
///
/// The final batch is partial when the remaining gap is smaller than a
/// batch, so convergence is exact and the reconciler never oscillates
/// around a target that is not a batch multiple.
#[derive(Debug, Clone)]
pub struct Reconciler {
    spawn_batch: usize,
    despawn_batch: usize,
    spawn_region: (f32, f32),
}

impl Reconciler {
    /// Create a reconciler spawning into the `[x_min, x_max]` region.
    ///
    /// # Panics
    ///
    /// Panics if either batch size is zero; a zero batch can never
    /// converge.
    pub fn new(spawn_batch: usize, despawn_batch: usize, spawn_region: (f32, f32)) -> Self {
        assert!(spawn_batch > 0, "spawn batch must be nonzero");
        assert!(despawn_batch > 0, "despawn batch must be nonzero");
        Self {
            spawn_batch,
            despawn_batch,
            spawn_region,
        }
    }

    #[inline]
    pub fn spawn_batch(&self) -> usize {
        self.spawn_batch
    }

    #[inline]
    pub fn despawn_batch(&self) -> usize {
        self.despawn_batch
    }

    /// Run one reconciliation step against `desired`.
    ///
    /// Uses the effective count `live + queue_diff` as the comparison
    /// basis, so repeated calls while a batch is still in flight do not
    /// double-request.
    pub fn reconcile<S: Simulation>(&self, sim: &mut S, desired: usize) -> Reconciliation {
        let effective = sim.len() as i64 + sim.queue_diff();
        debug_assert!(
            effective >= 0,
            "simulation reports more queued despawns than live particles"
        );
        let desired = desired as i64;

        if desired > effective {
            let count = ((desired - effective) as usize).min(self.spawn_batch);
            let (x_min, x_max) = self.spawn_region;
            sim.queue_spawn(count, x_min, x_max);
            Reconciliation::Spawned(count)
        } else if desired < effective {
            let count = ((effective - desired) as usize).min(self.despawn_batch);
            sim.queue_despawn(count);
            Reconciliation::Despawned(count)
        } else {
            Reconciliation::Converged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Force, ParticleView};

    /// Simulation double that applies queued population changes on the
    /// next `update`, like the real engine's event queue.
    struct QueueSim {
        live: usize,
        queued: i64,
        data: Vec<f32>,
        spawn_calls: Vec<(usize, f32, f32)>,
        despawn_calls: Vec<usize>,
    }

    impl QueueSim {
        fn new(live: usize) -> Self {
            Self {
                live,
                queued: 0,
                data: Vec::new(),
                spawn_calls: Vec::new(),
                despawn_calls: Vec::new(),
            }
        }
    }

    impl Simulation for QueueSim {
        fn update(&mut self, _dt: f32) {
            self.live = (self.live as i64 + self.queued).max(0) as usize;
            self.queued = 0;
        }

        fn is_unstable(&self) -> bool {
            false
        }

        fn len(&self) -> usize {
            self.live
        }

        fn queue_diff(&self) -> i64 {
            self.queued
        }

        fn queue_spawn(&mut self, count: usize, x_min: f32, x_max: f32) {
            self.queued += count as i64;
            self.spawn_calls.push((count, x_min, x_max));
        }

        fn queue_despawn(&mut self, count: usize) {
            self.queued -= count as i64;
            self.despawn_calls.push(count);
        }

        fn clear_forces(&mut self) {}

        fn add_force(&mut self, _force: Force) {}

        fn particles(&self) -> ParticleView<'_> {
            ParticleView::new(&self.data, 4)
        }
    }

    #[test]
    fn spawns_one_batch_toward_target() {
        let reconciler = Reconciler::new(5, 2, (25.0, 675.0));
        let mut sim = QueueSim::new(500);

        let action = reconciler.reconcile(&mut sim, 510);
        assert_eq!(action, Reconciliation::Spawned(5));
        assert_eq!(sim.spawn_calls, vec![(5, 25.0, 675.0)]);
        assert!(sim.despawn_calls.is_empty());
    }

    #[test]
    fn in_flight_requests_count_toward_the_target() {
        let reconciler = Reconciler::new(5, 2, (25.0, 675.0));
        let mut sim = QueueSim::new(500);
        sim.queued = 5;

        // live 500 + queued 5 already covers the target.
        let action = reconciler.reconcile(&mut sim, 505);
        assert_eq!(action, Reconciliation::Converged);
        assert!(sim.spawn_calls.is_empty());
        assert!(sim.despawn_calls.is_empty());
    }

    #[test]
    fn despawns_when_over_target() {
        let reconciler = Reconciler::new(5, 2, (25.0, 675.0));
        let mut sim = QueueSim::new(520);

        let action = reconciler.reconcile(&mut sim, 500);
        assert_eq!(action, Reconciliation::Despawned(2));
        assert_eq!(sim.despawn_calls, vec![2]);
    }

    #[test]
    fn final_batch_is_the_exact_remainder() {
        let reconciler = Reconciler::new(5, 2, (0.0, 100.0));

        let mut sim = QueueSim::new(500);
        assert_eq!(reconciler.reconcile(&mut sim, 503), Reconciliation::Spawned(3));

        let mut sim = QueueSim::new(501);
        assert_eq!(
            reconciler.reconcile(&mut sim, 500),
            Reconciliation::Despawned(1)
        );
    }

    #[test]
    fn converges_and_stops() {
        let reconciler = Reconciler::new(5, 5, (0.0, 100.0));
        let mut sim = QueueSim::new(500);
        let desired = 517;

        // Each iteration queues one batch and lets the sim apply it.
        let mut steps = 0;
        while reconciler.reconcile(&mut sim, desired) != Reconciliation::Converged {
            sim.update(0.0);
            steps += 1;
            assert!(steps <= 4, "reconciler failed to terminate");
        }
        assert_eq!(sim.live, desired);
        // ceil(17 / 5) batches.
        assert_eq!(steps, 4);

        // Once converged it stays quiet.
        let calls = sim.spawn_calls.len();
        assert_eq!(reconciler.reconcile(&mut sim, desired), Reconciliation::Converged);
        assert_eq!(sim.spawn_calls.len(), calls);
    }

    #[test]
    #[should_panic]
    fn zero_batch_panics() {
        let _ = Reconciler::new(0, 2, (0.0, 1.0));
    }
}
