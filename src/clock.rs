//! Frame timing over a fixed rolling window.
//!
//! [`FrameClock`] collects inter-frame deltas into a ring buffer and
//! derives an instantaneous and a smoothed frame rate from them. The
//! smoothed rate is what gets published to the UI; the instantaneous
//! rate jitters too much to display directly.
//!
//! # Example
//!
//! ```
//! use plume::FrameClock;
//!
//! let mut clock = FrameClock::new(20);
//! clock.register(0.0);
//! clock.register(16.7);
//! assert!(clock.smooth_fps() > 59.0);
//! ```

/// Rolling-window frame-time sampler.
///
/// Timestamps are registered in milliseconds, the unit a display-refresh
/// callback hands out; rates are reported in frames per second. The
/// window is allocated once at construction and never resized.
#[derive(Debug)]
pub struct FrameClock {
    samples: Vec<f32>,
    cursor: usize,
    filled: usize,
    last_ms: Option<f64>,
    last_delta: f32,
}

impl FrameClock {
    /// Create a clock averaging over `window` frames.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "frame clock window must be nonzero");
        Self {
            samples: vec![0.0; window],
            cursor: 0,
            filled: 0,
            last_ms: None,
            last_delta: 0.0,
        }
    }

    /// Record one frame boundary.
    ///
    /// The first call only establishes a baseline: there is no delta yet,
    /// so no sample is stored and the reported rates stay at zero instead
    /// of dividing by zero.
    pub fn register(&mut self, now_ms: f64) {
        let Some(last) = self.last_ms.replace(now_ms) else {
            return;
        };
        let delta = ((now_ms - last) / 1000.0) as f32;
        self.last_delta = delta;

        self.samples[self.cursor] = delta;
        self.cursor = (self.cursor + 1) % self.samples.len();
        self.filled = (self.filled + 1).min(self.samples.len());
    }

    /// Time between the two most recent frames, in seconds.
    ///
    /// Zero until two timestamps have been registered.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.last_delta
    }

    /// Rate derived from the last delta alone. Zero when undefined.
    pub fn instant_fps(&self) -> f32 {
        if self.last_delta > 0.0 {
            1.0 / self.last_delta
        } else {
            0.0
        }
    }

    /// Samples-in-window divided by their summed duration.
    ///
    /// Averages over however many samples exist until the window fills,
    /// then over exactly the window. Zero while empty.
    pub fn smooth_fps(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        let sum: f32 = self.samples[..self.filled].iter().sum();
        if sum > 0.0 {
            self.filled as f32 / sum
        } else {
            0.0
        }
    }

    /// Number of deltas currently contributing to the smoothed rate.
    #[inline]
    pub fn samples(&self) -> usize {
        self.filled
    }

    /// Forget all recorded timing.
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
        self.cursor = 0;
        self.filled = 0;
        self.last_ms = None;
        self.last_delta = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rate_before_two_timestamps() {
        let mut clock = FrameClock::new(10);
        assert_eq!(clock.smooth_fps(), 0.0);
        assert_eq!(clock.instant_fps(), 0.0);

        clock.register(100.0);
        assert_eq!(clock.delta(), 0.0);
        assert_eq!(clock.smooth_fps(), 0.0);
        assert_eq!(clock.instant_fps(), 0.0);
    }

    #[test]
    fn smooth_rate_is_samples_over_sum() {
        let mut clock = FrameClock::new(10);
        for t in [0.0, 16.0, 33.0, 50.0] {
            clock.register(t);
        }
        // 3 deltas over 50ms total.
        assert_eq!(clock.samples(), 3);
        let expected = 3.0 / 0.050;
        assert!((clock.smooth_fps() - expected).abs() < 1e-3);
    }

    #[test]
    fn instant_rate_uses_last_delta() {
        let mut clock = FrameClock::new(10);
        clock.register(0.0);
        clock.register(20.0);
        assert!((clock.instant_fps() - 50.0).abs() < 1e-4);
        assert!((clock.delta() - 0.020).abs() < 1e-6);
    }

    #[test]
    fn window_wraps_and_evicts_oldest() {
        let mut clock = FrameClock::new(3);
        // First delta is a 100ms outlier, then steady 10ms frames.
        for t in [0.0, 100.0, 110.0, 120.0, 130.0] {
            clock.register(t);
        }
        // Window holds the last three deltas (10ms each); the outlier is
        // gone. Averaging it in would give 25ms per frame instead.
        assert_eq!(clock.samples(), 3);
        assert!((clock.smooth_fps() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn partial_window_averages_what_it_has() {
        let mut clock = FrameClock::new(100);
        clock.register(0.0);
        clock.register(25.0);
        assert!((clock.smooth_fps() - 40.0).abs() < 1e-3);
    }

    #[test]
    fn reset_clears_history() {
        let mut clock = FrameClock::new(4);
        clock.register(0.0);
        clock.register(16.0);
        clock.reset();
        assert_eq!(clock.samples(), 0);
        assert_eq!(clock.smooth_fps(), 0.0);

        // The next register is a fresh baseline, not a huge delta.
        clock.register(5000.0);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    #[should_panic]
    fn zero_window_panics() {
        let _ = FrameClock::new(0);
    }
}
