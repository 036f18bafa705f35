//! Fixed timestep frame clock
//!
//! Turns wall-clock frame times into a number of simulation ticks. A slow
//! frame may catch up by a bounded number of extra ticks; anything beyond that
//! is dropped so the game slows down instead of spiralling.

use crate::consts::{MAX_FRAME_SKIPS, SIM_DT};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameClock {
    accumulator: f32,
    max_frame_skips: u32,
    /// Ticks discarded over the clock's lifetime
    dropped_ticks: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(MAX_FRAME_SKIPS)
    }
}

impl FrameClock {
    pub fn new(max_frame_skips: u32) -> Self {
        Self {
            accumulator: 0.0,
            max_frame_skips,
            dropped_ticks: 0,
        }
    }

    /// Most ticks a single frame can yield
    pub fn max_ticks_per_frame(&self) -> u32 {
        1 + self.max_frame_skips
    }

    /// Add `elapsed` seconds and return how many ticks to run this frame
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }

        let mut ticks = 0;
        while self.accumulator >= SIM_DT && ticks < self.max_ticks_per_frame() {
            self.accumulator -= SIM_DT;
            ticks += 1;
        }

        if self.accumulator >= SIM_DT {
            let backlog = (self.accumulator / SIM_DT) as u64;
            self.dropped_ticks += backlog;
            self.accumulator %= SIM_DT;
            log::debug!("Frame clock fell behind, dropped {backlog} ticks");
        }
        ticks
    }

    /// Fraction of a tick left over, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / SIM_DT
    }

    pub fn dropped_ticks(&self) -> u64 {
        self.dropped_ticks
    }

    /// Forget any pending time (after a pause or a restart)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_tick_per_frame_at_sixty_hz() {
        let mut clock = FrameClock::default();
        for _ in 0..120 {
            assert_eq!(clock.advance(SIM_DT), 1);
        }
        assert_eq!(clock.dropped_ticks(), 0);
    }

    #[test]
    fn test_fast_frames_accumulate() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(SIM_DT * 0.6), 0);
        assert!(clock.alpha() > 0.5);
        assert_eq!(clock.advance(SIM_DT * 0.6), 1);
    }

    #[test]
    fn test_slow_frame_is_bounded() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(1.0), 6);
        assert!(clock.dropped_ticks() >= 50);
        assert!(clock.alpha() < 1.0);
        // The backlog is gone, not deferred
        assert_eq!(clock.advance(0.0), 0);
    }

    #[test]
    fn test_bad_elapsed_ignored() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.advance(f32::NAN), 0);
        assert_eq!(clock.advance(SIM_DT), 1);
    }

    proptest! {
        #[test]
        fn ticks_never_exceed_bound(frames in proptest::collection::vec(0.0f32..0.5, 1..50)) {
            let mut clock = FrameClock::new(2);
            for elapsed in frames {
                prop_assert!(clock.advance(elapsed) <= 3);
                prop_assert!(clock.alpha() <= 1.0);
            }
        }
    }
}
