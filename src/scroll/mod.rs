//! Viewport motion: the spring animator that moves a scroll container to a
//! target offset, and the scroll spy that tracks which stage block is in
//! view.
//!
//! Both are driven by explicit frame steps instead of timer callbacks, so the
//! event loop (or a test) decides when time advances.

pub mod animator;
pub mod spy;

use std::cell::Cell;
use std::time::{Duration, Instant};

pub use animator::{
    AnimationHandle, ScrollAnimationState, ScrollAnimator, ScrollContainer, SpringConfig,
    StepOutcome,
};
pub use spy::{find_active, ScrollSpy, SectionAnchor};

/// Source of frame timestamps.
pub trait FrameClock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl FrameClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Turns clock readings into per-frame deltas.
#[derive(Debug)]
pub struct FrameTimer<C: FrameClock> {
    clock: C,
    last: Instant,
}

impl<C: FrameClock> FrameTimer<C> {
    pub fn new(clock: C) -> Self {
        let last = clock.now();
        Self { clock, last }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Time since the previous tick.
    pub fn tick(&mut self) -> Duration {
        let now = self.clock.now();
        let delta = now.saturating_duration_since(self.last);
        self.last = now;
        delta
    }

    /// Forget time spent idle so the next animation starts from a fresh frame.
    pub fn reset(&mut self) {
        self.last = self.clock.now();
    }
}
