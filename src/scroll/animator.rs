use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Frames longer than this are simulated as this long.
pub const MAX_FRAME_STEP: Duration = Duration::from_millis(100);
/// Below this, displacement, velocity and overshoot count as at rest.
pub const REST_EPSILON: f64 = 0.1;
/// Smaller overshoot is not worth rendering.
pub const OVERSHOOT_THRESHOLD: f64 = 0.5;
/// Starting this close to the target counts as already there.
pub const AT_TARGET_DISTANCE: f64 = 1.0;
/// How far the position is pulled away when an animation starts at its target.
pub const NUDGE_DISTANCE: f64 = 35.0;
/// Simulated time after which a run snaps to its target regardless.
pub const MAX_SIMULATED_TIME: Duration = Duration::from_secs(10);

/// Anything with a vertical scroll offset the animator can drive.
pub trait ScrollContainer {
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&mut self, offset: f64);
    /// Largest valid scroll offset (content height minus viewport height).
    fn max_scroll(&self) -> f64;
    /// Transient offset of the content past either edge; `0.0` is neutral.
    fn set_overshoot(&mut self, overshoot: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub tension: f64,
    pub friction: f64,
    pub mass: f64,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            tension: 150.0,
            friction: 8.0,
            mass: 1.0,
        }
    }
}

impl SpringConfig {
    /// Replace non-physical values with the defaults.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let positive = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        Self {
            tension: positive(self.tension, defaults.tension),
            friction: if self.friction.is_finite() && self.friction >= 0.0 {
                self.friction
            } else {
                defaults.friction
            },
            mass: positive(self.mass, defaults.mass),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnimationState {
    pub position: f64,
    pub velocity: f64,
    pub target: f64,
}

/// Identifies one `animate` call. Cancelling through a handle whose run has
/// finished or been superseded does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Idle,
    Running,
    Finished,
}

#[derive(Debug)]
struct ActiveAnimation {
    handle: AnimationHandle,
    state: ScrollAnimationState,
    elapsed: Duration,
}

fn clamp_to_range(offset: f64, max_scroll: f64) -> f64 {
    offset.clamp(0.0, max_scroll.max(0.0))
}

/// Spring-damper scroll animation for a single container.
#[derive(Debug)]
pub struct ScrollAnimator {
    config: SpringConfig,
    active: Option<ActiveAnimation>,
    next_handle: u64,
}

impl ScrollAnimator {
    pub fn new(config: SpringConfig) -> Self {
        Self {
            config: config.sanitized(),
            active: None,
            next_handle: 0,
        }
    }

    pub fn config(&self) -> SpringConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SpringConfig) {
        self.config = config.sanitized();
    }

    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_active(&self, handle: AnimationHandle) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.handle == handle)
    }

    pub fn state(&self) -> Option<ScrollAnimationState> {
        self.active.as_ref().map(|active| active.state)
    }

    /// Start moving `container` towards `target`, superseding any run in
    /// progress.
    pub fn animate<C>(&mut self, container: &mut C, target: f64) -> AnimationHandle
    where
        C: ScrollContainer + ?Sized,
    {
        if let Some(previous) = self.active.take() {
            debug!(handle = previous.handle.0, "Superseding scroll animation");
        }

        let max_scroll = container.max_scroll();
        let target = clamp_to_range(target, max_scroll);
        let mut position = container.scroll_top();

        if (position - target).abs() < AT_TARGET_DISTANCE {
            position = if target <= 0.0 {
                NUDGE_DISTANCE
            } else {
                target - NUDGE_DISTANCE
            };
        }
        publish(container, position, max_scroll);

        let handle = AnimationHandle(self.next_handle);
        self.next_handle += 1;
        self.active = Some(ActiveAnimation {
            handle,
            state: ScrollAnimationState {
                position,
                velocity: 0.0,
                target,
            },
            elapsed: Duration::ZERO,
        });
        handle
    }

    /// Stop the run identified by `handle`, leaving the container at its
    /// current visible offset. Returns whether anything was cancelled.
    pub fn cancel<C>(&mut self, container: &mut C, handle: AnimationHandle) -> bool
    where
        C: ScrollContainer + ?Sized,
    {
        if !self.is_active(handle) {
            return false;
        }
        self.cancel_active(container);
        true
    }

    /// Stop whatever is running, e.g. because the user scrolled by hand.
    pub fn cancel_active<C>(&mut self, container: &mut C)
    where
        C: ScrollContainer + ?Sized,
    {
        if self.active.take().is_some() {
            container.set_overshoot(0.0);
        }
    }

    /// Advance the simulation by one frame of length `dt`.
    pub fn step<C>(&mut self, container: &mut C, dt: Duration) -> StepOutcome
    where
        C: ScrollContainer + ?Sized,
    {
        let Some(active) = self.active.as_mut() else {
            return StepOutcome::Idle;
        };

        let dt_secs = dt.min(MAX_FRAME_STEP).as_secs_f64();
        let max_scroll = container.max_scroll();
        let SpringConfig {
            tension,
            friction,
            mass,
        } = self.config;

        let state = &mut active.state;
        // Content may have shrunk since the run started.
        state.target = clamp_to_range(state.target, max_scroll);

        let displacement = state.position - state.target;
        let acceleration = (-tension * displacement - friction * state.velocity) / mass;
        state.velocity += acceleration * dt_secs;
        state.position += state.velocity * dt_secs;
        active.elapsed += dt.min(MAX_FRAME_STEP);

        let overshoot = publish(container, state.position, max_scroll);

        let at_rest = (state.position - state.target).abs() < REST_EPSILON
            && state.velocity.abs() < REST_EPSILON
            && overshoot.abs() < REST_EPSILON;
        if at_rest || active.elapsed >= MAX_SIMULATED_TIME {
            let target = state.target;
            container.set_scroll_top(target);
            container.set_overshoot(0.0);
            self.active = None;
            return StepOutcome::Finished;
        }
        StepOutcome::Running
    }
}

/// Write the clamped offset to the container and return the overshoot.
fn publish<C>(container: &mut C, position: f64, max_scroll: f64) -> f64
where
    C: ScrollContainer + ?Sized,
{
    let applied = clamp_to_range(position, max_scroll);
    let overshoot = position - applied;
    container.set_scroll_top(applied);
    container.set_overshoot(if overshoot.abs() > OVERSHOOT_THRESHOLD {
        overshoot
    } else {
        0.0
    });
    overshoot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct TestContainer {
        scroll_top: f64,
        max_scroll: f64,
        overshoot: f64,
        max_overshoot_seen: f64,
    }

    impl TestContainer {
        fn new(scroll_top: f64, max_scroll: f64) -> Self {
            Self {
                scroll_top,
                max_scroll,
                ..Self::default()
            }
        }
    }

    impl ScrollContainer for TestContainer {
        fn scroll_top(&self) -> f64 {
            self.scroll_top
        }

        fn set_scroll_top(&mut self, offset: f64) {
            assert!(
                offset >= 0.0 && offset <= self.max_scroll.max(0.0),
                "visible offset {offset} outside 0..={}",
                self.max_scroll
            );
            self.scroll_top = offset;
        }

        fn max_scroll(&self) -> f64 {
            self.max_scroll
        }

        fn set_overshoot(&mut self, overshoot: f64) {
            self.max_overshoot_seen = self.max_overshoot_seen.max(overshoot.abs());
            self.overshoot = overshoot;
        }
    }

    const FRAME: Duration = Duration::from_millis(16);

    fn run_to_end(
        animator: &mut ScrollAnimator,
        container: &mut TestContainer,
        frame: Duration,
    ) -> usize {
        let mut frames = 0;
        loop {
            frames += 1;
            match animator.step(container, frame) {
                StepOutcome::Finished => return frames,
                StepOutcome::Running => {}
                StepOutcome::Idle => panic!("animation vanished"),
            }
            assert!(frames < 10_000, "animation never settled");
        }
    }

    #[test]
    fn settles_exactly_on_target() {
        let mut animator = ScrollAnimator::new(SpringConfig::default());
        let mut container = TestContainer::new(0.0, 2_000.0);
        animator.animate(&mut container, 1_200.0);
        run_to_end(&mut animator, &mut container, FRAME);

        assert_eq!(container.scroll_top, 1_200.0);
        assert_eq!(container.overshoot, 0.0);
        assert!(!animator.is_animating());
    }

    #[test]
    fn terminates_for_any_target_and_range() {
        let targets: [f64; 8] = [-500.0, 0.0, 0.4, 35.0, 499.6, 500.0, 750.0, 1e6];
        let starts: [f64; 4] = [0.0, 10.0, 250.0, 500.0];
        let ranges: [f64; 3] = [0.0, 20.0, 500.0];
        let frames = [
            Duration::ZERO,
            Duration::from_millis(1),
            FRAME,
            Duration::from_millis(250),
        ];

        for &max_scroll in &ranges {
            for &start in &starts {
                for &target in &targets {
                    for &frame in &frames[1..] {
                        let mut animator = ScrollAnimator::new(SpringConfig::default());
                        let mut container =
                            TestContainer::new(start.min(max_scroll), max_scroll);
                        animator.animate(&mut container, target);
                        // A zero-length frame must not stall or finish the run early.
                        assert_ne!(
                            animator.step(&mut container, frames[0]),
                            StepOutcome::Idle
                        );
                        run_to_end(&mut animator, &mut container, frame);

                        let expected = target.clamp(0.0, max_scroll);
                        assert_eq!(
                            container.scroll_top, expected,
                            "start {start} target {target} range {max_scroll} frame {frame:?}"
                        );
                        assert_eq!(container.overshoot, 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn animating_to_current_position_still_moves() {
        let mut animator = ScrollAnimator::new(SpringConfig::default());
        let mut container = TestContainer::new(800.0, 1_000.0);
        animator.animate(&mut container, 800.0);
        assert_eq!(container.scroll_top, 800.0 - NUDGE_DISTANCE);

        let frames = run_to_end(&mut animator, &mut container, FRAME);
        assert!(frames > 1);
        assert_eq!(container.scroll_top, 800.0);
    }

    #[test]
    fn animating_to_top_from_top_pulls_down_first() {
        let mut animator = ScrollAnimator::new(SpringConfig::default());
        let mut container = TestContainer::new(0.0, 1_000.0);
        animator.animate(&mut container, 0.0);
        assert_eq!(container.scroll_top, NUDGE_DISTANCE);
        assert_eq!(animator.step(&mut container, FRAME), StepOutcome::Running);
        run_to_end(&mut animator, &mut container, FRAME);
        assert_eq!(container.scroll_top, 0.0);
    }

    #[test]
    fn short_content_rubber_bands_instead_of_scrolling() {
        let mut animator = ScrollAnimator::new(SpringConfig::default());
        let mut container = TestContainer::new(0.0, 0.0);
        animator.animate(&mut container, 0.0);
        assert_eq!(container.scroll_top, 0.0);
        assert_eq!(container.overshoot, NUDGE_DISTANCE);

        run_to_end(&mut animator, &mut container, FRAME);
        assert_eq!(container.scroll_top, 0.0);
        assert_eq!(container.overshoot, 0.0);
    }

    #[test]
    fn overshoot_past_the_edge_is_rendered_then_cleared() {
        let mut animator = ScrollAnimator::new(SpringConfig::default());
        let mut container = TestContainer::new(0.0, 1_000.0);
        animator.animate(&mut container, 1_000.0);
        run_to_end(&mut animator, &mut container, FRAME);

        assert!(container.max_overshoot_seen > OVERSHOOT_THRESHOLD);
        assert_eq!(container.scroll_top, 1_000.0);
        assert_eq!(container.overshoot, 0.0);
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut slow = ScrollAnimator::new(SpringConfig::default());
        let mut clamped = ScrollAnimator::new(SpringConfig::default());
        let mut a = TestContainer::new(0.0, 1_000.0);
        let mut b = TestContainer::new(0.0, 1_000.0);
        slow.animate(&mut a, 600.0);
        clamped.animate(&mut b, 600.0);

        slow.step(&mut a, Duration::from_secs(3));
        clamped.step(&mut b, MAX_FRAME_STEP);
        assert_eq!(slow.state(), clamped.state());
    }

    #[test]
    fn new_animation_supersedes_running_one() {
        let mut animator = ScrollAnimator::new(SpringConfig::default());
        let mut container = TestContainer::new(0.0, 1_000.0);
        let first = animator.animate(&mut container, 900.0);
        animator.step(&mut container, FRAME);
        let second = animator.animate(&mut container, 100.0);

        assert!(!animator.is_active(first));
        assert!(animator.is_active(second));
        assert!(!animator.cancel(&mut container, first));
        assert!(animator.is_animating());

        run_to_end(&mut animator, &mut container, FRAME);
        assert_eq!(container.scroll_top, 100.0);
    }

    #[test]
    fn cancel_freezes_at_current_offset() {
        let mut animator = ScrollAnimator::new(SpringConfig::default());
        let mut container = TestContainer::new(0.0, 1_000.0);
        let handle = animator.animate(&mut container, 900.0);
        for _ in 0..5 {
            animator.step(&mut container, FRAME);
        }
        let frozen = container.scroll_top;
        assert!(frozen > 0.0 && frozen < 900.0);

        assert!(animator.cancel(&mut container, handle));
        assert_eq!(animator.step(&mut container, FRAME), StepOutcome::Idle);
        assert_eq!(container.scroll_top, frozen);
        assert_eq!(container.overshoot, 0.0);
        assert!(!animator.cancel(&mut container, handle));
    }

    #[test]
    fn handle_is_inert_after_termination() {
        let mut animator = ScrollAnimator::new(SpringConfig::default());
        let mut container = TestContainer::new(0.0, 1_000.0);
        let handle = animator.animate(&mut container, 300.0);
        run_to_end(&mut animator, &mut container, FRAME);
        assert!(!animator.cancel(&mut container, handle));
    }

    #[test]
    fn target_follows_shrinking_content() {
        let mut animator = ScrollAnimator::new(SpringConfig::default());
        let mut container = TestContainer::new(0.0, 1_000.0);
        animator.animate(&mut container, 1_000.0);
        animator.step(&mut container, FRAME);
        container.max_scroll = 400.0;
        container.scroll_top = container.scroll_top.min(400.0);
        run_to_end(&mut animator, &mut container, FRAME);
        assert_eq!(container.scroll_top, 400.0);
    }

    #[test]
    fn sanitizes_non_physical_config() {
        let config = SpringConfig {
            tension: -1.0,
            friction: f64::NAN,
            mass: 0.0,
        }
        .sanitized();
        assert_eq!(config, SpringConfig::default());
    }
}
