//! Start/stop state machine driving the simulation from animation frames
//!
//! Each delivered frame runs one physics step, renders the new position and
//! schedules exactly one more frame. The chain ends only when the driver is
//! stopped (explicitly or because the page was hidden).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec2;

use crate::platform::{FrameHandle, FrameScheduler, RenderSink, SurfaceProvider};
use crate::settings::Settings;
use crate::sim::{Contacts, PhysicsState};

/// Whether the frame chain is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

/// Why the driver last left `Running`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Requested,
    Hidden,
}

struct DriverInner<S: SurfaceProvider, F: FrameScheduler, R: RenderSink> {
    run_state: RunState,
    stop_reason: Option<StopReason>,
    physics: PhysicsState,
    settings: Settings,
    surface: S,
    scheduler: F,
    sink: R,
    /// Outstanding frame request, if any
    pending: Option<FrameHandle>,
    /// Bumped on every schedule; a callback only runs if it carries the latest value
    frame_seq: u64,
    ticks: u64,
}

impl<S: SurfaceProvider, F: FrameScheduler, R: RenderSink> Drop for DriverInner<S, F, R> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
    }
}

/// Runs one bouncing particle against a surface, a frame scheduler and a render sink.
///
/// The driver is a cheap clonable handle; clones share the same simulation,
/// so event handlers can each hold one. Single-threaded only.
///
/// Collaborators must not call back into the driver from `render`,
/// `schedule` or the surface queries: those run while the driver is borrowed.
pub struct SimulationDriver<S: SurfaceProvider, F: FrameScheduler, R: RenderSink> {
    inner: Rc<RefCell<DriverInner<S, F, R>>>,
}

impl<S: SurfaceProvider, F: FrameScheduler, R: RenderSink> Clone for SimulationDriver<S, F, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, F, R> SimulationDriver<S, F, R>
where
    S: SurfaceProvider + 'static,
    F: FrameScheduler + 'static,
    R: RenderSink + 'static,
{
    pub fn new(surface: S, scheduler: F, sink: R, settings: Settings) -> Self {
        let physics = PhysicsState::new(settings.initial_position, settings.initial_velocity);
        Self {
            inner: Rc::new(RefCell::new(DriverInner {
                run_state: RunState::Stopped,
                stop_reason: None,
                physics,
                settings,
                surface,
                scheduler,
                sink,
                pending: None,
                frame_seq: 0,
                ticks: 0,
            })),
        }
    }

    /// Reset the particle and start the frame chain. No-op while running.
    pub fn start(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.run_state == RunState::Running {
            log::debug!("start() ignored, already running");
            return;
        }

        let (position, velocity) = (inner.settings.initial_position, inner.settings.initial_velocity);
        inner.physics.reset(position, velocity);
        inner.run_state = RunState::Running;
        inner.stop_reason = None;
        Self::arm(&mut inner, Rc::downgrade(&self.inner));
        if inner.run_state == RunState::Running {
            log::info!("Simulation started at {:?}", position);
        }
    }

    /// Restart the frame chain from the retained physics state. No-op while running.
    pub fn resume(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.run_state == RunState::Running {
            log::debug!("resume() ignored, already running");
            return;
        }

        inner.run_state = RunState::Running;
        inner.stop_reason = None;
        Self::arm(&mut inner, Rc::downgrade(&self.inner));
        if inner.run_state == RunState::Running {
            log::info!("Simulation resumed at {:?}", inner.physics.position);
        }
    }

    /// Cancel the pending frame and stop. No frame is rendered after this
    /// returns until the next `start()`/`resume()`. No-op while stopped.
    pub fn stop(&self) {
        self.halt(StopReason::Requested);
    }

    /// Host visibility changed. Hiding a running simulation stops it.
    /// Becoming visible resumes only when `auto_resume` is set and hiding
    /// was what stopped it.
    pub fn on_visibility_change(&self, hidden: bool) {
        if hidden {
            self.halt(StopReason::Hidden);
            return;
        }

        let should_resume = {
            let inner = self.inner.borrow();
            inner.settings.auto_resume
                && inner.run_state == RunState::Stopped
                && inner.stop_reason == Some(StopReason::Hidden)
        };
        if should_resume {
            self.resume();
        }
    }

    pub fn run_state(&self) -> RunState {
        self.inner.borrow().run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    pub fn position(&self) -> Vec2 {
        self.inner.borrow().physics.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.inner.borrow().physics.velocity
    }

    /// Boundaries touched on the most recent tick
    pub fn last_contacts(&self) -> Contacts {
        self.inner.borrow().physics.last_contacts()
    }

    /// Ticks delivered since construction
    pub fn ticks(&self) -> u64 {
        self.inner.borrow().ticks
    }

    pub fn settings(&self) -> Settings {
        self.inner.borrow().settings.clone()
    }

    fn halt(&self, reason: StopReason) {
        let mut inner = self.inner.borrow_mut();
        if inner.run_state == RunState::Stopped {
            // An explicit stop overrides a pause from hiding, so becoming
            // visible again must not resume
            if reason == StopReason::Requested {
                inner.stop_reason = Some(reason);
            }
            return;
        }

        if let Some(handle) = inner.pending.take() {
            inner.scheduler.cancel(handle);
        }
        inner.run_state = RunState::Stopped;
        inner.stop_reason = Some(reason);
        log::info!(
            "Simulation stopped ({:?}) after {} ticks",
            reason,
            inner.ticks
        );
    }

    /// Schedule the next frame. Caller holds the borrow and has checked `Running`.
    /// If the scheduler refuses, the driver drops back to `Stopped`.
    fn arm(inner: &mut DriverInner<S, F, R>, weak: Weak<RefCell<DriverInner<S, F, R>>>) {
        inner.frame_seq += 1;
        let seq = inner.frame_seq;
        inner.pending = inner
            .scheduler
            .schedule(Box::new(move || Self::on_frame(&weak, seq)));
        if inner.pending.is_none() {
            log::warn!("Frame could not be scheduled, stopping after {} ticks", inner.ticks);
            inner.run_state = RunState::Stopped;
            inner.stop_reason = Some(StopReason::Requested);
        }
    }

    fn on_frame(weak: &Weak<RefCell<DriverInner<S, F, R>>>, seq: u64) {
        let Some(rc) = weak.upgrade() else {
            log::trace!("Frame delivered after driver was dropped");
            return;
        };
        let mut inner = rc.borrow_mut();

        // Stale callback: stopped, or superseded by a newer schedule
        if inner.run_state == RunState::Stopped || seq != inner.frame_seq {
            log::trace!("Discarding stale frame {}", seq);
            return;
        }
        inner.pending = None;
        inner.ticks += 1;

        let bounds = inner.surface.current_bounds();
        let size = inner.surface.particle_size();
        let inner_ref = &mut *inner;
        let position = inner_ref
            .physics
            .step(bounds, size, &inner_ref.settings.constants);
        inner_ref.sink.render(position);

        Self::arm(&mut inner, Rc::downgrade(&rc));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::{FixedSurface, ManualScheduler, RecordingSink};
    use crate::platform::FrameCallback;
    use crate::sim::{Bounds, ParticleSize};

    type TestDriver = SimulationDriver<FixedSurface, ManualScheduler, RecordingSink>;

    const EPS: f32 = 1e-4;

    fn surface() -> FixedSurface {
        FixedSurface::new(Bounds::new(300.0, 300.0), ParticleSize::new(20.0, 20.0))
    }

    fn setup(settings: Settings) -> (TestDriver, ManualScheduler, RecordingSink) {
        let scheduler = ManualScheduler::new();
        let sink = RecordingSink::new();
        let driver = SimulationDriver::new(surface(), scheduler.clone(), sink.clone(), settings);
        (driver, scheduler, sink)
    }

    /// Scheduler that never honours cancellation, to exercise the stale-frame guard
    #[derive(Clone)]
    struct IgnoresCancel(ManualScheduler);

    impl FrameScheduler for IgnoresCancel {
        fn schedule(&mut self, callback: FrameCallback) -> Option<FrameHandle> {
            self.0.schedule(callback)
        }

        fn cancel(&mut self, _handle: FrameHandle) {}
    }

    /// Scheduler that accepts only the first `budget` requests
    struct LimitedScheduler {
        inner: ManualScheduler,
        budget: usize,
    }

    impl FrameScheduler for LimitedScheduler {
        fn schedule(&mut self, callback: FrameCallback) -> Option<FrameHandle> {
            if self.budget == 0 {
                return None;
            }
            self.budget -= 1;
            self.inner.schedule(callback)
        }

        fn cancel(&mut self, handle: FrameHandle) {
            self.inner.cancel(handle);
        }
    }

    #[test]
    fn test_starts_stopped() {
        let (driver, scheduler, sink) = setup(Settings::default());
        assert_eq!(driver.run_state(), RunState::Stopped);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.fire_frame(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_first_tick_matches_physics() {
        let (driver, scheduler, sink) = setup(Settings::default());
        driver.start();
        assert!(driver.is_running());
        assert_eq!(scheduler.pending(), 1);

        scheduler.fire_frame();

        let pos = sink.last().unwrap();
        assert!((pos.x - 23.7).abs() < EPS);
        assert!((pos.y - 10.25).abs() < EPS);
        assert!((driver.velocity().y - 0.25).abs() < EPS);
        assert_eq!(driver.ticks(), 1);
        // Chain re-armed itself
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_double_start_keeps_one_chain() {
        let (driver, scheduler, sink) = setup(Settings::default());
        driver.start();
        driver.start();
        assert_eq!(scheduler.pending(), 1);

        scheduler.run_frames(5);
        driver.start();
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(sink.len(), 5);

        scheduler.fire_frame();
        assert_eq!(sink.len(), 6);
    }

    #[test]
    fn test_stop_cancels_pending_frame() {
        let (driver, scheduler, sink) = setup(Settings::default());
        driver.start();
        scheduler.run_frames(3);

        driver.stop();
        assert_eq!(driver.run_state(), RunState::Stopped);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.run_frames(10), 0);
        assert_eq!(sink.len(), 3);

        // Stopping again is harmless
        driver.stop();
        assert_eq!(driver.run_state(), RunState::Stopped);
    }

    #[test]
    fn test_stop_keeps_physics_and_start_resets() {
        let (driver, scheduler, sink) = setup(Settings::default());
        driver.start();
        scheduler.run_frames(10);
        driver.stop();

        let held = driver.position();
        assert_eq!(held, sink.last().unwrap());

        driver.start();
        assert_eq!(driver.position(), Vec2::new(20.0, 10.0));
        scheduler.fire_frame();
        assert!((sink.last().unwrap().x - 23.7).abs() < EPS);
    }

    #[test]
    fn test_hidden_page_pauses_rendering() {
        let (driver, scheduler, sink) = setup(Settings::default());
        driver.start();
        scheduler.run_frames(4);

        driver.on_visibility_change(true);
        assert!(!driver.is_running());
        assert_eq!(scheduler.run_frames(10), 0);
        assert_eq!(sink.len(), 4);

        // Visible again without auto_resume: still stopped
        driver.on_visibility_change(false);
        assert!(!driver.is_running());
        assert_eq!(scheduler.run_frames(10), 0);

        driver.start();
        scheduler.fire_frame();
        assert_eq!(sink.len(), 5);
    }

    #[test]
    fn test_hidden_while_stopped_is_noop() {
        let (driver, scheduler, _sink) = setup(Settings::default());
        driver.on_visibility_change(true);
        driver.on_visibility_change(false);
        assert!(!driver.is_running());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_auto_resume_continues_from_held_state() {
        let settings = Settings {
            auto_resume: true,
            ..Default::default()
        };
        let (driver, scheduler, sink) = setup(settings);
        driver.start();
        scheduler.run_frames(6);

        driver.on_visibility_change(true);
        let held = driver.position();
        assert_eq!(scheduler.pending(), 0);

        driver.on_visibility_change(false);
        assert!(driver.is_running());
        assert_eq!(driver.position(), held);
        assert_eq!(scheduler.pending(), 1);

        scheduler.fire_frame();
        assert_eq!(sink.len(), 7);
        assert_eq!(driver.ticks(), 7);
    }

    #[test]
    fn test_auto_resume_ignores_explicit_stop() {
        let settings = Settings {
            auto_resume: true,
            ..Default::default()
        };
        let (driver, scheduler, _sink) = setup(settings);
        driver.start();
        scheduler.fire_frame();

        driver.stop();
        driver.on_visibility_change(true);
        driver.on_visibility_change(false);
        assert!(!driver.is_running());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_stop_while_hidden_blocks_auto_resume() {
        let settings = Settings {
            auto_resume: true,
            ..Default::default()
        };
        let (driver, scheduler, sink) = setup(settings);
        driver.start();
        scheduler.fire_frame();

        driver.on_visibility_change(true);
        driver.stop();
        driver.on_visibility_change(false);

        assert!(!driver.is_running());
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.run_frames(10), 0);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_refused_schedule_falls_back_to_stopped() {
        let scheduler = ManualScheduler::new();
        let sink = RecordingSink::new();
        let driver = SimulationDriver::new(
            surface(),
            LimitedScheduler {
                inner: scheduler.clone(),
                budget: 2,
            },
            sink.clone(),
            Settings::default(),
        );

        driver.start();
        assert!(driver.is_running());

        // Second frame request is the last one accepted
        scheduler.fire_frame();
        assert!(driver.is_running());
        scheduler.fire_frame();
        assert_eq!(driver.run_state(), RunState::Stopped);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(sink.len(), 2);

        // start() is not swallowed by a dead chain; the refusal stops it again
        driver.start();
        assert_eq!(driver.run_state(), RunState::Stopped);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_resume_keeps_physics() {
        let (driver, scheduler, _sink) = setup(Settings::default());
        driver.start();
        scheduler.run_frames(3);
        driver.stop();
        let held = (driver.position(), driver.velocity());

        driver.resume();
        driver.resume();
        assert_eq!((driver.position(), driver.velocity()), held);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_stale_frame_is_discarded() {
        let scheduler = ManualScheduler::new();
        let sink = RecordingSink::new();
        let driver = SimulationDriver::new(
            surface(),
            IgnoresCancel(scheduler.clone()),
            sink.clone(),
            Settings::default(),
        );

        driver.start();
        scheduler.fire_frame();
        driver.stop();

        // Cancellation was ignored, so the old frame still fires
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.fire_frame(), 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_restart_with_stale_frame_keeps_one_chain() {
        let scheduler = ManualScheduler::new();
        let sink = RecordingSink::new();
        let driver = SimulationDriver::new(
            surface(),
            IgnoresCancel(scheduler.clone()),
            sink.clone(),
            Settings::default(),
        );

        driver.start();
        driver.stop();
        driver.start();
        assert_eq!(scheduler.pending(), 2);

        for frame in 1..=5 {
            scheduler.fire_frame();
            assert_eq!(sink.len(), frame);
        }
    }

    #[test]
    fn test_surface_resize_applies_next_tick() {
        let scheduler = ManualScheduler::new();
        let sink = RecordingSink::new();
        let surface = surface();
        let driver =
            SimulationDriver::new(surface.clone(), scheduler.clone(), sink.clone(), Settings::default());

        driver.start();
        scheduler.fire_frame();

        surface.set_bounds(Bounds::new(15.0, 300.0));
        surface.set_particle_size(ParticleSize::new(10.0, 10.0));
        scheduler.fire_frame();

        assert_eq!(sink.last().unwrap().x, 5.0);
        assert!(driver.last_contacts().right);
    }

    #[test]
    fn test_dropping_driver_cancels_frame() {
        let (driver, scheduler, sink) = setup(Settings::default());
        driver.start();
        let clone = driver.clone();
        drop(driver);
        assert_eq!(scheduler.pending(), 1);

        drop(clone);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.fire_frame(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_frame_after_drop_is_noop() {
        let scheduler = ManualScheduler::new();
        let sink = RecordingSink::new();
        let driver = SimulationDriver::new(
            surface(),
            IgnoresCancel(scheduler.clone()),
            sink.clone(),
            Settings::default(),
        );
        driver.start();
        drop(driver);

        assert_eq!(scheduler.fire_frame(), 1);
        assert!(sink.is_empty());
    }
}
