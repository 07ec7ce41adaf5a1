//! Platform abstraction layer
//!
//! The driver only sees the host through these traits:
//! - Surface size and rendered particle size
//! - Animation-frame scheduling and cancellation
//! - Where rendered positions go
//!
//! `headless` implements them in memory (native builds, tests);
//! `web` implements them on top of the DOM (wasm32 only).

use glam::Vec2;

use crate::sim::{Bounds, ParticleSize};

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod web;

/// Callback delivered by a [`FrameScheduler`]
pub type FrameCallback = Box<dyn FnOnce()>;

/// Identifies one scheduled callback (an animation-frame request id on web)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub i32);

/// Reports the current drawable area and the particle's rendered size.
///
/// Both are queried every tick; implementations return the latest values.
pub trait SurfaceProvider {
    fn current_bounds(&self) -> Bounds;
    fn particle_size(&self) -> ParticleSize;
}

/// Delivers callbacks at roughly the display refresh rate.
///
/// A scheduled callback fires at most once. Cancelling a handle whose
/// callback has not fired yet guarantees it never fires. `schedule`
/// returns `None` when the host refused the request; the callback is
/// then dropped without running.
pub trait FrameScheduler {
    fn schedule(&mut self, callback: FrameCallback) -> Option<FrameHandle>;
    fn cancel(&mut self, handle: FrameHandle);
}

/// Moves the visual representation of the particle
pub trait RenderSink {
    fn render(&mut self, position: Vec2);
}
