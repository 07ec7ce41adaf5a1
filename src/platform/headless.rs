//! In-memory collaborators for native runs and tests
//!
//! Each type is a cheap clonable handle over shared state so a test can
//! keep one copy while the driver owns another.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;

use super::{FrameCallback, FrameHandle, FrameScheduler, RenderSink, SurfaceProvider};
use crate::sim::{Bounds, ParticleSize};

/// Surface with explicitly set (and resizable) dimensions
#[derive(Debug, Clone)]
pub struct FixedSurface {
    bounds: Rc<Cell<Bounds>>,
    size: Rc<Cell<ParticleSize>>,
}

impl FixedSurface {
    pub fn new(bounds: Bounds, size: ParticleSize) -> Self {
        Self {
            bounds: Rc::new(Cell::new(bounds)),
            size: Rc::new(Cell::new(size)),
        }
    }

    pub fn set_bounds(&self, bounds: Bounds) {
        self.bounds.set(bounds);
    }

    pub fn set_particle_size(&self, size: ParticleSize) {
        self.size.set(size);
    }
}

impl SurfaceProvider for FixedSurface {
    fn current_bounds(&self) -> Bounds {
        self.bounds.get()
    }

    fn particle_size(&self) -> ParticleSize {
        self.size.get()
    }
}

#[derive(Default)]
struct FrameQueue {
    next_id: i32,
    pending: Vec<(FrameHandle, FrameCallback)>,
}

/// Scheduler whose frames only advance when [`ManualScheduler::fire_frame`] is called
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<FrameQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire every callback pending right now. Callbacks scheduled while
    /// this frame runs wait for the next call. Returns how many fired.
    pub fn fire_frame(&self) -> usize {
        // Take the batch first: callbacks reschedule into the same queue
        let batch = std::mem::take(&mut self.queue.borrow_mut().pending);
        let fired = batch.len();
        for (_, callback) in batch {
            callback();
        }
        fired
    }

    /// Fire up to `frames` frames, stopping early once nothing is pending.
    /// Returns the number of frames that delivered at least one callback.
    pub fn run_frames(&self, frames: usize) -> usize {
        let mut delivered = 0;
        for _ in 0..frames {
            if self.fire_frame() == 0 {
                break;
            }
            delivered += 1;
        }
        delivered
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending(&self) -> usize {
        self.queue.borrow().pending.len()
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule(&mut self, callback: FrameCallback) -> Option<FrameHandle> {
        let mut queue = self.queue.borrow_mut();
        queue.next_id += 1;
        let handle = FrameHandle(queue.next_id);
        queue.pending.push((handle, callback));
        Some(handle)
    }

    fn cancel(&mut self, handle: FrameHandle) {
        self.queue.borrow_mut().pending.retain(|(h, _)| *h != handle);
    }
}

/// Sink that remembers every rendered position
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    positions: Rc<RefCell<Vec<Vec2>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.positions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.borrow().is_empty()
    }

    pub fn last(&self) -> Option<Vec2> {
        self.positions.borrow().last().copied()
    }
}

impl RenderSink for RecordingSink {
    fn render(&mut self, position: Vec2) {
        self.positions.borrow_mut().push(position);
    }
}
