//! Particle state and simulation parameters

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Usable size of the drawing surface at a given tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Rendered size of the particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSize {
    pub width: f32,
    pub height: f32,
}

impl ParticleSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Tunable physics constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConstants {
    /// Added to vertical velocity every tick
    pub gravity: f32,
    /// Velocity retained after a floor/ceiling bounce, in [0, 1]
    pub damping: f32,
    /// Floor bounces with |vy| below this are zeroed
    pub stop_threshold: f32,
}

impl Default for PhysicsConstants {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            damping: DAMPING,
            stop_threshold: STOP_THRESHOLD,
        }
    }
}

/// Boundaries touched during the most recent step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Contacts {
    pub floor: bool,
    pub ceiling: bool,
    pub left: bool,
    pub right: bool,
}

impl Contacts {
    pub fn any(&self) -> bool {
        self.floor || self.ceiling || self.left || self.right
    }
}

/// Position and velocity of the simulated particle
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub(crate) contacts: Contacts,
}

impl PhysicsState {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            contacts: Contacts::default(),
        }
    }

    /// Put the particle back at a starting position/velocity
    pub fn reset(&mut self, position: Vec2, velocity: Vec2) {
        self.position = position;
        self.velocity = velocity;
        self.contacts = Contacts::default();
    }

    /// Advance by one tick. See [`super::step`].
    pub fn step(&mut self, bounds: Bounds, size: ParticleSize, constants: &PhysicsConstants) -> Vec2 {
        super::step(self, bounds, size, constants)
    }

    pub fn last_contacts(&self) -> Contacts {
        self.contacts
    }

    /// Sitting on the floor with vertical motion fully damped
    pub fn is_resting(&self, bounds: Bounds, size: ParticleSize) -> bool {
        self.velocity.y == 0.0 && self.position.y == bounds.height - size.height
    }
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self::new(
            Vec2::new(INITIAL_X, INITIAL_Y),
            Vec2::new(INITIAL_VX, INITIAL_VY),
        )
    }
}
