//! Pure simulation module
//!
//! Particle kinematics live here. Nothing in this module touches the
//! surface, the scheduler or the DOM:
//! - One fixed step per call, no delta-time scaling
//! - Bounds and particle size are passed in fresh every step
//! - Collisions resolved once per axis per step, never iterated

pub mod state;
pub mod step;

pub use state::{Bounds, Contacts, ParticleSize, PhysicsConstants, PhysicsState};
pub use step::step;
