//! Fixed-step particle integration
//!
//! One call advances the particle by exactly one animation frame.

use glam::Vec2;

use super::state::{Bounds, Contacts, ParticleSize, PhysicsConstants, PhysicsState};

/// Advance the particle by one tick and resolve boundary collisions.
///
/// Semi-implicit Euler with a unit timestep: gravity is applied to the
/// vertical velocity before the position moves. Vertical collisions are
/// resolved first (floor, then ceiling), then the side walls. Each boundary
/// is checked once; a particle crossing two boundaries in one tick gets
/// both corrections independently and is not re-checked afterwards.
///
/// Only floor bounces apply the stop threshold. Wall bounces are lossless.
///
/// Returns the new position.
pub fn step(
    state: &mut PhysicsState,
    bounds: Bounds,
    size: ParticleSize,
    constants: &PhysicsConstants,
) -> Vec2 {
    let mut contacts = Contacts::default();

    state.velocity.y += constants.gravity;
    state.position += state.velocity;

    // Floor
    if state.position.y > bounds.height - size.height {
        state.position.y = bounds.height - size.height;
        state.velocity.y = -state.velocity.y * constants.damping;
        if state.velocity.y.abs() < constants.stop_threshold {
            state.velocity.y = 0.0;
        }
        contacts.floor = true;
    }

    // Ceiling
    if state.position.y < 0.0 {
        state.position.y = 0.0;
        state.velocity.y = -state.velocity.y * constants.damping;
        contacts.ceiling = true;
    }

    // Right wall
    if state.position.x > bounds.width - size.width {
        state.position.x = bounds.width - size.width;
        state.velocity.x = -state.velocity.x;
        contacts.right = true;
    }

    // Left wall
    if state.position.x < 0.0 {
        state.position.x = 0.0;
        state.velocity.x = -state.velocity.x;
        contacts.left = true;
    }

    state.contacts = contacts;
    state.position
}
