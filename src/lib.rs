//! Bounce Sim - a bouncing ball driven by the browser's animation-frame loop
//!
//! Core modules:
//! - `sim`: Pure physics (position, velocity, boundary collisions)
//! - `driver`: Start/stop state machine that chains animation frames
//! - `platform`: Surface, scheduler and render-sink contracts plus headless/browser impls
//! - `settings`: Persisted simulation tuning

pub mod driver;
pub mod platform;
pub mod settings;
pub mod sim;

pub use driver::{RunState, SimulationDriver};
pub use settings::Settings;

/// Simulation defaults
pub mod consts {
    /// Ball position (top-left corner, px) applied on every start
    pub const INITIAL_X: f32 = 20.0;
    pub const INITIAL_Y: f32 = 10.0;

    /// Ball velocity (px per tick) applied on every start
    pub const INITIAL_VX: f32 = 3.7;
    pub const INITIAL_VY: f32 = 0.0;

    /// Added to vertical velocity every tick
    pub const GRAVITY: f32 = 0.25;
    /// Fraction of vertical speed kept after a floor/ceiling bounce
    pub const DAMPING: f32 = 0.75;
    /// Floor bounces slower than this come to rest
    pub const STOP_THRESHOLD: f32 = 0.6;
}
