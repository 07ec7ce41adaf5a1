//! Simulation settings
//!
//! Read from LocalStorage on web. Missing fields fall back to defaults.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::PhysicsConstants;

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Position applied on every `start()`
    pub initial_position: Vec2,
    /// Velocity applied on every `start()`
    pub initial_velocity: Vec2,
    /// Gravity, damping and stop threshold
    pub constants: PhysicsConstants,
    /// Resume automatically when the page becomes visible again
    /// (only if it was hiding the page that stopped the loop)
    pub auto_resume: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_position: Vec2::new(INITIAL_X, INITIAL_Y),
            initial_velocity: Vec2::new(INITIAL_VX, INITIAL_VY),
            constants: PhysicsConstants::default(),
            auto_resume: false,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "bounce_sim_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}
