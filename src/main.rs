//! Bounce Sim entry point
//!
//! On web, mounts the simulation onto the page. Natively, runs a short
//! headless simulation and logs where the ball ends up.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

    log::info!("Bounce sim starting...");

    // Button and visibility listeners keep their own driver handles
    if let Err(e) = bounce_sim::platform::web::mount(bounce_sim::Settings::load()) {
        log::error!("Failed to mount bounce sim: {}", e);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Frames to simulate in the headless run
#[cfg(not(target_arch = "wasm32"))]
const HEADLESS_FRAMES: usize = 600;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use bounce_sim::SimulationDriver;
    use bounce_sim::platform::headless::{FixedSurface, ManualScheduler, RecordingSink};
    use bounce_sim::sim::{Bounds, ParticleSize, PhysicsState};

    env_logger::init();
    log::info!("Bounce sim (native) starting...");

    let bounds = Bounds::new(300.0, 300.0);
    let size = ParticleSize::new(20.0, 20.0);
    let scheduler = ManualScheduler::new();
    let sink = RecordingSink::new();
    let driver = SimulationDriver::new(
        FixedSurface::new(bounds, size),
        scheduler.clone(),
        sink.clone(),
        bounce_sim::Settings::load(),
    );

    driver.start();
    let frames = scheduler.run_frames(HEADLESS_FRAMES);

    // Page hidden: the chain must end here
    driver.on_visibility_change(true);
    let after_hide = scheduler.run_frames(HEADLESS_FRAMES);

    log::info!(
        "Ran {} frames ({} after hide), {} renders",
        frames,
        after_hide,
        sink.len()
    );
    let resting = PhysicsState::new(driver.position(), driver.velocity()).is_resting(bounds, size);
    println!(
        "Final position: ({:.2}, {:.2}) velocity: ({:.2}, {:.2}) resting: {}",
        driver.position().x,
        driver.position().y,
        driver.velocity().x,
        driver.velocity().y,
        resting,
    );
}
