//! Browser implementations of the platform traits
//!
//! The ball is an absolutely positioned element inside `.animation-area`;
//! rendering moves it with a CSS transform.

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::prelude::*;
use web_sys::{Document, EventTarget, HtmlElement, Window};

use super::{FrameCallback, FrameHandle, FrameScheduler, RenderSink, SurfaceProvider};
use crate::driver::SimulationDriver;
use crate::settings::Settings;
use crate::sim::{Bounds, ParticleSize};

/// Element ids / selectors the page must provide
pub const AREA_SELECTOR: &str = ".animation-area";
pub const BALL_ID: &str = "ball";
pub const START_BUTTON_ID: &str = "startBounce";
pub const STOP_BUTTON_ID: &str = "stopBounce";

pub type WebDriver = SimulationDriver<DomSurface, AnimationFrameScheduler, TransformSink>;

#[derive(Debug)]
pub enum MountError {
    NoWindow,
    NoDocument,
    MissingElement(&'static str),
    NotHtmlElement(&'static str),
    Listener(String),
}

impl std::fmt::Display for MountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoWindow => write!(f, "no window"),
            Self::NoDocument => write!(f, "no document"),
            Self::MissingElement(sel) => write!(f, "missing element: {sel}"),
            Self::NotHtmlElement(sel) => write!(f, "not an HTML element: {sel}"),
            Self::Listener(e) => write!(f, "failed to add listener: {e}"),
        }
    }
}

impl std::error::Error for MountError {}

/// Bounds from the animation area, particle size from the ball, read live
pub struct DomSurface {
    area: HtmlElement,
    ball: HtmlElement,
}

impl SurfaceProvider for DomSurface {
    fn current_bounds(&self) -> Bounds {
        Bounds::new(self.area.client_width() as f32, self.area.client_height() as f32)
    }

    fn particle_size(&self) -> ParticleSize {
        ParticleSize::new(self.ball.offset_width() as f32, self.ball.offset_height() as f32)
    }
}

/// A requested frame and the closure JS will call for it
struct FrameRequest {
    handle: FrameHandle,
    /// Set once the callback has returned
    fired: Rc<Cell<bool>>,
    _closure: Closure<dyn FnMut(f64)>,
}

/// `requestAnimationFrame` / `cancelAnimationFrame`
///
/// Owns the closure of every outstanding request. A cancelled request's
/// closure is dropped in `cancel`; a fired one is dropped on the next
/// `schedule` (never while it is still running).
pub struct AnimationFrameScheduler {
    window: Window,
    requests: Vec<FrameRequest>,
}

impl AnimationFrameScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            requests: Vec::new(),
        }
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn schedule(&mut self, callback: FrameCallback) -> Option<FrameHandle> {
        self.requests.retain(|r| !r.fired.get());

        let fired = Rc::new(Cell::new(false));
        let closure: Closure<dyn FnMut(f64)> = Closure::once({
            let fired = fired.clone();
            move |_time: f64| {
                callback();
                fired.set(true);
            }
        });

        match self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            Ok(id) => {
                let handle = FrameHandle(id);
                self.requests.push(FrameRequest {
                    handle,
                    fired,
                    _closure: closure,
                });
                Some(handle)
            }
            Err(e) => {
                log::warn!("requestAnimationFrame failed: {:?}", e);
                None
            }
        }
    }

    fn cancel(&mut self, handle: FrameHandle) {
        if let Err(e) = self.window.cancel_animation_frame(handle.0) {
            log::warn!("cancelAnimationFrame failed: {:?}", e);
        }
        self.requests.retain(|r| r.handle != handle && !r.fired.get());
    }
}

/// Moves the ball element with `translate(x, y)`, snapped to whole pixels
pub struct TransformSink {
    ball: HtmlElement,
}

impl RenderSink for TransformSink {
    fn render(&mut self, position: Vec2) {
        let _ = self.ball.style().set_property("transform", &translate(position));
    }
}

fn translate(position: Vec2) -> String {
    let p = position.round();
    format!("translate({}px, {}px)", p.x, p.y)
}

fn html_by_id(document: &Document, id: &'static str) -> Result<HtmlElement, MountError> {
    document
        .get_element_by_id(id)
        .ok_or(MountError::MissingElement(id))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| MountError::NotHtmlElement(id))
}

fn html_by_selector(document: &Document, selector: &'static str) -> Result<HtmlElement, MountError> {
    document
        .query_selector(selector)
        .ok()
        .flatten()
        .ok_or(MountError::MissingElement(selector))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| MountError::NotHtmlElement(selector))
}

fn listen(
    target: &EventTarget,
    event: &str,
    handler: impl FnMut(web_sys::Event) + 'static,
) -> Result<(), MountError> {
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
    target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .map_err(|e| MountError::Listener(format!("{event}: {e:?}")))?;
    // Listeners live as long as the page
    closure.forget();
    Ok(())
}

/// Build the driver against the page and wire the start/stop buttons and
/// page visibility. The simulation stays stopped until Start is clicked.
pub fn mount(settings: Settings) -> Result<WebDriver, MountError> {
    let window = web_sys::window().ok_or(MountError::NoWindow)?;
    let document = window.document().ok_or(MountError::NoDocument)?;

    let area = html_by_selector(&document, AREA_SELECTOR)?;
    let ball = html_by_id(&document, BALL_ID)?;
    let start_btn = html_by_id(&document, START_BUTTON_ID)?;
    let stop_btn = html_by_id(&document, STOP_BUTTON_ID)?;

    let driver = SimulationDriver::new(
        DomSurface {
            area,
            ball: ball.clone(),
        },
        AnimationFrameScheduler::new(window.clone()),
        TransformSink { ball },
        settings,
    );

    {
        let driver = driver.clone();
        listen(&start_btn, "click", move |_| driver.start())?;
    }
    {
        let driver = driver.clone();
        listen(&stop_btn, "click", move |_| driver.stop())?;
    }
    {
        let driver = driver.clone();
        let doc = document.clone();
        listen(&document, "visibilitychange", move |_| {
            let hidden = doc.visibility_state() == web_sys::VisibilityState::Hidden;
            log::debug!("Visibility changed (hidden: {})", hidden);
            driver.on_visibility_change(hidden);
        })?;
    }

    log::info!("Bounce sim mounted");
    Ok(driver)
}
