//! Browser support: MediaPipe Hands bridge, image loading and canvas output

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, ImageData};

use crate::error::Error;
use crate::renderer::{Background, FrameBuffer};
use crate::sim::input::HandObservation;
use crate::tracking::{HandFeed, HandTracker};

// Landmark 9 is the middle-finger MCP joint, used as the palm center
#[wasm_bindgen(inline_js = "
    export function start_hands(videoId, onResults, onReady, onError) {
        if (typeof Hands === 'undefined' || typeof Camera === 'undefined') {
            return null;
        }
        const video = document.getElementById(videoId);
        if (!video) {
            return null;
        }
        const hands = new Hands({
            locateFile: (file) => `https://cdn.jsdelivr.net/npm/@mediapipe/hands/${file}`
        });
        hands.setOptions({
            maxNumHands: 1,
            modelComplexity: 1,
            minDetectionConfidence: 0.5,
            minTrackingConfidence: 0.5
        });
        const handle = { hands, camera: null, stopped: false };
        hands.onResults((results) => {
            if (handle.stopped) return;
            const marks = results.multiHandLandmarks;
            if (marks && marks.length > 0) {
                const palm = marks[0][9];
                onResults(true, palm.x, palm.y);
            } else {
                onResults(false, 0, 0);
            }
        });
        handle.camera = new Camera(video, {
            onFrame: async () => {
                if (handle.stopped) return;
                await hands.send({ image: video });
                if (!handle.stopped) onReady();
            },
            width: 640,
            height: 480
        });
        handle.camera.start().catch((e) => {
            if (!handle.stopped) onError(String(e));
        });
        return handle;
    }

    export function stop_hands(handle) {
        if (!handle || handle.stopped) return;
        handle.stopped = true;
        if (handle.camera) handle.camera.stop();
        if (handle.hands && handle.hands.close) handle.hands.close();
    }
")]
extern "C" {
    fn start_hands(
        video_id: &str,
        on_results: &js_sys::Function,
        on_ready: &js_sys::Function,
        on_error: &js_sys::Function,
    ) -> JsValue;
    fn stop_hands(handle: &JsValue);
}

struct BridgeCallbacks {
    _on_results: Closure<dyn FnMut(bool, f64, f64)>,
    _on_ready: Closure<dyn FnMut()>,
    _on_error: Closure<dyn FnMut(String)>,
}

/// MediaPipe Hands driven by the page's `<video>` element
pub struct MediaPipeTracker {
    video_id: String,
    handle: Option<JsValue>,
    callbacks: Option<BridgeCallbacks>,
}

impl MediaPipeTracker {
    pub fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            handle: None,
            callbacks: None,
        }
    }
}

impl HandTracker for MediaPipeTracker {
    fn start(&mut self, feed: HandFeed) -> Result<(), Error> {
        let on_results = {
            let feed = feed.clone();
            Closure::<dyn FnMut(bool, f64, f64)>::new(move |present: bool, x: f64, y: f64| {
                let observation = if present {
                    HandObservation::present(x as f32, y as f32)
                } else {
                    HandObservation::absent()
                };
                feed.publish(observation);
            })
        };
        let on_ready = {
            let feed = feed.clone();
            Closure::<dyn FnMut()>::new(move || feed.mark_ready())
        };
        let on_error = Closure::<dyn FnMut(String)>::new(move |reason: String| {
            log::error!("Camera error: {reason}");
            feed.mark_failed(reason);
        });

        let handle = start_hands(
            &self.video_id,
            on_results.as_ref().unchecked_ref(),
            on_ready.as_ref().unchecked_ref(),
            on_error.as_ref().unchecked_ref(),
        );
        if handle.is_null() || handle.is_undefined() {
            return Err(Error::TrackerInit(
                "MediaPipe scripts or video element not available".into(),
            ));
        }

        self.handle = Some(handle);
        self.callbacks = Some(BridgeCallbacks {
            _on_results: on_results,
            _on_ready: on_ready,
            _on_error: on_error,
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            stop_hands(&handle);
        }
        // The JS side checks `stopped` before calling back, so the closures can go
        self.callbacks = None;
    }

    fn name(&self) -> &str {
        "mediapipe-hands"
    }
}

/// Milliseconds from `performance.now()`, falling back to `Date.now()`
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or_else(js_sys::Date::now, |p| p.now())
}

/// Load a picture by URL and hand its pixels to `on_loaded`. Errors go to
/// `on_error`; retrying or picking a fallback picture is the caller's call.
pub fn load_background(
    url: &str,
    on_loaded: impl FnOnce(Background) + 'static,
    on_error: impl FnOnce(Error) + 'static,
) -> Result<(), Error> {
    let image = HtmlImageElement::new().map_err(js_error)?;
    image.set_cross_origin(Some("anonymous"));

    // Only one of onload/onerror fires; whichever runs takes the error sink
    let on_error: Rc<RefCell<Option<Box<dyn FnOnce(Error)>>>> =
        Rc::new(RefCell::new(Some(Box::new(on_error))));

    let loaded = {
        let image = image.clone();
        let on_error = on_error.clone();
        Closure::once(move || match decode_image(&image) {
            Ok(background) => on_loaded(background),
            Err(e) => {
                if let Some(sink) = on_error.borrow_mut().take() {
                    sink(e);
                }
            }
        })
    };
    let failed = {
        let url = url.to_string();
        Closure::once(move || {
            if let Some(sink) = on_error.borrow_mut().take() {
                sink(Error::Frame(format!("background {url} failed to load")));
            }
        })
    };
    image.set_onload(Some(loaded.as_ref().unchecked_ref()));
    image.set_onerror(Some(failed.as_ref().unchecked_ref()));
    loaded.forget();
    failed.forget();
    image.set_src(url);
    Ok(())
}

fn decode_image(image: &HtmlImageElement) -> Result<Background, Error> {
    let (w, h) = (image.natural_width(), image.natural_height());
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| Error::Frame("no document".into()))?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| Error::Frame("not a canvas".into()))?;
    canvas.set_width(w);
    canvas.set_height(h);
    let ctx = context_2d(&canvas)?;
    ctx.draw_image_with_html_image_element(image, 0.0, 0.0)
        .map_err(js_error)?;
    let data = ctx
        .get_image_data(0.0, 0.0, w as f64, h as f64)
        .map_err(js_error)?;
    let bytes = data.data();
    Background::from_rgba(w as usize, h as usize, &bytes.0)
}

pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, Error> {
    canvas
        .get_context("2d")
        .map_err(js_error)?
        .ok_or_else(|| Error::Frame("2d context unavailable".into()))?
        .dyn_into()
        .map_err(|_| Error::Frame("not a 2d context".into()))
}

/// Blit a rendered frame onto the canvas
pub fn present(ctx: &CanvasRenderingContext2d, frame: &FrameBuffer) -> Result<(), Error> {
    if frame.width == 0 || frame.height == 0 {
        return Ok(());
    }
    let data = ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(frame.as_bytes()),
        frame.width as u32,
        frame.height as u32,
    )
    .map_err(js_error)?;
    ctx.put_image_data(&data, 0.0, 0.0).map_err(js_error)
}

fn js_error(value: JsValue) -> Error {
    Error::Frame(format!("{value:?}"))
}
