//! Fog Reveal entry point
//!
//! In the browser this wires the session to a canvas, pointer events, the
//! MediaPipe bridge and `requestAnimationFrame`. Natively it runs a headless
//! demo: a synthetic hand wipes the fog and the last frame is saved as PNG.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, PointerEvent};

    use fog_reveal::consts::*;
    use fog_reveal::platform::web::{self, MediaPipeTracker};
    use fog_reveal::renderer::Background;
    use fog_reveal::{Session, Settings, TuningPreset};

    const DEFAULT_BACKGROUND: &str = "background.jpg";

    struct App {
        session: Session,
        ctx: CanvasRenderingContext2d,
        canvas: HtmlCanvasElement,
        /// Set by the progress callback; the page owns the "level done" decision
        complete: Rc<RefCell<bool>>,
        guidance_shown: bool,
        camera_starting_shown: bool,
    }

    impl App {
        fn frame(&mut self, time: f64) {
            let complete = *self.complete.borrow();
            self.session.frame(time, complete);
            if let Err(e) = web::present(&self.ctx, self.session.frame_buffer()) {
                log::error!("{e}");
            }

            let starting = !self.session.state().input.is_tracker_ready();
            if starting != self.camera_starting_shown {
                self.camera_starting_shown = starting;
                set_hidden("camera-starting", !starting);
            }

            let guidance = self.session.show_guidance();
            if guidance != self.guidance_shown {
                self.guidance_shown = guidance;
                set_hidden("guide", !guidance);
            }
        }

        fn fit_canvas(&mut self) {
            let width = self.canvas.client_width().max(1) as u32;
            let height = self.canvas.client_height().max(1) as u32;
            if width != self.canvas.width() || height != self.canvas.height() {
                self.canvas.set_width(width);
                self.canvas.set_height(height);
                self.session.resize(width as usize, height as usize);
                *self.complete.borrow_mut() = false;
                set_hidden("complete", true);
                set_text("progress", "0%");
            }
        }
    }

    fn set_hidden(id: &str, hidden: bool) {
        let element = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(id));
        if let Some(el) = element {
            let _ = el.set_attribute("class", if hidden { "hidden" } else { "" });
        }
    }

    fn set_text(id: &str, text: &str) {
        let element = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(id));
        if let Some(el) = element {
            el.set_text_content(Some(text));
        }
    }

    /// `?preset=grime` style query parameter
    fn preset_from_query() -> TuningPreset {
        let search = web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default();
        search
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "preset")
            .and_then(|(_, value)| TuningPreset::from_str(value))
            .unwrap_or_default()
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Fog Reveal starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;
        let ctx = web::context_2d(&canvas).map_err(|e| JsValue::from_str(&e.to_string()))?;

        let width = canvas.client_width().max(1) as u32;
        let height = canvas.client_height().max(1) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        let settings = Settings::from_preset(preset_from_query());
        let mut session = Session::new(&settings, width as usize, height as usize);
        session.attach_tracker(Box::new(MediaPipeTracker::new("tracking-video")));

        let complete = Rc::new(RefCell::new(false));
        {
            let complete = complete.clone();
            session.set_on_progress(move |progress| {
                set_text("progress", &format!("{}%", progress.round() as u32));
                if progress >= COMPLETION_THRESHOLD && !*complete.borrow() {
                    *complete.borrow_mut() = true;
                    set_hidden("complete", false);
                }
            });
        }
        session.begin_background_load();

        let app = Rc::new(RefCell::new(App {
            session,
            ctx,
            canvas: canvas.clone(),
            complete,
            guidance_shown: false,
            camera_starting_shown: true,
        }));

        load_background(&canvas, app.clone());
        setup_input_handlers(&canvas, app.clone());
        request_animation_frame(app);

        log::info!("Fog Reveal running!");
        Ok(())
    }

    fn load_background(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        let url = canvas
            .get_attribute("data-background")
            .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string());
        let on_loaded = {
            let app = app.clone();
            move |background: Background| app.borrow_mut().session.set_background(background)
        };
        let on_error = {
            let app = app.clone();
            move |e: fog_reveal::Error| {
                log::warn!("{e}; using a plain backdrop");
                app.borrow_mut()
                    .session
                    .set_background(Background::solid(1, 1, [40, 90, 120]));
            }
        };
        if let Err(e) = web::load_background(&url, on_loaded, on_error) {
            log::warn!("{e}; using a plain backdrop");
            app.borrow_mut()
                .session
                .set_background(Background::solid(1, 1, [40, 90, 120]));
        }
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        // Pointer move: absolute canvas position
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                app.borrow_mut().session.pointer_move(
                    event.offset_x() as f32,
                    event.offset_y() as f32,
                    web::now_ms(),
                );
            });
            let _ = canvas
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Window resize restarts the level at the new size
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                app.borrow_mut().fit_canvas();
            });
            if let Some(window) = web_sys::window() {
                let _ = window
                    .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
            }
            closure.forget();
        }

        // Release the camera when the page goes away
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                app.borrow_mut().session.shutdown();
            });
            if let Some(window) = web_sys::window() {
                let _ = window
                    .add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
            }
            closure.forget();
        }
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            app.borrow_mut().frame(time);
            request_animation_frame(app);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_app::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Fog Reveal (native) starting...");

    if let Err(e) = demo::run(demo::Args::parse(std::env::args().skip(1))) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::thread;
    use std::time::{Duration, Instant};

    use fog_reveal::consts::*;
    use fog_reveal::platform::native::{self, PalmScript, SyntheticTracker};
    use fog_reveal::renderer::Background;
    use fog_reveal::sim::TrackingState;
    use fog_reveal::{Error, Session, Settings};

    const USAGE: &str = "usage: fog-reveal [--background PNG] [--settings JSON] [--out PNG] [--seconds N] [--size WxH] [--brush PX]";

    pub struct Args {
        background: Option<PathBuf>,
        settings: Option<PathBuf>,
        out: PathBuf,
        seconds: f64,
        size: (usize, usize),
        brush: Option<f32>,
    }

    impl Args {
        pub fn parse(mut args: impl Iterator<Item = String>) -> Self {
            let mut parsed = Args {
                background: None,
                settings: None,
                out: PathBuf::from("fog-reveal.png"),
                seconds: 20.0,
                size: (640, 480),
                brush: None,
            };
            while let Some(flag) = args.next() {
                let value = args.next();
                match (flag.as_str(), value) {
                    ("--background", Some(v)) => parsed.background = Some(v.into()),
                    ("--settings", Some(v)) => parsed.settings = Some(v.into()),
                    ("--out", Some(v)) => parsed.out = v.into(),
                    ("--seconds", Some(v)) => match v.parse() {
                        Ok(s) => parsed.seconds = s,
                        Err(_) => log::warn!("Ignoring --seconds {v}"),
                    },
                    ("--brush", Some(v)) => match v.parse() {
                        Ok(px) => parsed.brush = Some(px),
                        Err(_) => log::warn!("Ignoring --brush {v}"),
                    },
                    ("--size", Some(v)) => {
                        let size = v
                            .split_once('x')
                            .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)));
                        match size {
                            Some(size) => parsed.size = size,
                            None => log::warn!("Ignoring --size {v}"),
                        }
                    }
                    (other, _) => log::warn!("Unknown argument {other}; {USAGE}"),
                }
            }
            parsed
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let settings = args
            .settings
            .as_deref()
            .map(Settings::load)
            .unwrap_or_default();
        let (width, height) = args.size;

        let mut session = Session::new(&settings, width, height);
        if let Some(px) = args.brush {
            session.set_brush(px, settings.wipes_required);
        }
        session.attach_tracker(Box::new(SyntheticTracker::new(PalmScript::default())));

        let progress = Rc::new(Cell::new(0.0f32));
        {
            let progress = progress.clone();
            session.set_on_progress(move |p| {
                // Log each new 10% band
                if (p / 10.0).floor() > (progress.get() / 10.0).floor() {
                    log::info!("Revealed {:.0}%", p);
                }
                progress.set(p);
            });
        }

        session.begin_background_load();
        let background = match args.background.as_deref() {
            Some(path) => native::load_background(path)?,
            None => Background::solid(width, height, [40, 90, 120]),
        };
        session.set_background(background);

        let frame_time = Duration::from_secs_f32(1.0 / FRAME_RATE);
        let started = Instant::now();
        let mut completed_at: Option<f64> = None;
        let mut guidance = false;

        loop {
            let now_ms = started.elapsed().as_secs_f64() * 1000.0;

            // While the hand is gone the player reaches for the mouse
            if session.show_guidance() || session.tracking_state() == TrackingState::MouseActive {
                let t = now_ms as f32;
                session.pointer_move(
                    width as f32 * (0.5 + 0.45 * (t * 0.003).sin()),
                    height as f32 * (0.5 + 0.45 * (t * 0.0047).sin()),
                    now_ms,
                );
            }

            let complete = completed_at.is_some();
            session.frame(now_ms, complete);

            if session.show_guidance() != guidance {
                guidance = session.show_guidance();
                if guidance {
                    log::info!("Hand lost; showing guidance");
                } else {
                    log::info!("Guidance hidden; input is {}", session.tracking_state().as_str());
                }
            }

            match completed_at {
                None if progress.get() >= COMPLETION_THRESHOLD => {
                    log::info!("Level complete after {:.1}s", now_ms / 1000.0);
                    completed_at = Some(now_ms);
                }
                // Let the completion flash play out
                Some(at) if now_ms - at > 1000.0 => break,
                _ => {}
            }
            if now_ms > args.seconds * 1000.0 {
                log::warn!("Stopping after {:.0}s at {:.1}%", args.seconds, progress.get());
                break;
            }

            thread::sleep(frame_time);
        }

        session.shutdown();
        native::save_frame(session.frame_buffer(), &args.out)?;
        log::info!("Wrote {}", args.out.display());
        Ok(())
    }
}
