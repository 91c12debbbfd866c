//! Browser bindings.
//!
//! [`WebApp`] wraps a [`PhotoEngine`] rendering into a canvas. Every handler
//! forwards to the engine and then schedules at most one
//! `requestAnimationFrame` callback, so bursts of slider events between two
//! refreshes produce a single draw. Uploads resolve as promises: the
//! handler returns to the page before decoding starts. Notifications for
//! the page are pulled as a JSON array with [`WebApp::drain_notifications`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use crate::decode::{DecodeService, ImageDecoder, ImageSource};
use crate::engine::PhotoEngine;
use crate::gpu::render_context::RenderContext;
use crate::gpu::wgpu_backend::WgpuBackend;
use crate::layer::{BlendMode, Resolution};
use crate::options::Options;

type SharedEngine = Rc<RefCell<PhotoEngine<WgpuBackend>>>;
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

/// Resolve on the browser's next task so the page can repaint before CPU
/// work starts.
async fn next_task() -> Result<(), JsValue> {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let queued = web_sys::window()
            .is_some_and(|w| w.set_timeout_with_callback(&resolve).is_ok());
        if !queued {
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    JsFuture::from(promise).await.map(|_| ())
}

fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Layer compositor bound to an HTML canvas.
#[wasm_bindgen]
#[derive(Clone)]
pub struct WebApp {
    engine: SharedEngine,
    frame: FrameCallback,
    scheduled: Rc<Cell<bool>>,
}

#[wasm_bindgen]
impl WebApp {
    /// Initialize the GPU on `canvas` and build the compositor.
    pub async fn create(
        canvas: web_sys::HtmlCanvasElement,
    ) -> Result<WebApp, JsValue> {
        init_logging();
        let size = (canvas.width().max(1), canvas.height().max(1));
        let context =
            RenderContext::new(wgpu::SurfaceTarget::Canvas(canvas), size)
                .await
                .map_err(js_error)?;
        let gpu = WgpuBackend::new(context).map_err(js_error)?;
        let engine = PhotoEngine::new(
            gpu,
            Options::default(),
            Resolution::new(size.0, size.1),
        )
        .map_err(js_error)?;

        let engine = Rc::new(RefCell::new(engine));
        let scheduled = Rc::new(Cell::new(false));
        let frame: FrameCallback = Rc::new(RefCell::new(None));
        {
            let engine = engine.clone();
            let scheduled = scheduled.clone();
            *frame.borrow_mut() = Some(Closure::<dyn FnMut()>::new(move || {
                scheduled.set(false);
                if let Ok(mut engine) = engine.try_borrow_mut() {
                    let _ = engine.on_frame();
                }
            }));
        }

        let app = Self {
            engine,
            frame,
            scheduled,
        };
        app.schedule();
        Ok(app)
    }

    /// Decode an uploaded file and load it as a new layer. The returned
    /// promise resolves to the layer id.
    pub fn upload(
        &self,
        bytes: Vec<u8>,
        mime: String,
        name: String,
    ) -> js_sys::Promise {
        let app = self.clone();
        future_to_promise(async move {
            let ticket =
                app.engine.borrow_mut().begin_upload().map_err(js_error)?;
            let decoded = match next_task().await {
                Ok(()) => match ImageSource::from_mime(name, &mime, bytes) {
                    Ok(source) => ImageDecoder.decode(source).await,
                    Err(e) => Err(e),
                },
                Err(e) => {
                    app.engine.borrow_mut().cancel_upload(ticket);
                    return Err(e);
                }
            };
            let result =
                app.engine.borrow_mut().finish_upload(ticket, decoded, None);
            app.schedule();
            result.map(|id| JsValue::from(id as u32)).map_err(js_error)
        })
    }

    /// Set a property of the active layer by name.
    pub fn adjust(&self, property: &str, value: f64) {
        self.engine.borrow_mut().adjust(property, value);
        self.schedule();
    }

    /// Toggle a property of the active layer by name.
    pub fn toggle_property(&self, property: &str) {
        self.engine.borrow_mut().toggle_property(property);
        self.schedule();
    }

    /// Make a layer active.
    pub fn select_layer(&self, id: usize) -> bool {
        let selected = self.engine.borrow_mut().select_layer(id);
        self.schedule();
        selected
    }

    /// Show or hide a layer. Returns the new visibility.
    pub fn toggle_layer_visibility(&self, id: usize) -> Option<bool> {
        let visible = self.engine.borrow_mut().toggle_layer_visibility(id);
        self.schedule();
        visible
    }

    /// Set a layer's blend mode (0 normal, 1 screen, 2 multiply).
    pub fn set_blend_mode(&self, id: usize, mode: i32) -> bool {
        let Some(mode) = BlendMode::from_i32(mode) else {
            log::warn!("unknown blend mode {mode}");
            return false;
        };
        let changed = self.engine.borrow_mut().set_blend_mode(id, mode);
        self.schedule();
        changed
    }

    /// Remove a layer.
    pub fn delete_layer(&self, id: usize) -> bool {
        let deleted = self.engine.borrow_mut().delete_layer(id);
        self.schedule();
        deleted
    }

    /// A pointer button went down over the page.
    pub fn pointer_down(&self) {
        self.engine.borrow_mut().pointer_down();
    }

    /// A pointer button was released.
    pub fn pointer_up(&self) {
        self.engine.borrow_mut().pointer_up();
    }

    /// The canvas container changed size.
    pub fn resize(&self, width: u32, height: u32) -> bool {
        let applied = {
            let mut engine = self.engine.borrow_mut();
            engine.gpu_mut().resize_surface(width, height);
            engine.resize(Resolution::new(width.max(1), height.max(1)))
        };
        self.schedule();
        applied
    }

    /// Force a redraw on the next refresh.
    pub fn request_redraw(&self) {
        let _ = self.engine.borrow_mut().request_redraw();
        self.schedule();
    }

    /// Notifications queued since the last call, as a JSON array.
    pub fn drain_notifications(&self) -> Result<String, JsValue> {
        let events = self.engine.borrow_mut().drain_notifications();
        serde_json::to_string(&events).map_err(js_error)
    }

    /// JSON Schema of the UI-exposed options.
    pub fn options_schema() -> Result<String, JsValue> {
        serde_json::to_string(&Options::json_schema()).map_err(js_error)
    }
}

impl WebApp {
    /// Register the frame callback if a redraw is pending and none is
    /// registered yet.
    fn schedule(&self) {
        if self.scheduled.get() || !self.engine.borrow().redraw_pending() {
            return;
        }
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Some(callback) = self.frame.borrow().as_ref() {
            match window.request_animation_frame(callback.as_ref().unchecked_ref())
            {
                Ok(_) => self.scheduled.set(true),
                Err(e) => log::warn!("requestAnimationFrame failed: {e:?}"),
            }
        }
    }
}
