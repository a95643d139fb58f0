//! WebAssembly entry point and page integration.
//!
//! [`WebBoard`] is the handle page scripts drive: they forward pointer and
//! key events, call `paint` from their animation-frame callback and `tick`
//! on a timer.

use crate::app::PlatformApp;
use crate::config::AppConfig;
use sketchboard_core::persistence::{DocumentCookies, LoadSource, SaveOutcome};
use sketchboard_core::kurbo::Point;
use sketchboard_core::{KeyPress, Modifiers, PointerEvent, ToolKind};
use sketchboard_render::PixmapRenderer;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::Clamped;
use wasm_bindgen_futures::future_to_promise;
use web_time::Instant;

/// Path of the save endpoint on the page's own origin.
pub const SAVE_PATH: &str = "/api/save";

/// Route `log` output to the browser console.
pub fn init_logging() {
    // Fails only if a logger is already installed.
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Board data the server embedded in the page as `window.BOARD_DATA`.
///
/// Accepts either a JSON string or an already-parsed object.
pub fn bootstrap_data() -> Option<String> {
    let window = web_sys::window()?;
    let value = js_sys::Reflect::get(&window, &JsValue::from_str("BOARD_DATA")).ok()?;
    if value.is_undefined() || value.is_null() {
        return None;
    }
    if let Some(json) = value.as_string() {
        return Some(json);
    }
    js_sys::JSON::stringify(&value).ok()?.as_string()
}

/// Resolve [`SAVE_PATH`] against the page origin.
pub fn page_save_endpoint() -> Option<String> {
    let origin = web_sys::window()?.location().origin().ok()?;
    let url = url::Url::parse(&origin).ok()?.join(SAVE_PATH).ok()?;
    Some(url.into())
}

/// Default config with the save endpoint pointed at the current origin.
pub fn page_config() -> AppConfig {
    let mut config = AppConfig::default();
    if let Some(endpoint) = page_save_endpoint() {
        config.save_endpoint = endpoint;
    }
    config
}

/// Seed `app` from the page: legacy cookies, then `BOARD_DATA`, then localStorage.
pub async fn load_page_board(app: &mut PlatformApp) -> LoadSource {
    let bootstrap = bootstrap_data();
    let mut cookies = DocumentCookies;
    let source = app.load(bootstrap.as_deref(), &mut cookies).await;
    log::info!("Board loaded from {:?}", source);
    source
}

/// Initialize logging when the module is instantiated.
#[wasm_bindgen(start)]
pub fn start_wasm() {
    init_logging();
    log::info!("Starting SketchBoard (WASM)");
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// A drawing board driven from JavaScript.
///
/// Storage futures are backed by the synchronous localStorage, so the
/// promise-returning methods finish within a single poll and never leave
/// the app borrowed while other calls arrive.
#[wasm_bindgen]
pub struct WebBoard {
    app: Rc<RefCell<PlatformApp>>,
    raster: Option<PixmapRenderer>,
}

#[wasm_bindgen]
impl WebBoard {
    /// `request_frame` is called whenever a repaint is needed; the page
    /// should answer with `requestAnimationFrame(() => board.paint(ctx))`.
    #[wasm_bindgen(constructor)]
    pub fn new(request_frame: js_sys::Function) -> Result<WebBoard, JsValue> {
        let requester = move || {
            if let Err(e) = request_frame.call0(&JsValue::NULL) {
                log::warn!("Frame request callback failed: {:?}", e);
            }
        };
        let app = PlatformApp::from_config(page_config(), Box::new(requester)).map_err(js_err)?;
        Ok(Self {
            app: Rc::new(RefCell::new(app)),
            raster: None,
        })
    }

    /// Migrate legacy cookies and load the initial board. Resolves to the source name.
    pub fn load(&self) -> js_sys::Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let mut app = app.try_borrow_mut().map_err(js_err)?;
            let source = load_page_board(&mut app).await;
            Ok(JsValue::from_str(&format!("{:?}", source)))
        })
    }

    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        self.with_app(|app| app.session_mut().resize(width, height, device_pixel_ratio));
    }

    pub fn pointer_down(&mut self, pointer_id: u32, x: f64, y: f64, timestamp_ms: f64) {
        self.pointer(PointerEvent::Down {
            pointer_id,
            position: Point::new(x, y),
            timestamp_ms: Some(timestamp_ms),
        });
    }

    pub fn pointer_move(&mut self, pointer_id: u32, x: f64, y: f64, timestamp_ms: f64) {
        self.pointer(PointerEvent::Move {
            pointer_id,
            position: Point::new(x, y),
            timestamp_ms: Some(timestamp_ms),
        });
    }

    pub fn pointer_up(&mut self, pointer_id: u32, x: f64, y: f64) {
        self.pointer(PointerEvent::Up {
            pointer_id,
            position: Point::new(x, y),
        });
    }

    /// Pointer capture was lost.
    pub fn pointer_cancel(&mut self, pointer_id: u32) {
        self.pointer(PointerEvent::Cancel { pointer_id });
    }

    /// Returns true if the key ran a command, so the page can prevent the default action.
    pub fn key_down(&mut self, key: String, ctrl: bool, shift: bool, alt: bool, meta: bool) -> bool {
        let press = KeyPress::new(key, Modifiers { shift, ctrl, alt, meta });
        self.with_app(|app| app.handle_key(&press, Instant::now()).is_some())
            .unwrap_or(false)
    }

    /// `"pencil"` or `"eraser"`. Returns false for anything else.
    pub fn set_tool(&mut self, name: &str) -> bool {
        let tool = match name {
            "pencil" => ToolKind::Pencil,
            "eraser" => ToolKind::Eraser,
            _ => return false,
        };
        self.with_app(|app| app.session_mut().set_tool(tool)).is_some()
    }

    pub fn set_pen_width(&mut self, width: f64) {
        self.with_app(|app| app.session_mut().set_pen_width(width));
    }

    pub fn set_pen_color(&mut self, color: &str) {
        self.with_app(|app| app.session_mut().set_pen_color(color));
    }

    pub fn undo(&mut self) -> bool {
        self.with_app(|app| app.session_mut().undo()).unwrap_or(false)
    }

    pub fn redo(&mut self) -> bool {
        self.with_app(|app| app.session_mut().redo()).unwrap_or(false)
    }

    /// Clear the board. Confirmation is the page's job.
    pub fn new_board(&mut self) {
        self.with_app(|app| app.new_board(Instant::now()));
    }

    /// Flush a due autosave. Resolves to whether a write happened.
    pub fn tick(&self) -> js_sys::Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            let Ok(mut app) = app.try_borrow_mut() else {
                return Ok(JsValue::FALSE);
            };
            let saved = app.tick(Instant::now()).await;
            Ok(JsValue::from_bool(saved))
        })
    }

    /// Paint the pending frame into `ctx`. Returns false if nothing was scheduled.
    pub fn paint(&mut self, ctx: &web_sys::CanvasRenderingContext2d) -> Result<bool, JsValue> {
        let mut app = self.app.try_borrow_mut().map_err(js_err)?;
        let (width, height) = app.session().viewport().backing_size();
        let (width, height) = (width.max(1), height.max(1));
        let stale = self
            .raster
            .as_ref()
            .is_none_or(|r| r.pixmap().width() != width || r.pixmap().height() != height);
        if stale {
            self.raster = Some(PixmapRenderer::new(width, height).map_err(js_err)?);
        }
        let Some(raster) = self.raster.as_mut() else {
            return Ok(false);
        };
        if !app.paint_frame(raster) {
            return Ok(false);
        }
        let pixels = raster.rgba_bytes();
        let image = web_sys::ImageData::new_with_u8_clamped_array_and_sh(Clamped(&pixels), width, height)?;
        ctx.put_image_data(&image, 0.0, 0.0)?;
        Ok(true)
    }

    /// Upload the board. Resolves to the share URL, or to `null` after
    /// navigating to the login page.
    pub fn save(&self) -> js_sys::Promise {
        let request = self.app.try_borrow().map_err(js_err).and_then(|app| {
            let preview =
                sketchboard_render::preview_data_url(app.session().board(), &app.export_options())
                    .map_err(js_err)?;
            Ok(app.bridge().save_remote(app.session().board(), &preview))
        });
        future_to_promise(async move {
            match request?.await.map_err(js_err)? {
                SaveOutcome::Saved { url } => Ok(JsValue::from_str(&url)),
                SaveOutcome::LoginRequired { login_url } => {
                    if let Some(window) = web_sys::window() {
                        window.location().set_href(&login_url)?;
                    }
                    Ok(JsValue::NULL)
                }
            }
        })
    }

    pub fn is_saving(&self) -> bool {
        self.app.try_borrow().map(|app| app.is_saving()).unwrap_or(true)
    }
}

impl WebBoard {
    fn pointer(&mut self, event: PointerEvent) {
        self.with_app(|app| {
            app.handle_pointer(event, Instant::now());
        });
    }

    fn with_app<R>(&self, f: impl FnOnce(&mut PlatformApp) -> R) -> Option<R> {
        match self.app.try_borrow_mut() {
            Ok(mut app) => Some(f(&mut app)),
            Err(_) => {
                log::warn!("Board is busy, dropping call");
                None
            }
        }
    }
}
