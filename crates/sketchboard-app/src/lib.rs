//! SketchBoard Application
//!
//! The host shell tying a drawing session to the local autosave store, the
//! remote save endpoint and a renderer.

mod app;
mod config;

pub use app::{App, AppError, AppResult, PlatformApp};
pub use config::{AppConfig, AppConfigError, DEFAULT_SAVE_ENDPOINT};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{WebBoard, bootstrap_data, init_logging, load_page_board, page_config, start_wasm};
