//! SketchBoard Render Library
//!
//! Renderer abstraction, a Vello scene builder for on-screen frames and a
//! tiny-skia rasterizer for PNG exports.

pub mod export;
pub mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use export::{encode_png, export_png, preview_data_url, ExportOptions, PixmapRenderer, PNG_DATA_URL_PREFIX};
pub use renderer::{paint, RenderContext, RenderResult, Renderer, RendererError, StrokeRenderer, StrokeStyle};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloRenderer;
