//! CPU rasterization of boards to PNG, used for save previews and exports.

use crate::renderer::{paint, RenderContext, RenderResult, Renderer, RendererError, StrokeRenderer, StrokeStyle};
use base64::Engine;
use kurbo::{Affine, BezPath, PathEl, Point};
use peniko::Color;
use sketchboard_core::{Board, Viewport};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Transform};

/// Prefix of a PNG data URL.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Size and background of an exported image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
    /// Device pixels per CSS pixel.
    pub scale: f64,
    pub background: Color,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scale: 1.0,
            background: Color::WHITE,
        }
    }
}

impl ExportOptions {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Match what is on screen: the viewport's CSS size at its pixel ratio.
    pub fn from_viewport(viewport: &Viewport) -> Self {
        let size = viewport.css_size();
        Self {
            width: size.width,
            height: size.height,
            scale: viewport.device_pixel_ratio(),
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height, self.scale)
    }
}

/// Renders into a tiny-skia pixmap.
pub struct PixmapRenderer {
    pixmap: Pixmap,
}

impl PixmapRenderer {
    /// Create a renderer with a transparent `width` x `height` pixmap.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| RendererError::Surface(format!("invalid pixmap size {}x{}", width, height)))?;
        Ok(Self { pixmap })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Straight (non-premultiplied) RGBA bytes.
    pub fn rgba_bytes(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }

    /// Encode the current pixmap as PNG.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        encode_png(&self.rgba_bytes(), self.pixmap.width(), self.pixmap.height())
    }
}

impl StrokeRenderer for PixmapRenderer {
    fn clear(&mut self, viewport: &Viewport, background: Option<Color>) {
        let (width, height) = viewport.backing_size();
        if (width, height) != (self.pixmap.width(), self.pixmap.height()) {
            match Pixmap::new(width, height) {
                Some(pixmap) => self.pixmap = pixmap,
                None => log::warn!("Cannot resize pixmap to {}x{}, keeping current size", width, height),
            }
        }
        match background {
            Some(color) => self.pixmap.fill(to_skia_color(color)),
            None => self.pixmap.fill(tiny_skia::Color::TRANSPARENT),
        }
    }

    fn render_curve(&mut self, path: &BezPath, style: &StrokeStyle, transform: Affine) {
        let Some(path) = to_skia_path(path) else {
            return;
        };
        let paint = solid_paint(style.color);
        let stroke = tiny_skia::Stroke {
            width: style.width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..tiny_skia::Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, to_skia_transform(transform), None);
    }

    fn render_dot(&mut self, center: Point, radius: f64, style: &StrokeStyle, transform: Affine) {
        let Some(circle) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32) else {
            return;
        };
        let paint = solid_paint(style.color);
        self.pixmap
            .fill_path(&circle, &paint, FillRule::Winding, to_skia_transform(transform), None);
    }
}

impl Renderer for PixmapRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        paint(self, ctx);
    }
}

fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_skia_color(color));
    paint.anti_alias = true;
    paint
}

fn to_skia_color(color: Color) -> tiny_skia::Color {
    let [r, g, b, a] = color.components;
    tiny_skia::Color::from_rgba(r, g, b, a).unwrap_or(tiny_skia::Color::BLACK)
}

fn to_skia_transform(transform: Affine) -> Transform {
    let [a, b, c, d, e, f] = transform.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

/// Encode straight RGBA pixels as PNG.
pub fn encode_png(rgba: &[u8], width: u32, height: u32) -> RenderResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| RendererError::Encode(e.to_string()))?;
        writer
            .write_image_data(rgba)
            .map_err(|e| RendererError::Encode(e.to_string()))?;
    }
    Ok(buf)
}

/// Rasterize the committed strokes of `board` to a PNG.
pub fn export_png(board: &Board, options: &ExportOptions) -> RenderResult<Vec<u8>> {
    let viewport = options.viewport();
    let (width, height) = viewport.backing_size();
    if width == 0 || height == 0 {
        return Err(RendererError::Export(format!(
            "export area is empty ({}x{})",
            options.width, options.height
        )));
    }

    let mut renderer = PixmapRenderer::new(width, height)?;
    let ctx = RenderContext::new(board, viewport).with_background(options.background);
    renderer.build_scene(&ctx);
    let png = renderer.encode_png()?;
    log::debug!("Exported {} strokes to {}x{} PNG ({} bytes)", board.len(), width, height, png.len());
    Ok(png)
}

/// Rasterize `board` to a `data:image/png;base64,...` URL.
pub fn preview_data_url(board: &Board, options: &ExportOptions) -> RenderResult<String> {
    let png = export_png(board, options)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, encoded))
}
