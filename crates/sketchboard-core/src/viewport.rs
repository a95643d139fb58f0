//! Canvas sizing and device pixel ratio handling.

use kurbo::{Affine, Size};

/// Canvas geometry in CSS pixels plus the backing-store resolution.
///
/// Strokes are stored in CSS pixels. The backing store is `css * dpr` device
/// pixels and [`Viewport::transform`] maps one onto the other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    css_size: Size,
    device_pixel_ratio: f64,
    backing_width: u32,
    backing_height: u32,
    /// Bumped once per resize so surfaces know to rebuild their transform.
    generation: u64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            css_size: Size::ZERO,
            device_pixel_ratio: 1.0,
            backing_width: 0,
            backing_height: 0,
            generation: 0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        let mut viewport = Self::default();
        viewport.resize(width, height, device_pixel_ratio);
        viewport
    }

    /// Apply a new CSS size and pixel ratio.
    ///
    /// The ratio is clamped to at least 1 and the backing store is sized to
    /// `floor(css * dpr)`. Returns whether anything changed.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) -> bool {
        let dpr = if device_pixel_ratio.is_finite() {
            device_pixel_ratio.max(1.0)
        } else {
            1.0
        };
        let css_size = Size::new(width.max(0.0), height.max(0.0));
        let backing_width = (css_size.width * dpr).floor() as u32;
        let backing_height = (css_size.height * dpr).floor() as u32;

        let changed = css_size != self.css_size
            || dpr != self.device_pixel_ratio
            || backing_width != self.backing_width
            || backing_height != self.backing_height;

        self.css_size = css_size;
        self.device_pixel_ratio = dpr;
        self.backing_width = backing_width;
        self.backing_height = backing_height;
        self.generation += 1;
        if changed {
            log::debug!(
                "Viewport resized to {}x{} css px at dpr {} ({}x{} backing)",
                css_size.width,
                css_size.height,
                dpr,
                backing_width,
                backing_height
            );
        }
        changed
    }

    pub fn css_size(&self) -> Size {
        self.css_size
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Backing store size in device pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        (self.backing_width, self.backing_height)
    }

    /// CSS-to-device transform. Always absolute, never accumulated across resizes.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.device_pixel_ratio)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
