//! Vello-based renderer implementation.

use crate::renderer::{paint, RenderContext, Renderer, StrokeRenderer, StrokeStyle};
use kurbo::{Affine, BezPath, Cap, Circle, Join, Point, Rect, Stroke};
use peniko::{Color, Fill};
use sketchboard_core::Viewport;
use vello::Scene;

/// Vello-based renderer.
pub struct VelloRenderer {
    scene: Scene,
}

impl Default for VelloRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloRenderer {
    /// Create a new Vello renderer.
    pub fn new() -> Self {
        Self { scene: Scene::new() }
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the built scene.
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }
}

impl StrokeRenderer for VelloRenderer {
    fn clear(&mut self, viewport: &Viewport, background: Option<Color>) {
        self.scene.reset();
        if let Some(color) = background {
            let (width, height) = viewport.backing_size();
            let rect = Rect::new(0.0, 0.0, width as f64, height as f64);
            self.scene.fill(Fill::NonZero, Affine::IDENTITY, color, None, &rect);
        }
    }

    fn render_curve(&mut self, path: &BezPath, style: &StrokeStyle, transform: Affine) {
        let stroke = Stroke::new(style.width).with_caps(Cap::Round).with_join(Join::Round);
        self.scene.stroke(&stroke, transform, style.color, None, path);
    }

    fn render_dot(&mut self, center: Point, radius: f64, style: &StrokeStyle, transform: Affine) {
        self.scene
            .fill(Fill::NonZero, transform, style.color, None, &Circle::new(center, radius));
    }
}

impl Renderer for VelloRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        paint(self, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchboard_core::{Board, Stroke as BoardStroke, StrokeColor};

    #[test]
    fn test_vello_renderer_creation() {
        let renderer = VelloRenderer::new();
        assert!(renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_build_scene_with_strokes() {
        let mut board = Board::new();
        let points = vec![Point::new(10.0, 10.0), Point::new(40.0, 20.0), Point::new(80.0, 10.0)];
        board.push(BoardStroke::from_points(points, StrokeColor::default(), 3.0).unwrap());

        let mut renderer = VelloRenderer::new();
        let ctx = RenderContext::new(&board, Viewport::new(100.0, 100.0, 2.0));
        renderer.build_scene(&ctx);
        assert!(!renderer.scene().encoding().is_empty());

        let taken = renderer.take_scene();
        assert!(!taken.encoding().is_empty());
        assert!(renderer.scene().encoding().is_empty());
    }
}
