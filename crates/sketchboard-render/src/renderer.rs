//! Renderer trait abstraction and the shared paint routine.

use kurbo::{Affine, BezPath, Point};
use peniko::Color;
use sketchboard_core::geometry;
use sketchboard_core::{Board, Session, StrokeBuffer, StrokeColor, Viewport};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Export failed: {0}")]
    Export(String),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Default opacity of the stroke being drawn.
pub const LIVE_STROKE_OPACITY: f32 = 0.9;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// Committed strokes to paint, oldest first.
    pub board: &'a Board,
    /// The in-progress stroke, painted above everything else.
    pub live_stroke: Option<&'a StrokeBuffer>,
    /// Canvas size and pixel ratio.
    pub viewport: Viewport,
    /// Background fill. `None` leaves the surface transparent.
    pub background_color: Option<Color>,
    /// Opacity applied to the in-progress stroke.
    pub live_stroke_opacity: f32,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context for `board`.
    pub fn new(board: &'a Board, viewport: Viewport) -> Self {
        Self {
            board,
            live_stroke: None,
            viewport,
            background_color: None,
            live_stroke_opacity: LIVE_STROKE_OPACITY,
        }
    }

    /// Everything the session currently shows on screen.
    pub fn from_session(session: &'a Session) -> Self {
        Self::new(session.board(), *session.viewport())
            .with_live_stroke(session.live_stroke())
            .with_live_opacity(session.config().live_stroke_opacity)
    }

    /// Set the in-progress stroke.
    pub fn with_live_stroke(mut self, live_stroke: Option<&'a StrokeBuffer>) -> Self {
        self.live_stroke = live_stroke;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    /// Set the opacity of the in-progress stroke.
    pub fn with_live_opacity(mut self, opacity: f32) -> Self {
        self.live_stroke_opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

/// Resolved paint for one stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

impl StrokeStyle {
    pub fn new(color: &StrokeColor, width: f64) -> Self {
        Self {
            color: color.to_color(),
            width,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.color = self.color.multiply_alpha(opacity);
        self
    }
}

/// Trait for rendering backends.
///
/// Implementations can use Vello, a CPU rasterizer, or other rendering engines.
pub trait Renderer: Send + Sync {
    /// Build the scene/command buffer for a frame.
    ///
    /// This method is called once per frame and should prepare all drawing commands.
    fn build_scene(&mut self, ctx: &RenderContext);
}

/// Drawing primitives a backend provides to [`paint`].
pub trait StrokeRenderer {
    /// Reset the surface for a new frame, filling it with `background` if given.
    fn clear(&mut self, viewport: &Viewport, background: Option<Color>);

    /// Stroke `path` with round caps and joins.
    fn render_curve(&mut self, path: &BezPath, style: &StrokeStyle, transform: Affine);

    /// Fill a circle, used for single-point strokes.
    fn render_dot(&mut self, center: Point, radius: f64, style: &StrokeStyle, transform: Affine);
}

/// Paint a frame: clear, every committed stroke in order, then the live stroke.
pub fn paint<R: StrokeRenderer + ?Sized>(renderer: &mut R, ctx: &RenderContext) {
    let transform = ctx.viewport.transform();
    renderer.clear(&ctx.viewport, ctx.background_color);

    for stroke in ctx.board.paths() {
        let style = StrokeStyle::new(stroke.color(), stroke.width());
        render_points(renderer, stroke.points(), &style, transform);
    }

    if let Some(live) = ctx.live_stroke {
        let style = StrokeStyle::new(live.color(), live.width()).with_opacity(ctx.live_stroke_opacity);
        render_points(renderer, live.smoothed_points(), &style, transform);
    }
}

fn render_points<R: StrokeRenderer + ?Sized>(
    renderer: &mut R,
    points: &[Point],
    style: &StrokeStyle,
    transform: Affine,
) {
    match points {
        [] => {}
        [only] => renderer.render_dot(*only, style.width / 2.0, style, transform),
        _ => renderer.render_curve(&geometry::curve_path(points), style, transform),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchboard_core::{EngineConfig, RawSample, Stroke, StrokeParams};

    #[derive(Debug, PartialEq)]
    enum Op {
        Clear(Option<Color>),
        Curve { start: Point, alpha: f32, width: f64 },
        Dot { center: Point, radius: f64 },
    }

    #[derive(Default)]
    struct RecordingRenderer {
        ops: Vec<Op>,
    }

    impl StrokeRenderer for RecordingRenderer {
        fn clear(&mut self, _viewport: &Viewport, background: Option<Color>) {
            self.ops.push(Op::Clear(background));
        }

        fn render_curve(&mut self, path: &BezPath, style: &StrokeStyle, _transform: Affine) {
            let start = match path.elements().first() {
                Some(kurbo::PathEl::MoveTo(p)) => *p,
                _ => Point::ZERO,
            };
            self.ops.push(Op::Curve {
                start,
                alpha: style.color.components[3],
                width: style.width,
            });
        }

        fn render_dot(&mut self, center: Point, radius: f64, _style: &StrokeStyle, _transform: Affine) {
            self.ops.push(Op::Dot { center, radius });
        }
    }

    fn stroke(points: &[(f64, f64)], width: f64) -> Stroke {
        Stroke::from_points(
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            StrokeColor::default(),
            width,
        )
        .unwrap()
    }

    #[test]
    fn test_paints_strokes_in_order() {
        let mut board = Board::new();
        board.push(stroke(&[(0.0, 0.0), (10.0, 0.0)], 2.0));
        board.push(stroke(&[(5.0, 5.0)], 4.0));
        board.push(stroke(&[(0.0, 20.0), (10.0, 20.0), (20.0, 25.0)], 3.0));

        let mut renderer = RecordingRenderer::default();
        paint(&mut renderer, &RenderContext::new(&board, Viewport::new(100.0, 100.0, 1.0)));

        assert_eq!(renderer.ops.len(), 4);
        assert_eq!(renderer.ops[0], Op::Clear(None));
        assert!(matches!(renderer.ops[1], Op::Curve { start, .. } if start == Point::new(0.0, 0.0)));
        assert_eq!(
            renderer.ops[2],
            Op::Dot {
                center: Point::new(5.0, 5.0),
                radius: 2.0
            }
        );
        assert!(matches!(renderer.ops[3], Op::Curve { start, .. } if start == Point::new(0.0, 20.0)));
    }

    #[test]
    fn test_live_stroke_on_top_with_opacity() {
        let mut board = Board::new();
        board.push(stroke(&[(0.0, 0.0), (10.0, 0.0)], 2.0));
        board.begin_stroke(RawSample::new(Point::new(0.0, 50.0)), StrokeColor::default(), 5.0);
        board
            .extend_stroke(RawSample::new(Point::new(10.0, 50.0)), &StrokeParams::default())
            .unwrap();

        let ctx = RenderContext::new(&board, Viewport::new(100.0, 100.0, 1.0))
            .with_live_stroke(board.live_stroke())
            .with_background(Color::WHITE);
        let mut renderer = RecordingRenderer::default();
        paint(&mut renderer, &ctx);

        assert_eq!(renderer.ops.len(), 3);
        assert_eq!(renderer.ops[0], Op::Clear(Some(Color::WHITE)));
        match renderer.ops[2] {
            Op::Curve { start, alpha, width } => {
                assert_eq!(start, Point::new(0.0, 50.0));
                assert!((alpha - 0.9).abs() < 1e-6);
                assert_eq!(width, 5.0);
            }
            ref other => panic!("expected live curve, got {:?}", other),
        }
    }

    #[test]
    fn test_context_from_idle_session_has_no_live_stroke() {
        let session = Session::new(EngineConfig::default(), Box::new(|| {}));
        let ctx = RenderContext::from_session(&session);
        assert!(ctx.live_stroke.is_none());
        assert!((ctx.live_stroke_opacity - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_empty_board_only_clears() {
        let board = Board::new();
        let mut renderer = RecordingRenderer::default();
        paint(&mut renderer, &RenderContext::new(&board, Viewport::default()));
        assert_eq!(renderer.ops, vec![Op::Clear(None)]);
    }
}
