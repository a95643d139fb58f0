//! Committed strokes and the values they carry.

use crate::geometry;
use kurbo::{Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stroke color used when nothing else has been chosen.
pub const DEFAULT_STROKE_COLOR: &str = "#111827";

/// Unique identifier of a committed stroke, e.g. `path-3f2a...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeId(String);

impl StrokeId {
    /// Generate a fresh, unique stroke id.
    pub fn generate() -> Self {
        Self(format!("path-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StrokeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for StrokeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A CSS-style color string as stored in board documents.
///
/// The original text is preserved on save; [`StrokeColor::to_color`] resolves
/// it for painting. Unparseable values paint as black.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeColor(String);

impl StrokeColor {
    pub fn new(color: impl Into<String>) -> Self {
        Self(color.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to RGBA bytes. Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and `transparent`.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let color = self.0.trim();
        if color.eq_ignore_ascii_case("transparent") {
            return [0, 0, 0, 0];
        }

        if let Some(rgba) = color.strip_prefix('#').and_then(parse_hex) {
            return rgba;
        }

        log::debug!("Unrecognized stroke color {:?}, painting black", self.0);
        [0, 0, 0, 255]
    }

    /// Resolve to a paintable color.
    pub fn to_color(&self) -> Color {
        let [r, g, b, a] = self.to_rgba8();
        Color::from_rgba8(r, g, b, a)
    }
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match hex.len() {
        3 => Some([
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
            255,
        ]),
        6 => Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255]),
        8 => Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, channel(6..8)?]),
        _ => None,
    }
}

impl Default for StrokeColor {
    fn default() -> Self {
        Self::new(DEFAULT_STROKE_COLOR)
    }
}

impl From<&str> for StrokeColor {
    fn from(color: &str) -> Self {
        Self::new(color)
    }
}

/// A finished, immutable stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    id: StrokeId,
    points: Vec<Point>,
    color: StrokeColor,
    width: f64,
}

impl Stroke {
    /// Build a stroke with a freshly generated id.
    ///
    /// Returns `None` for an empty point list or a width that is not a
    /// positive finite number.
    pub fn from_points(points: Vec<Point>, color: StrokeColor, width: f64) -> Option<Self> {
        Self::with_id(StrokeId::generate(), points, color, width)
    }

    /// Build a stroke with an explicit id.
    pub fn with_id(id: StrokeId, points: Vec<Point>, color: StrokeColor, width: f64) -> Option<Self> {
        let stroke = Self { id, points, color, width };
        stroke.is_valid().then_some(stroke)
    }

    pub fn id(&self) -> &StrokeId {
        &self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn color(&self) -> &StrokeColor {
        &self.color
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Whether the stroke satisfies the invariants of a committed stroke.
    pub fn is_valid(&self) -> bool {
        !self.points.is_empty()
            && self.width.is_finite()
            && self.width > 0.0
            && self.points.iter().all(|p| p.is_finite())
    }

    /// Bounding box of the stroke's points, not including its width.
    pub fn bounds(&self) -> Rect {
        geometry::bounds(&self.points).unwrap_or(Rect::ZERO)
    }

    /// Whether `point` lies within `tolerance` of any segment of the stroke.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self.points.as_slice() {
            [] => false,
            [only] => geometry::distance(point, *only) <= tolerance,
            points => points
                .windows(2)
                .any(|w| geometry::point_segment_distance(point, w[0], w[1]) <= tolerance),
        }
    }
}

/// How close the eraser must come to a stroke to remove it.
///
/// The effective radius for a stroke is `max(min, width * width_factor)`, so
/// thick strokes are easier to hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraseTolerance {
    pub min: f64,
    pub width_factor: f64,
}

impl EraseTolerance {
    pub fn with_min(min: f64) -> Self {
        Self { min, ..Self::default() }
    }

    pub fn for_stroke(&self, stroke: &Stroke) -> f64 {
        self.min.max(stroke.width() * self.width_factor)
    }
}

impl Default for EraseTolerance {
    fn default() -> Self {
        Self {
            min: 8.0,
            width_factor: 1.5,
        }
    }
}

/// A pointer sample as delivered by the host, before smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub position: Point,
    /// Host timestamp in milliseconds, when the platform provides one.
    pub timestamp_ms: Option<f64>,
}

impl RawSample {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            timestamp_ms: None,
        }
    }

    pub fn at(position: Point, timestamp_ms: f64) -> Self {
        Self {
            position,
            timestamp_ms: Some(timestamp_ms),
        }
    }

    /// Speed from `earlier` to this sample in pixels per millisecond.
    pub fn velocity_from(&self, earlier: &RawSample) -> Option<f64> {
        let dt = self.timestamp_ms? - earlier.timestamp_ms?;
        (dt > 0.0).then(|| geometry::distance(earlier.position, self.position) / dt)
    }
}
