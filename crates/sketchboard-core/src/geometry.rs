//! Point math, live-stroke smoothing and curve construction.
//!
//! Everything here is a pure function over `kurbo` points. The stroke buffer
//! uses the smoothing helpers while a pointer is down, and both renderers use
//! [`curve_path`] to turn a stroke's points into the same visual curve.

use kurbo::{BezPath, CubicBez, Line, Point, QuadBez, Rect, Vec2};

/// Fraction of a neighbour's offset used to place cubic control points.
pub const CURVE_TENSION: f64 = 0.25;

/// Upper bound on how far a control point may sit from its anchor.
pub const MAX_CONTROL_OFFSET: f64 = 25.0;

/// Position of the closing quadratic's control point between the last two samples.
pub const TAIL_CONTROL_RATIO: f64 = 0.3;

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Distance from `point` to the segment `start..end`.
///
/// Projects onto the segment and clamps the projection parameter to `[0, 1]`.
/// A zero-length segment degrades to point distance.
pub fn point_segment_distance(point: Point, start: Point, end: Point) -> f64 {
    let segment = end - start;
    let len_sq = segment.hypot2();
    if len_sq < f64::EPSILON {
        return distance(point, start);
    }

    let t = ((point - start).dot(segment) / len_sq).clamp(0.0, 1.0);
    distance(point, start + segment * t)
}

/// Perpendicular distance from `point` to the infinite line through `start` and `end`.
fn perpendicular_distance(point: Point, start: Point, end: Point) -> f64 {
    let line = end - start;
    let len = line.hypot();
    if len < f64::EPSILON {
        return distance(point, start);
    }
    (line.cross(point - start)).abs() / len
}

/// Pick the exponential smoothing factor for the next raw sample.
///
/// Large jumps from the last smoothed point use the lighter `fast_factor` so the
/// smoothed trail keeps up with quick motion.
pub fn smoothing_factor(
    last_smoothed: Point,
    raw: Point,
    factor: f64,
    fast_factor: f64,
    fast_threshold: f64,
) -> f64 {
    if distance(last_smoothed, raw) > fast_threshold {
        fast_factor
    } else {
        factor
    }
}

/// Move `last` toward `raw` by `1 - factor` of the gap.
#[inline]
pub fn exponential_smooth(last: Point, raw: Point, factor: f64) -> Point {
    last + (raw - last) * (1.0 - factor)
}

/// Single pass of neighbour averaging: each interior point becomes
/// `(prev + 2 * current + next) / 4`. End points are kept as-is.
pub fn catmull_rom_smooth(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);
    for window in points.windows(3) {
        let (prev, current, next) = (window[0], window[1], window[2]);
        out.push(Point::new(
            (prev.x + 2.0 * current.x + next.x) / 4.0,
            (prev.y + 2.0 * current.y + next.y) / 4.0,
        ));
    }
    out.push(points[points.len() - 1]);
    out
}

/// Chaikin corner cutting followed by 2x downsampling, repeated `iterations` times.
///
/// The first and last points always survive, so the smoothed polyline keeps the
/// stroke's end points.
pub fn chaikin_smooth(points: &[Point], iterations: usize) -> Vec<Point> {
    let mut current = points.to_vec();
    for _ in 0..iterations {
        if current.len() < 3 {
            break;
        }

        let mut cut = Vec::with_capacity(current.len() * 2);
        cut.push(current[0]);
        for pair in current.windows(2) {
            let (p0, p1) = (pair[0], pair[1]);
            cut.push(p0.lerp(p1, 0.25));
            cut.push(p0.lerp(p1, 0.75));
        }
        cut.push(current[current.len() - 1]);

        let last = cut[cut.len() - 1];
        let mut sampled: Vec<Point> = cut.iter().step_by(2).copied().collect();
        if sampled.last() != Some(&last) {
            sampled.push(last);
        }
        current = sampled;
    }
    current
}

/// Ramer-Douglas-Peucker line simplification.
pub fn simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_index = 0;
    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(*point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    if max_dist > tolerance {
        let mut left = simplify(&points[..=max_index], tolerance);
        let right = simplify(&points[max_index..], tolerance);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

/// Axis-aligned bounds of a point list, or `None` when it is empty.
pub fn bounds(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let mut rect = Rect::from_points(*first, *first);
    for point in &points[1..] {
        rect = rect.union_pt(*point);
    }
    Some(rect)
}

/// One piece of the curve drawn through a stroke's points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveSegment {
    /// A single-point stroke, drawn as a filled circle.
    Dot(Point),
    /// Two-point strokes are a straight line.
    Line(Line),
    /// Closing piece of a longer stroke.
    Quad(QuadBez),
    /// Interior piece of a longer stroke.
    Cubic(CubicBez),
}

impl CurveSegment {
    /// Where this segment starts.
    pub fn start(&self) -> Point {
        match self {
            CurveSegment::Dot(p) => *p,
            CurveSegment::Line(line) => line.p0,
            CurveSegment::Quad(quad) => quad.p0,
            CurveSegment::Cubic(cubic) => cubic.p0,
        }
    }

    /// Where this segment ends.
    pub fn end(&self) -> Point {
        match self {
            CurveSegment::Dot(p) => *p,
            CurveSegment::Line(line) => line.p1,
            CurveSegment::Quad(quad) => quad.p2,
            CurveSegment::Cubic(cubic) => cubic.p3,
        }
    }
}

/// Iterator over the segments of a smooth curve through a point list.
///
/// With `n >= 3` points it yields cubics ending at points `1..=n-3` followed by
/// one quadratic to the final point. Control points are pulled from the
/// neighbouring samples with [`CURVE_TENSION`] and clamped to
/// [`MAX_CONTROL_OFFSET`], which keeps sharp turns from overshooting.
#[derive(Debug, Clone)]
pub struct CurveSegments<'a> {
    points: &'a [Point],
    index: usize,
}

/// Build the segment sequence for `points`.
pub fn curve_through_points(points: &[Point]) -> CurveSegments<'_> {
    CurveSegments { points, index: 0 }
}

fn clamp_offset(offset: Vec2, max: f64) -> Vec2 {
    let len = offset.hypot();
    if len > max { offset * (max / len) } else { offset }
}

impl Iterator for CurveSegments<'_> {
    type Item = CurveSegment;

    fn next(&mut self) -> Option<CurveSegment> {
        let points = self.points;
        let n = points.len();
        match n {
            0 => None,
            1 | 2 => {
                if self.index > 0 {
                    return None;
                }
                self.index = 1;
                if n == 1 {
                    Some(CurveSegment::Dot(points[0]))
                } else {
                    Some(CurveSegment::Line(Line::new(points[0], points[1])))
                }
            }
            _ => {
                let i = self.index + 1;
                if i < n - 2 {
                    let prev = points[i - 1];
                    let current = points[i];
                    let after_next = points[i + 2];
                    let cp1 = prev + clamp_offset((current - prev) * CURVE_TENSION, MAX_CONTROL_OFFSET);
                    let cp2 =
                        current - clamp_offset((after_next - prev) * CURVE_TENSION, MAX_CONTROL_OFFSET);
                    self.index += 1;
                    Some(CurveSegment::Cubic(CubicBez::new(prev, cp1, cp2, current)))
                } else if i == n - 2 {
                    let start = points[n - 3];
                    let second_last = points[n - 2];
                    let last = points[n - 1];
                    let control = second_last + (last - second_last) * TAIL_CONTROL_RATIO;
                    self.index += 1;
                    Some(CurveSegment::Quad(QuadBez::new(start, control, last)))
                } else {
                    None
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = match self.points.len() {
            0 => 0,
            1 | 2 => 1,
            n => n - 2,
        };
        let remaining = total.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CurveSegments<'_> {}

/// Assemble the curve through `points` into a single path.
///
/// Single-point strokes produce an empty path; callers draw those as a dot.
pub fn curve_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if points.len() < 2 {
        return path;
    }

    path.move_to(points[0]);
    for segment in curve_through_points(points) {
        match segment {
            CurveSegment::Dot(_) => {}
            CurveSegment::Line(line) => path.line_to(line.p1),
            CurveSegment::Quad(quad) => path.quad_to(quad.p1, quad.p2),
            CurveSegment::Cubic(cubic) => path.curve_to(cubic.p1, cubic.p2, cubic.p3),
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point::new(i as f64 * 10.0, if i % 2 == 0 { 0.0 } else { 8.0 }))
            .collect()
    }

    #[test]
    fn test_point_segment_distance_clamps_projection() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_segment_distance(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((point_segment_distance(Point::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-9);
        assert!((point_segment_distance(Point::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_segment_distance_degenerate_segment() {
        let a = Point::new(2.0, 2.0);
        assert!((point_segment_distance(Point::new(5.0, 6.0), a, a) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_factor_switches_on_fast_motion() {
        let last = Point::new(0.0, 0.0);
        assert_eq!(smoothing_factor(last, Point::new(5.0, 0.0), 0.4, 0.2, 20.0), 0.4);
        assert_eq!(smoothing_factor(last, Point::new(25.0, 0.0), 0.4, 0.2, 20.0), 0.2);
    }

    #[test]
    fn test_exponential_smooth() {
        let p = exponential_smooth(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 0.4);
        assert!((p.x - 6.0).abs() < 1e-9);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn test_catmull_rom_smooth_keeps_endpoints() {
        let points = vec![Point::new(0.0, 0.0), Point::new(4.0, 8.0), Point::new(8.0, 0.0)];
        let smoothed = catmull_rom_smooth(&points);
        assert_eq!(smoothed.len(), 3);
        assert_eq!(smoothed[0], points[0]);
        assert_eq!(smoothed[2], points[2]);
        assert!((smoothed[1].y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_chaikin_smooth_keeps_endpoints() {
        let points = zigzag(12);
        let smoothed = chaikin_smooth(&points, 2);
        assert_eq!(smoothed.first(), points.first());
        assert_eq!(smoothed.last(), points.last());
    }

    #[test]
    fn test_simplify_collinear() {
        let points: Vec<Point> = (0..10).map(|i| Point::new(i as f64, i as f64)).collect();
        let simplified = simplify(&points, 0.5);
        assert_eq!(simplified, vec![Point::new(0.0, 0.0), Point::new(9.0, 9.0)]);
    }

    #[test]
    fn test_simplify_keeps_corner() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(10.0, 10.0),
        ];
        let simplified = simplify(&points, 0.5);
        assert_eq!(simplified.len(), 3);
        assert_eq!(simplified[1], Point::new(10.0, 0.0));
    }

    #[test]
    fn test_bounds() {
        assert!(bounds(&[]).is_none());
        let rect = bounds(&[Point::new(3.0, -1.0), Point::new(-2.0, 4.0)]).unwrap();
        assert_eq!(rect, Rect::new(-2.0, -1.0, 3.0, 4.0));
    }

    #[test]
    fn test_curve_single_point_is_dot() {
        let points = [Point::new(4.0, 4.0)];
        let segments: Vec<_> = curve_through_points(&points).collect();
        assert_eq!(segments, vec![CurveSegment::Dot(points[0])]);
        assert!(curve_path(&points).elements().is_empty());
    }

    #[test]
    fn test_curve_two_points_is_line() {
        let points = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let segments: Vec<_> = curve_through_points(&points).collect();
        assert_eq!(segments.len(), 1);
        assert!(matches!(segments[0], CurveSegment::Line(_)));
    }

    #[test]
    fn test_curve_segments_are_contiguous() {
        let points = zigzag(9);
        let segments: Vec<_> = curve_through_points(&points).collect();
        assert_eq!(segments.len(), points.len() - 2);
        assert_eq!(curve_through_points(&points).len(), points.len() - 2);

        assert_eq!(segments[0].start(), points[0]);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
        assert_eq!(segments.last().unwrap().end(), points[points.len() - 1]);
        assert!(matches!(segments.last(), Some(CurveSegment::Quad(_))));
    }

    #[test]
    fn test_curve_three_points_is_single_quad() {
        let points = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(20.0, 10.0)];
        let segments: Vec<_> = curve_through_points(&points).collect();
        assert_eq!(segments.len(), 1);
        match segments[0] {
            CurveSegment::Quad(quad) => {
                assert_eq!(quad.p0, points[0]);
                assert!((quad.p1.x - 13.0).abs() < 1e-9);
                assert!((quad.p1.y - 3.0).abs() < 1e-9);
                assert_eq!(quad.p2, points[2]);
            }
            other => panic!("expected quad, got {:?}", other),
        }
    }

    #[test]
    fn test_control_points_are_clamped() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(400.0, 0.0),
            Point::new(400.0, 400.0),
            Point::new(0.0, 400.0),
        ];
        let first = curve_through_points(&points).next().unwrap();
        match first {
            CurveSegment::Cubic(cubic) => {
                assert!(distance(cubic.p0, cubic.p1) <= MAX_CONTROL_OFFSET + 1e-9);
                assert!(distance(cubic.p3, cubic.p2) <= MAX_CONTROL_OFFSET + 1e-9);
            }
            other => panic!("expected cubic, got {:?}", other),
        }
    }

    #[test]
    fn test_curve_path_element_count() {
        let path = curve_path(&zigzag(6));
        // move_to + 3 cubics + closing quad
        assert_eq!(path.elements().len(), 5);
    }
}
