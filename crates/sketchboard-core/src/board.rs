//! The board: committed strokes, opaque view state and the live stroke.

use crate::buffer::{SampleRejection, StrokeBuffer, StrokeParams};
use crate::stroke::{EraseTolerance, RawSample, Stroke, StrokeColor, StrokeId};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn empty_view() -> Value {
    Value::Object(Default::default())
}

/// All drawing state that is persisted, plus the in-progress stroke.
///
/// Serializes as `{ "paths": [...], "view": {...} }`, which is the payload
/// written to the local autosave slot and sent with remote saves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    /// Committed strokes in paint order, oldest first.
    #[serde(default)]
    paths: Vec<Stroke>,
    /// View state owned by the host. Round-tripped untouched.
    #[serde(default = "empty_view")]
    view: Value,
    #[serde(skip)]
    buffer: StrokeBuffer,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            view: empty_view(),
            buffer: StrokeBuffer::new(),
        }
    }

    pub fn paths(&self) -> &[Stroke] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, id: &StrokeId) -> Option<&Stroke> {
        self.paths.iter().find(|s| s.id() == id)
    }

    pub fn view(&self) -> &Value {
        &self.view
    }

    pub fn set_view(&mut self, view: Value) {
        self.view = view;
    }

    /// Bounding box of every committed stroke, or `None` for an empty board.
    pub fn bounds(&self) -> Option<Rect> {
        self.paths
            .iter()
            .map(Stroke::bounds)
            .reduce(|acc, rect| acc.union(rect))
    }

    /// Append an already-built stroke on top of the others.
    pub fn push(&mut self, stroke: Stroke) {
        self.paths.push(stroke);
    }

    /// Begin buffering a new stroke at `sample`. Ignored while one is in progress.
    pub fn begin_stroke(&mut self, sample: RawSample, color: StrokeColor, width: f64) {
        if self.buffer.is_drawing() {
            log::debug!("Stroke already in progress, ignoring begin");
            return;
        }
        self.buffer.begin(sample, color, width);
    }

    /// Feed a sample to the in-progress stroke.
    pub fn extend_stroke(&mut self, sample: RawSample, params: &StrokeParams) -> Result<(), SampleRejection> {
        self.buffer.extend(sample, params)
    }

    /// Finish the in-progress stroke.
    ///
    /// Appends it and returns its id when it has at least two smoothed points.
    pub fn commit_stroke(&mut self) -> Option<StrokeId> {
        let stroke = self.buffer.commit()?;
        let id = stroke.id().clone();
        log::debug!("Committed stroke {} with {} points", id, stroke.points().len());
        self.paths.push(stroke);
        Some(id)
    }

    /// Drop the in-progress stroke.
    pub fn discard_stroke(&mut self) {
        self.buffer.discard();
    }

    /// The stroke being drawn, if any.
    pub fn live_stroke(&self) -> Option<&StrokeBuffer> {
        self.buffer.is_drawing().then_some(&self.buffer)
    }

    /// Remove every stroke that passes within its erase radius of `point`.
    ///
    /// Returns whether anything was removed.
    pub fn erase_at(&mut self, point: Point, tolerance: EraseTolerance) -> bool {
        let before = self.paths.len();
        self.paths
            .retain(|stroke| !stroke.hit_test(point, tolerance.for_stroke(stroke)));
        let removed = before - self.paths.len();
        if removed > 0 {
            log::debug!("Erased {} stroke(s) at ({:.1}, {:.1})", removed, point.x, point.y);
        }
        removed > 0
    }

    /// Remove all strokes and reset the view.
    pub fn clear(&mut self) {
        self.paths.clear();
        self.view = empty_view();
        self.buffer.discard();
    }

    pub(crate) fn replace_paths(&mut self, paths: Vec<Stroke>) {
        self.paths = paths;
    }

    /// Serialize the persisted part of the board.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a board.
    ///
    /// Strokes that violate the stroke invariants (no points, non-positive
    /// width) are dropped with a warning rather than failing the whole load.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut board: Self = serde_json::from_str(json)?;
        let before = board.paths.len();
        board.paths.retain(Stroke::is_valid);
        if board.paths.len() != before {
            log::warn!("Dropped {} malformed stroke(s) while loading board", before - board.paths.len());
        }
        if board.view.is_null() {
            board.view = empty_view();
        }
        Ok(board)
    }
}
