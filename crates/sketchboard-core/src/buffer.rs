//! The stroke currently being drawn.

use crate::geometry::{self, distance};
use crate::stroke::{RawSample, Stroke, StrokeColor};
use kurbo::Point;

/// Sampling and smoothing parameters for live strokes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeParams {
    pub min_distance: f64,
    pub max_distance: f64,
    pub smoothing_factor: f64,
    pub fast_smoothing_factor: f64,
    pub fast_motion_threshold: f64,
}

impl Default for StrokeParams {
    fn default() -> Self {
        Self {
            min_distance: 1.5,
            max_distance: 50.0,
            smoothing_factor: 0.4,
            fast_smoothing_factor: 0.2,
            fast_motion_threshold: 20.0,
        }
    }
}

/// Why a raw sample was not appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRejection {
    /// No stroke is in progress.
    NotDrawing,
    /// Too close to the previous sample to add detail.
    TooClose,
    /// Implausibly far from the previous sample.
    TooFar,
    /// NaN or infinite coordinates.
    NonFinite,
}

/// Accumulates raw and smoothed samples between pointer-down and pointer-up.
///
/// Color and width are captured when the stroke begins, so pen changes made
/// mid-gesture only affect the next stroke.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeBuffer {
    raw: Vec<RawSample>,
    smoothed: Vec<Point>,
    color: StrokeColor,
    width: f64,
    drawing: bool,
}

impl StrokeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new stroke at `sample`, dropping anything previously buffered.
    pub fn begin(&mut self, sample: RawSample, color: StrokeColor, width: f64) {
        self.raw.clear();
        self.smoothed.clear();
        self.raw.push(sample);
        self.smoothed.push(sample.position);
        self.color = color;
        self.width = width;
        self.drawing = true;
    }

    /// Offer a new raw sample.
    ///
    /// Accepted samples are appended to the raw list and an exponentially
    /// smoothed point is appended to the smoothed list.
    pub fn extend(&mut self, sample: RawSample, params: &StrokeParams) -> Result<(), SampleRejection> {
        if !self.drawing {
            return Err(SampleRejection::NotDrawing);
        }
        let (Some(last_raw), Some(&last_smoothed)) = (self.raw.last(), self.smoothed.last()) else {
            return Err(SampleRejection::NotDrawing);
        };

        let gap = distance(last_raw.position, sample.position);
        if !gap.is_finite() {
            log::debug!("Dropping non-finite sample {:?}", sample.position);
            return Err(SampleRejection::NonFinite);
        }
        if gap < params.min_distance {
            return Err(SampleRejection::TooClose);
        }
        if gap > params.max_distance {
            log::trace!("Dropping sample {:.1}px from the previous one", gap);
            return Err(SampleRejection::TooFar);
        }

        let factor = geometry::smoothing_factor(
            last_smoothed,
            sample.position,
            params.smoothing_factor,
            params.fast_smoothing_factor,
            params.fast_motion_threshold,
        );
        self.raw.push(sample);
        self.smoothed
            .push(geometry::exponential_smooth(last_smoothed, sample.position, factor));
        Ok(())
    }

    /// Finish the stroke.
    ///
    /// Produces a stroke from the smoothed points when there are at least two
    /// of them. The buffer is cleared either way.
    pub fn commit(&mut self) -> Option<Stroke> {
        if !self.drawing {
            return None;
        }
        self.drawing = false;
        self.raw.clear();
        let points = std::mem::take(&mut self.smoothed);
        if points.len() < 2 {
            return None;
        }
        Stroke::from_points(points, self.color.clone(), self.width)
    }

    /// Abandon the stroke without producing anything.
    pub fn discard(&mut self) {
        self.drawing = false;
        self.raw.clear();
        self.smoothed.clear();
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn raw_samples(&self) -> &[RawSample] {
        &self.raw
    }

    pub fn smoothed_points(&self) -> &[Point] {
        &self.smoothed
    }

    pub fn color(&self) -> &StrokeColor {
        &self.color
    }

    pub fn width(&self) -> f64 {
        self.width
    }
}
