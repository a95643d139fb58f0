//! Tool selection and pen settings.

use crate::stroke::StrokeColor;
use serde::{Deserialize, Serialize};

/// Width used when the host passes something that is not a positive number.
pub const FALLBACK_PEN_WIDTH: f64 = 2.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Pencil,
    Eraser,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Pencil => "pencil",
            ToolKind::Eraser => "eraser",
        }
    }
}

/// Color and width applied to new strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenSettings {
    pub width: f64,
    pub color: StrokeColor,
}

impl Default for PenSettings {
    fn default() -> Self {
        Self {
            width: 3.0,
            color: StrokeColor::default(),
        }
    }
}

/// Tracks the selected tool and pen.
///
/// A tool change requested while a gesture is in progress is parked and
/// applied once the gesture ends, so a stroke never switches tools halfway.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    current_tool: ToolKind,
    pending_tool: Option<ToolKind>,
    pen: PenSettings,
}

impl ToolManager {
    pub fn new(pen: PenSettings) -> Self {
        Self {
            pen,
            ..Self::default()
        }
    }

    pub fn current_tool(&self) -> ToolKind {
        self.current_tool
    }

    /// Tool that will become current when the active gesture ends.
    pub fn pending_tool(&self) -> Option<ToolKind> {
        self.pending_tool
    }

    /// Select `tool`. Returns true if the current tool changed immediately.
    pub fn set_tool(&mut self, tool: ToolKind, gesture_active: bool) -> bool {
        if gesture_active {
            self.pending_tool = (tool != self.current_tool).then_some(tool);
            return false;
        }
        self.pending_tool = None;
        let changed = self.current_tool != tool;
        self.current_tool = tool;
        changed
    }

    /// Apply a parked tool change. Returns the new tool if one was applied.
    pub fn apply_pending(&mut self) -> Option<ToolKind> {
        let tool = self.pending_tool.take()?;
        self.current_tool = tool;
        Some(tool)
    }

    pub fn pen(&self) -> &PenSettings {
        &self.pen
    }

    /// Set the pen width. Non-finite or non-positive values fall back to
    /// [`FALLBACK_PEN_WIDTH`]. Returns the width actually applied.
    pub fn set_pen_width(&mut self, width: f64) -> f64 {
        let width = if width.is_finite() && width > 0.0 {
            width
        } else {
            FALLBACK_PEN_WIDTH
        };
        self.pen.width = width;
        width
    }

    /// Set the pen color. Blank values are ignored.
    pub fn set_pen_color(&mut self, color: &str) -> bool {
        let color = color.trim();
        if color.is_empty() {
            return false;
        }
        self.pen.color = StrokeColor::new(color);
        true
    }
}
