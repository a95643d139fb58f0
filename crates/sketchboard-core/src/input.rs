//! Pointer gesture handling.
//!
//! A gesture runs from pointer-down to pointer-up (or cancel) for a single
//! pointer. While it is active, events from other pointers are ignored.

use crate::board::Board;
use crate::config::EngineConfig;
use crate::history::History;
use crate::stroke::RawSample;
use crate::tools::{PenSettings, ToolKind};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Host-assigned pointer identifier.
pub type PointerId = u32;

/// Pointer events in canvas coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        pointer_id: PointerId,
        position: Point,
        timestamp_ms: Option<f64>,
    },
    Move {
        pointer_id: PointerId,
        position: Point,
        timestamp_ms: Option<f64>,
    },
    Up {
        pointer_id: PointerId,
        position: Point,
    },
    /// Pointer capture was lost or the platform cancelled the gesture.
    Cancel { pointer_id: PointerId },
}

impl PointerEvent {
    pub fn pointer_id(&self) -> PointerId {
        match self {
            PointerEvent::Down { pointer_id, .. }
            | PointerEvent::Move { pointer_id, .. }
            | PointerEvent::Up { pointer_id, .. }
            | PointerEvent::Cancel { pointer_id } => *pointer_id,
        }
    }
}

/// Where the controller is in a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Pressed {
        pointer_id: PointerId,
        /// Tool captured at pointer-down.
        tool: ToolKind,
    },
}

/// What an event did, so the owner can repaint, autosave and notify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputOutcome {
    pub repaint: bool,
    pub autosave: bool,
    pub history_changed: bool,
    pub gesture_ended: bool,
}

impl InputOutcome {
    fn ignored() -> Self {
        Self::default()
    }
}

/// Mutable state a gesture operates on.
pub struct GestureContext<'a> {
    pub board: &'a mut Board,
    pub history: &'a mut History,
    pub pen: &'a PenSettings,
    pub config: &'a EngineConfig,
}

/// Turns pointer events into board mutations.
#[derive(Debug, Clone, Default)]
pub struct InputController {
    state: GestureState,
    /// Last known pointer position, tracked even when idle.
    pointer_position: Point,
    /// Whether the current eraser gesture removed anything.
    erased: bool,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_gesture_active(&self) -> bool {
        matches!(self.state, GestureState::Pressed { .. })
    }

    pub fn pointer_position(&self) -> Point {
        self.pointer_position
    }

    /// Process one event with `tool` as the currently selected tool.
    pub fn handle(&mut self, event: PointerEvent, tool: ToolKind, cx: GestureContext<'_>) -> InputOutcome {
        match event {
            PointerEvent::Down {
                pointer_id,
                position,
                timestamp_ms,
            } => self.pointer_down(pointer_id, sample(position, timestamp_ms), tool, cx),
            PointerEvent::Move {
                pointer_id,
                position,
                timestamp_ms,
            } => self.pointer_move(pointer_id, sample(position, timestamp_ms), cx),
            PointerEvent::Up { pointer_id, position } => self.pointer_up(pointer_id, position, cx),
            PointerEvent::Cancel { pointer_id } => self.pointer_cancel(pointer_id, cx),
        }
    }

    fn owns(&self, id: PointerId) -> Option<ToolKind> {
        match self.state {
            GestureState::Pressed { pointer_id, tool } if pointer_id == id => Some(tool),
            _ => None,
        }
    }

    fn pointer_down(
        &mut self,
        pointer_id: PointerId,
        sample: RawSample,
        tool: ToolKind,
        cx: GestureContext<'_>,
    ) -> InputOutcome {
        self.pointer_position = sample.position;
        if self.is_gesture_active() {
            log::debug!("Ignoring pointer {} while another gesture is active", pointer_id);
            return InputOutcome::ignored();
        }

        self.state = GestureState::Pressed { pointer_id, tool };
        self.erased = false;
        cx.history.push_undo(cx.board);

        let mut outcome = InputOutcome {
            history_changed: true,
            ..InputOutcome::default()
        };
        match tool {
            ToolKind::Pencil => {
                cx.board
                    .begin_stroke(sample, cx.pen.color.clone(), cx.pen.width);
                outcome.repaint = true;
            }
            ToolKind::Eraser => {
                if cx.board.erase_at(sample.position, cx.config.erase_tolerance()) {
                    self.erased = true;
                    outcome.repaint = true;
                    outcome.autosave = true;
                }
            }
        }
        outcome
    }

    fn pointer_move(&mut self, pointer_id: PointerId, sample: RawSample, cx: GestureContext<'_>) -> InputOutcome {
        if !self.is_gesture_active() {
            self.pointer_position = sample.position;
            return InputOutcome::ignored();
        }
        let Some(tool) = self.owns(pointer_id) else {
            return InputOutcome::ignored();
        };
        self.pointer_position = sample.position;

        match tool {
            ToolKind::Pencil => {
                if let Err(reason) = cx.board.extend_stroke(sample, &cx.config.stroke_params()) {
                    log::trace!("Sample rejected: {:?}", reason);
                }
                InputOutcome {
                    repaint: true,
                    autosave: true,
                    ..InputOutcome::default()
                }
            }
            ToolKind::Eraser => {
                if cx.board.erase_at(sample.position, cx.config.erase_tolerance()) {
                    self.erased = true;
                    InputOutcome {
                        repaint: true,
                        autosave: true,
                        ..InputOutcome::default()
                    }
                } else {
                    InputOutcome::ignored()
                }
            }
        }
    }

    fn pointer_up(&mut self, pointer_id: PointerId, position: Point, cx: GestureContext<'_>) -> InputOutcome {
        let Some(tool) = self.owns(pointer_id) else {
            return InputOutcome::ignored();
        };
        self.pointer_position = position;
        self.state = GestureState::Idle;

        let mut outcome = InputOutcome {
            repaint: true,
            gesture_ended: true,
            ..InputOutcome::default()
        };
        let changed = match tool {
            ToolKind::Pencil => cx.board.commit_stroke().is_some(),
            ToolKind::Eraser => self.erased,
        };
        if changed {
            outcome.autosave = true;
        } else {
            outcome.history_changed = cx.history.discard_if_unchanged(cx.board);
        }
        outcome
    }

    fn pointer_cancel(&mut self, pointer_id: PointerId, cx: GestureContext<'_>) -> InputOutcome {
        let Some(tool) = self.owns(pointer_id) else {
            return InputOutcome::ignored();
        };
        self.state = GestureState::Idle;
        log::debug!("Gesture cancelled for pointer {}", pointer_id);

        if tool == ToolKind::Pencil {
            cx.board.discard_stroke();
        }
        let history_changed = cx.history.discard_if_unchanged(cx.board);
        InputOutcome {
            repaint: true,
            autosave: self.erased,
            history_changed,
            gesture_ended: true,
        }
    }
}

fn sample(position: Point, timestamp_ms: Option<f64>) -> RawSample {
    RawSample { position, timestamp_ms }
}
