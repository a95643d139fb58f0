//! The drawing session: one board, its history, tools and input state.

use crate::board::Board;
use crate::buffer::StrokeBuffer;
use crate::config::EngineConfig;
use crate::events::{EventBus, ListenerId, SessionEvent};
use crate::history::History;
use crate::input::{GestureContext, InputController, InputOutcome, PointerEvent};
use crate::scheduler::{FrameRequester, RenderScheduler};
use crate::shortcuts::{Command, KeyPress, ShortcutRegistry};
use crate::tools::{PenSettings, ToolKind, ToolManager};
use crate::viewport::Viewport;
use kurbo::Point;

/// Owns all editing state for one canvas.
///
/// The session is synchronous. Persistence is the host's job: after feeding
/// events in, the host checks [`Session::take_autosave_request`] and hands the
/// board to its autosave manager.
pub struct Session {
    board: Board,
    history: History,
    tools: ToolManager,
    input: InputController,
    viewport: Viewport,
    scheduler: RenderScheduler,
    events: EventBus,
    config: EngineConfig,
    autosave_requested: bool,
}

impl Session {
    pub fn new(config: EngineConfig, requester: Box<dyn FrameRequester>) -> Self {
        let pen = PenSettings {
            width: config.default_pen_width,
            color: config.default_pen_color.as_str().into(),
        };
        Self {
            board: Board::new(),
            history: History::new(config.history_limit),
            tools: ToolManager::new(pen),
            input: InputController::new(),
            viewport: Viewport::default(),
            scheduler: RenderScheduler::new(requester),
            events: EventBus::new(),
            config,
            autosave_requested: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    pub fn tool(&self) -> ToolKind {
        self.tools.current_tool()
    }

    pub fn pen(&self) -> &PenSettings {
        self.tools.pen()
    }

    pub fn is_gesture_active(&self) -> bool {
        self.input.is_gesture_active()
    }

    pub fn pointer_position(&self) -> Point {
        self.input.pointer_position()
    }

    /// The stroke being drawn, if it has enough points to show.
    pub fn live_stroke(&self) -> Option<&StrokeBuffer> {
        self.board
            .live_stroke()
            .filter(|buffer| buffer.smoothed_points().len() > 1)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Feed a pointer event through the gesture state machine.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> InputOutcome {
        let tool = self.tools.current_tool();
        let cx = GestureContext {
            board: &mut self.board,
            history: &mut self.history,
            pen: self.tools.pen(),
            config: &self.config,
        };
        let outcome = self.input.handle(event, tool, cx);

        if outcome.repaint {
            self.scheduler.request_render();
        }
        if outcome.autosave {
            self.autosave_requested = true;
        }
        if outcome.history_changed {
            self.emit_history();
        }
        if outcome.gesture_ended {
            if let Some(tool) = self.tools.apply_pending() {
                self.events.emit(SessionEvent::ToolChanged(tool));
            }
        }
        outcome
    }

    pub fn pointer_down(&mut self, pointer_id: u32, position: Point) -> InputOutcome {
        self.handle_pointer(PointerEvent::Down {
            pointer_id,
            position,
            timestamp_ms: None,
        })
    }

    pub fn pointer_move(&mut self, pointer_id: u32, position: Point) -> InputOutcome {
        self.handle_pointer(PointerEvent::Move {
            pointer_id,
            position,
            timestamp_ms: None,
        })
    }

    pub fn pointer_up(&mut self, pointer_id: u32, position: Point) -> InputOutcome {
        self.handle_pointer(PointerEvent::Up { pointer_id, position })
    }

    /// Select a tool. During a gesture the change waits until the gesture ends.
    pub fn set_tool(&mut self, tool: ToolKind) {
        let gesture_active = self.input.is_gesture_active();
        if self.tools.set_tool(tool, gesture_active) {
            log::debug!("Tool changed to {}", tool.name());
            self.events.emit(SessionEvent::ToolChanged(tool));
        } else if gesture_active {
            log::debug!("Deferring switch to {} until the gesture ends", tool.name());
        }
    }

    /// Set the width for subsequent strokes.
    pub fn set_pen_width(&mut self, width: f64) {
        let applied = self.tools.set_pen_width(width);
        self.events.emit(SessionEvent::PenWidthChanged(applied));
    }

    /// Set the color for subsequent strokes.
    pub fn set_pen_color(&mut self, color: &str) {
        if self.tools.set_pen_color(color) {
            let color = self.tools.pen().color.as_str().to_string();
            self.events.emit(SessionEvent::PenColorChanged(color));
        }
    }

    /// Step back one action. Ignored while a gesture is in progress.
    pub fn undo(&mut self) -> bool {
        if self.input.is_gesture_active() {
            log::debug!("Ignoring undo during an active gesture");
            return false;
        }
        let undone = self.history.undo(&mut self.board);
        if undone {
            self.after_history_step();
        }
        undone
    }

    /// Re-apply one undone action. Ignored while a gesture is in progress.
    pub fn redo(&mut self) -> bool {
        if self.input.is_gesture_active() {
            log::debug!("Ignoring redo during an active gesture");
            return false;
        }
        let redone = self.history.redo(&mut self.board);
        if redone {
            self.after_history_step();
        }
        redone
    }

    fn after_history_step(&mut self) {
        self.scheduler.request_render();
        self.autosave_requested = true;
        self.emit_history();
    }

    /// Abandon the gesture in progress, if any.
    pub fn cancel_gesture(&mut self) {
        if let crate::input::GestureState::Pressed { pointer_id, .. } = self.input.state() {
            self.handle_pointer(PointerEvent::Cancel { pointer_id });
        }
    }

    /// Run a command produced by the shortcut registry or host UI.
    pub fn execute(&mut self, command: Command) {
        match command {
            Command::SelectTool(tool) => self.set_tool(tool),
            Command::Undo => {
                self.undo();
            }
            Command::Redo => {
                self.redo();
            }
            Command::CancelGesture => self.cancel_gesture(),
        }
    }

    /// Resolve and run a keyboard shortcut. Returns the command that ran.
    pub fn handle_key(&mut self, press: &KeyPress) -> Option<Command> {
        let command = ShortcutRegistry::resolve(press)?;
        self.execute(command);
        Some(command)
    }

    /// Start over with an empty board and no history.
    ///
    /// Confirmation is the host's concern and must happen before calling this.
    pub fn new_board(&mut self) {
        self.cancel_gesture();
        self.board.clear();
        self.history.clear();
        self.autosave_requested = true;
        self.scheduler.request_render();
        self.events.emit(SessionEvent::BoardReset);
        self.emit_history();
    }

    /// Replace the board wholesale, e.g. after loading persisted state.
    pub fn load_board(&mut self, board: Board) {
        self.cancel_gesture();
        self.board = board;
        self.history.clear();
        self.scheduler.request_render();
        self.events.emit(SessionEvent::BoardLoaded {
            strokes: self.board.len(),
        });
        self.emit_history();
    }

    /// The host's canvas changed size or moved to a display with another pixel ratio.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        self.viewport.resize(width, height, device_pixel_ratio);
        self.scheduler.request_render();
    }

    pub fn request_render(&mut self) {
        self.scheduler.request_render();
    }

    /// See [`RenderScheduler::begin_frame`].
    pub fn begin_frame(&mut self) -> bool {
        self.scheduler.begin_frame()
    }

    /// See [`RenderScheduler::finish_frame`].
    pub fn finish_frame(&mut self) {
        self.scheduler.finish_frame();
    }

    /// Returns true once per batch of changes that should be autosaved.
    pub fn take_autosave_request(&mut self) -> bool {
        std::mem::take(&mut self.autosave_requested)
    }

    fn emit_history(&mut self) {
        self.events.emit(SessionEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("strokes", &self.board.len())
            .field("tool", &self.tools.current_tool())
            .field("input", &self.input.state())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcuts::Modifiers;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn session() -> (Session, Rc<Cell<u32>>) {
        let frames = Rc::new(Cell::new(0));
        let counter = frames.clone();
        let session = Session::new(
            EngineConfig::default(),
            Box::new(move || counter.set(counter.get() + 1)),
        );
        (session, frames)
    }

    fn draw_line(session: &mut Session, y: f64) {
        session.pointer_down(1, Point::new(0.0, y));
        session.pointer_move(1, Point::new(10.0, y));
        session.pointer_move(1, Point::new(20.0, y));
        session.pointer_up(1, Point::new(20.0, y));
    }

    fn paint(session: &mut Session) {
        if session.begin_frame() {
            session.finish_frame();
        }
    }

    #[test]
    fn test_draw_undo_redo() {
        let (mut session, _) = session();
        draw_line(&mut session, 0.0);
        assert_eq!(session.board().len(), 1);
        let drawn = session.board().paths().to_vec();

        assert!(session.undo());
        assert!(session.board().is_empty());
        assert!(session.redo());
        assert_eq!(session.board().paths(), drawn.as_slice());
        assert!(session.take_autosave_request());
        assert!(!session.take_autosave_request());
    }

    #[test]
    fn test_eraser_removes_only_nearby_strokes() {
        let (mut session, _) = session();
        session.set_pen_width(4.0);
        session.pointer_down(1, Point::new(0.0, 0.0));
        session.pointer_move(1, Point::new(10.0, 0.0));
        session.pointer_up(1, Point::new(10.0, 0.0));
        assert_eq!(session.board().len(), 1);

        session.set_tool(ToolKind::Eraser);
        session.pointer_down(1, Point::new(5.0, 20.0));
        session.pointer_up(1, Point::new(5.0, 20.0));
        assert_eq!(session.board().len(), 1);

        session.pointer_down(1, Point::new(5.0, 0.0));
        session.pointer_up(1, Point::new(5.0, 0.0));
        assert!(session.board().is_empty());
    }

    #[test]
    fn test_tool_switch_mid_gesture_is_deferred() {
        let (mut session, _) = session();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        session.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        session.pointer_down(1, Point::new(0.0, 0.0));
        session.set_tool(ToolKind::Eraser);
        assert_eq!(session.tool(), ToolKind::Pencil);
        session.pointer_move(1, Point::new(10.0, 0.0));
        session.pointer_up(1, Point::new(10.0, 0.0));

        assert_eq!(session.tool(), ToolKind::Eraser);
        assert_eq!(session.board().len(), 1);
        assert!(events
            .borrow()
            .contains(&SessionEvent::ToolChanged(ToolKind::Eraser)));
    }

    #[test]
    fn test_pen_changes_apply_to_next_stroke() {
        let (mut session, _) = session();
        session.pointer_down(1, Point::new(0.0, 0.0));
        session.set_pen_color("#ff0000");
        session.pointer_move(1, Point::new(10.0, 0.0));
        session.pointer_up(1, Point::new(10.0, 0.0));
        draw_line(&mut session, 30.0);

        assert_eq!(session.board().paths()[0].color().as_str(), "#111827");
        assert_eq!(session.board().paths()[1].color().as_str(), "#ff0000");
    }

    #[test]
    fn test_keyboard_shortcuts() {
        let (mut session, _) = session();
        draw_line(&mut session, 0.0);

        assert_eq!(session.handle_key(&KeyPress::with_command("z")), Some(Command::Undo));
        assert!(session.board().is_empty());
        let redo = KeyPress::new(
            "z",
            Modifiers {
                meta: true,
                shift: true,
                ..Modifiers::default()
            },
        );
        assert_eq!(session.handle_key(&redo), Some(Command::Redo));
        assert_eq!(session.board().len(), 1);

        session.handle_key(&KeyPress::plain("e"));
        assert_eq!(session.tool(), ToolKind::Eraser);
        session.handle_key(&KeyPress::plain("p"));
        assert_eq!(session.tool(), ToolKind::Pencil);
    }

    #[test]
    fn test_escape_cancels_stroke() {
        let (mut session, _) = session();
        session.pointer_down(1, Point::new(0.0, 0.0));
        session.pointer_move(1, Point::new(10.0, 0.0));
        assert!(session.live_stroke().is_some());

        session.handle_key(&KeyPress::plain("Escape"));
        assert!(!session.is_gesture_active());
        assert!(session.live_stroke().is_none());
        session.pointer_up(1, Point::new(10.0, 0.0));
        assert!(session.board().is_empty());
    }

    #[test]
    fn test_undo_ignored_during_gesture() {
        let (mut session, _) = session();
        draw_line(&mut session, 0.0);
        session.pointer_down(1, Point::new(0.0, 50.0));
        assert!(!session.undo());
        assert_eq!(session.board().len(), 1);
    }

    #[test]
    fn test_new_board_resets_everything() {
        let (mut session, _) = session();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        session.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        draw_line(&mut session, 0.0);
        draw_line(&mut session, 20.0);
        session.undo();
        session.take_autosave_request();

        session.new_board();
        assert!(session.board().is_empty());
        assert!(!session.history().can_undo());
        assert!(!session.history().can_redo());
        assert!(session.take_autosave_request());
        assert!(events.borrow().contains(&SessionEvent::BoardReset));
    }

    #[test]
    fn test_drawing_coalesces_repaints() {
        let (mut session, frames) = session();
        session.pointer_down(1, Point::new(0.0, 0.0));
        for i in 1..6 {
            session.pointer_move(1, Point::new(i as f64 * 5.0, 0.0));
        }
        assert_eq!(frames.get(), 1);

        paint(&mut session);
        session.pointer_up(1, Point::new(25.0, 0.0));
        assert_eq!(frames.get(), 2);
    }

    #[test]
    fn test_resize_requests_render() {
        let (mut session, frames) = session();
        session.resize(800.0, 600.0, 2.0);
        assert_eq!(frames.get(), 1);
        assert_eq!(session.viewport().backing_size(), (1600, 1200));
    }

    #[test]
    fn test_load_board_clears_history() {
        let (mut session, _) = session();
        draw_line(&mut session, 0.0);
        let snapshot = session.board().clone();
        draw_line(&mut session, 20.0);

        session.load_board(snapshot);
        assert_eq!(session.board().len(), 1);
        assert!(!session.history().can_undo());
    }
}
