//! SketchBoard Core Library
//!
//! Platform-agnostic stroke model, smoothing, history, input handling and
//! persistence for the SketchBoard freehand canvas.

pub mod board;
pub mod buffer;
pub mod config;
pub mod events;
pub mod geometry;
pub mod history;
pub mod input;
pub mod persistence;
pub mod scheduler;
pub mod session;
pub mod shortcuts;
pub mod storage;
pub mod stroke;
pub mod tools;
pub mod viewport;

pub use board::Board;
pub use buffer::{SampleRejection, StrokeBuffer, StrokeParams};
pub use config::{ConfigError, EngineConfig};
pub use events::{EventBus, ListenerId, SessionEvent};
pub use history::{History, Snapshot, snapshot};
pub use input::{GestureState, InputController, InputOutcome, PointerEvent, PointerId};
pub use persistence::{LoadSource, PersistError, PersistenceBridge, RemoteSaver, SaveOutcome};
pub use scheduler::{FrameRequester, FrameState, RenderScheduler};
pub use session::Session;
pub use shortcuts::{Command, KeyPress, Modifiers, ShortcutRegistry};
pub use stroke::{EraseTolerance, RawSample, Stroke, StrokeColor, StrokeId};
pub use tools::{PenSettings, ToolKind, ToolManager};
pub use viewport::Viewport;

// Re-export kurbo so hosts can build points without a direct dependency.
pub use kurbo;
