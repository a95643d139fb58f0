//! Notifications for host UI bound to session state.

use crate::tools::ToolKind;

/// Something the host UI may want to reflect.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ToolChanged(ToolKind),
    PenWidthChanged(f64),
    PenColorChanged(String),
    HistoryChanged { can_undo: bool, can_redo: bool },
    /// The board was cleared by a new-board action.
    BoardReset,
    /// A board was loaded from bootstrap data or local storage.
    BoardLoaded { strokes: usize },
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&SessionEvent)>;

/// Synchronous fan-out of [`SessionEvent`]s to registered listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: SessionEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_reaches_all_listeners() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for _ in 0..2 {
            let seen = seen.clone();
            bus.subscribe(move |event| seen.borrow_mut().push(event.clone()));
        }

        bus.emit(SessionEvent::ToolChanged(ToolKind::Eraser));
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let id = {
            let count = count.clone();
            bus.subscribe(move |_| *count.borrow_mut() += 1)
        };

        bus.emit(SessionEvent::BoardReset);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(SessionEvent::BoardReset);
        assert_eq!(*count.borrow(), 1);
        assert!(bus.is_empty());
    }
}
