//! Snapshot-based undo and redo.

use crate::board::Board;
use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::stroke::Stroke;
use std::collections::VecDeque;

/// A deep copy of the committed stroke list.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    paths: Vec<Stroke>,
}

impl Snapshot {
    fn of(board: &Board) -> Self {
        Self {
            paths: board.paths().to_vec(),
        }
    }

    pub fn paths(&self) -> &[Stroke] {
        &self.paths
    }
}

/// Copy the board's strokes. Later edits to the board do not affect the copy.
pub fn snapshot(board: &Board) -> Snapshot {
    Snapshot::of(board)
}

/// Bounded undo stack plus an unbounded redo stack.
///
/// Every mutating action pushes the pre-mutation state with [`History::push_undo`],
/// which also invalidates redo. Once the undo stack exceeds its limit the
/// oldest snapshot is evicted.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    limit: usize,
    /// Snapshot pushed out by the latest `push_undo`, restored if that push is discarded.
    evicted: Option<Snapshot>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
            evicted: None,
        }
    }

    /// Record the board's current strokes before mutating them.
    pub fn push_undo(&mut self, board: &Board) {
        self.undo_stack.push_back(Snapshot::of(board));
        self.redo_stack.clear();

        self.evicted = None;
        while self.undo_stack.len() > self.limit {
            self.evicted = self.undo_stack.pop_front();
        }
    }

    /// Restore the most recent snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self, board: &mut Board) -> bool {
        let Some(snapshot) = self.undo_stack.pop_back() else {
            return false;
        };
        self.evicted = None;
        self.redo_stack.push(Snapshot::of(board));
        board.replace_paths(snapshot.paths);
        true
    }

    /// Re-apply the most recently undone state. Returns false when there is nothing to redo.
    pub fn redo(&mut self, board: &mut Board) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        self.evicted = None;
        self.undo_stack.push_back(Snapshot::of(board));
        board.replace_paths(snapshot.paths);
        true
    }

    /// Pop the newest undo snapshot if it matches the board exactly.
    ///
    /// Used when a gesture that recorded a snapshot ends without changing anything.
    /// A snapshot evicted by that push goes back to the bottom of the stack.
    pub fn discard_if_unchanged(&mut self, board: &Board) -> bool {
        if self.undo_stack.back().is_some_and(|top| top.paths == board.paths()) {
            self.undo_stack.pop_back();
            if let Some(evicted) = self.evicted.take() {
                self.undo_stack.push_front(evicted);
            }
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Forget all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.evicted = None;
    }
}
