//! Snapshot undo/redo over the diagram model.
//!
//! Entries before the cursor are undo targets. After an undo or redo,
//! `entries[cursor]` holds the live diagram and anything past it is the redo
//! branch, dropped by the next save.

use crate::model::Diagram;
use log::trace;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Diagram>,
    cursor: usize,
    depth: usize,
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            depth: depth.max(1),
        }
    }

    /// Records `diagram` as a save point, discarding any redo branch. The
    /// oldest entry is evicted once `depth` save points are held.
    pub fn save_state(&mut self, diagram: &Diagram) {
        self.entries.truncate(self.cursor);
        self.entries.push_back(diagram.clone());
        if self.entries.len() > self.depth {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len();
        trace!(entries = self.entries.len(); "history saved");
    }

    /// Steps back one save point. The live diagram is kept as the redo tip
    /// so that [`History::redo`] can return to it.
    pub fn undo(&mut self, current: &Diagram) -> Option<Diagram> {
        if self.cursor == 0 {
            return None;
        }
        if self.cursor == self.entries.len() {
            self.entries.push_back(current.clone());
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).cloned()
    }

    pub fn redo(&mut self) -> Option<Diagram> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Save points still reachable by undo.
    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(50)
    }
}
