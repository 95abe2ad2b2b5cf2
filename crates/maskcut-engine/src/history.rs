//! Linear undo/redo history of [`Snapshot`]s.
//!
//! The stack is never empty and the cursor always indexes a valid
//! snapshot. Pushing after an undo discards the redo tail.

use crate::types::Snapshot;

#[derive(Debug, Clone)]
pub struct History {
    stack: Vec<Snapshot>,
    cursor: usize,
}

impl History {
    /// History holding a single empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Snapshot::default())
    }

    /// History holding a single `snapshot`.
    #[must_use]
    pub fn starting_at(snapshot: Snapshot) -> Self {
        Self {
            stack: vec![snapshot],
            cursor: 0,
        }
    }

    /// The snapshot under the cursor.
    #[must_use]
    pub fn current(&self) -> &Snapshot {
        &self.stack[self.cursor]
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of snapshots on the stack (including redo entries).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stack.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub const fn can_redo(&self) -> bool {
        self.cursor + 1 < self.stack.len()
    }

    /// Drop everything after the cursor, append `snapshot`, and move onto it.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.stack.truncate(self.cursor + 1);
        self.stack.push(snapshot);
        self.cursor = self.stack.len() - 1;
    }

    /// Step back one snapshot. Returns `false` at the start of history.
    pub const fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Step forward one snapshot. Returns `false` at the end of history.
    pub const fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Replace the whole stack with one empty snapshot.
    pub fn reset(&mut self) {
        self.reset_to(Snapshot::default());
    }

    /// Replace the whole stack with `snapshot` as its only entry.
    pub fn reset_to(&mut self, snapshot: Snapshot) {
        self.stack.clear();
        self.stack.push(snapshot);
        self.cursor = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
