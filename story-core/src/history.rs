//! Undo/redo history of whole-scene snapshots.

use crate::Scene;

/// Two stacks of scene snapshots.
///
/// `past` is ordered oldest to newest. Pushing a new snapshot clears
/// `future`; there is no redo across a new branch of edits.
#[derive(Debug, Clone, Default)]
pub struct History {
    past: Vec<Scene>,
    future: Vec<Scene>,
    limit: Option<usize>,
}

impl History {
    /// Create an empty history, optionally capping the number of undo steps.
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            limit,
        }
    }

    /// Record the scene as it was before a committed mutation.
    pub fn push(&mut self, before: Scene) {
        self.past.push(before);
        self.future.clear();
        if let Some(limit) = self.limit {
            if self.past.len() > limit {
                let excess = self.past.len() - limit;
                self.past.drain(..excess);
            }
        }
    }

    /// Step back: returns the scene to restore, keeping `current` for redo.
    pub fn undo(&mut self, current: Scene) -> Option<Scene> {
        let previous = self.past.pop()?;
        self.future.push(current);
        Some(previous)
    }

    /// Step forward: returns the scene to restore, keeping `current` for undo.
    pub fn redo(&mut self, current: Scene) -> Option<Scene> {
        let next = self.future.pop()?;
        self.past.push(current);
        Some(next)
    }

    /// Snapshots available to undo, oldest first.
    #[must_use]
    pub fn past(&self) -> &[Scene] {
        &self.past
    }

    /// Snapshots available to redo, most recently undone last.
    #[must_use]
    pub fn future(&self) -> &[Scene] {
        &self.future
    }

    /// Check if undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Check if redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}
