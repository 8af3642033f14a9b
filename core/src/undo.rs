//! Snapshot undo/redo grouped by transaction label.

use std::fmt;

use crate::graph::Graph;

/// Label shared by every mutation of one user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

/// Hands out transaction labels. A transaction opened while another is
/// open gets the outer label, so nested work undoes as one step.
#[derive(Debug, Default)]
pub struct TransactionLabeler {
    next: u64,
    depth: usize,
    current: Option<TransactionId>,
}

impl TransactionLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> TransactionId {
        self.depth += 1;
        if let Some(current) = self.current {
            return current;
        }
        let id = TransactionId(self.next);
        self.next += 1;
        self.current = Some(id);
        id
    }

    /// Close the innermost transaction. Returns true when that closed the
    /// outermost one.
    pub fn end(&mut self) -> bool {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.current = None;
            return true;
        }
        false
    }

    pub fn current(&self) -> Option<TransactionId> {
        self.current
    }

    pub fn is_open(&self) -> bool {
        self.depth > 0
    }
}

#[derive(Debug, Clone)]
struct Entry {
    label: TransactionId,
    name: &'static str,
    before: Graph,
    after: Graph,
}

/// Before/after graph snapshots, one entry per transaction label.
#[derive(Debug)]
pub struct UndoHistory {
    undo: Vec<Entry>,
    redo: Vec<Entry>,
    limit: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(200)
    }
}

impl UndoHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a finished change. A change carrying the label of the newest
    /// entry extends that entry instead of adding one.
    pub fn record(&mut self, label: TransactionId, name: &'static str, before: Graph, after: Graph) {
        if before == after {
            return;
        }
        self.redo.clear();
        if let Some(last) = self.undo.last_mut() {
            if last.label == label {
                last.after = after;
                return;
            }
        }
        self.undo.push(Entry {
            label,
            name,
            before,
            after,
        });
        if self.undo.len() > self.limit {
            self.undo.remove(0);
        }
    }

    /// The graph to restore, with the name of the undone action.
    pub fn undo(&mut self) -> Option<(&'static str, Graph)> {
        let entry = self.undo.pop()?;
        let restored = (entry.name, entry.before.clone());
        self.redo.push(entry);
        Some(restored)
    }

    pub fn redo(&mut self) -> Option<(&'static str, Graph)> {
        let entry = self.redo.pop()?;
        let restored = (entry.name, entry.after.clone());
        self.undo.push(entry);
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
