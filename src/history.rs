//! Bounded snapshot history with a movable pointer.

use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

impl HistoryAction {
    pub const fn applied_message(self) -> &'static str {
        match self {
            Self::Undo => "undo applied",
            Self::Redo => "redo applied",
        }
    }

    pub const fn empty_message(self) -> &'static str {
        match self {
            Self::Undo => "nothing to undo",
            Self::Redo => "nothing to redo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Recorded,
    /// The snapshot equals the current entry, so nothing was stored.
    Unchanged,
    /// A snapshot is being restored; commits are dropped, not queued.
    Suppressed,
}

/// Entries are owned by the history; callers only ever receive clones.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    pointer: usize,
    capacity: usize,
    restoring: bool,
}

impl<T: Clone + PartialEq> History<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            pointer: 0,
            capacity,
            restoring: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.pointer)
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.entries.len()
    }

    /// Stores `snapshot` after the current entry, discarding redo entries and
    /// evicting the oldest entry once over capacity.
    pub fn commit(&mut self, snapshot: T) -> CommitOutcome {
        if self.restoring {
            tracing::debug!("history commit suppressed during restore");
            return CommitOutcome::Suppressed;
        }
        if self.current() == Some(&snapshot) {
            return CommitOutcome::Unchanged;
        }

        if !self.entries.is_empty() {
            self.entries.truncate(self.pointer + 1);
        }
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.pointer = self.entries.len() - 1;
        tracing::debug!(
            pointer = self.pointer,
            len = self.entries.len(),
            "history snapshot recorded"
        );
        CommitOutcome::Recorded
    }

    /// Moves the pointer one step and returns a copy of the entry it lands on.
    pub fn step(&mut self, action: HistoryAction) -> Option<T> {
        let allowed = match action {
            HistoryAction::Undo => self.can_undo(),
            HistoryAction::Redo => self.can_redo(),
        };
        if !allowed {
            tracing::debug!("{}", action.empty_message());
            return None;
        }
        self.pointer = match action {
            HistoryAction::Undo => self.pointer - 1,
            HistoryAction::Redo => self.pointer + 1,
        };
        tracing::debug!(pointer = self.pointer, "{}", action.applied_message());
        self.current().cloned()
    }

    pub fn undo(&mut self) -> Option<T> {
        self.step(HistoryAction::Undo)
    }

    pub fn redo(&mut self) -> Option<T> {
        self.step(HistoryAction::Redo)
    }

    pub fn begin_restore(&mut self) {
        self.restoring = true;
    }

    pub fn end_restore(&mut self) {
        self.restoring = false;
    }

    pub const fn is_restoring(&self) -> bool {
        self.restoring
    }
}

impl<T: Clone + PartialEq> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_then_undo_and_redo_walk_the_pointer() {
        let mut history = History::new(10);
        history.commit(0);
        history.commit(1);
        history.commit(2);

        assert_eq!(history.undo(), Some(1));
        assert_eq!(history.undo(), Some(0));
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), Some(1));
        assert_eq!(history.redo(), Some(2));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn new_commit_discards_redo_entries() {
        let mut history = History::new(10);
        history.commit("a");
        history.commit("b");
        history.commit("c");
        history.undo();
        history.undo();

        assert_eq!(history.commit("d"), CommitOutcome::Recorded);
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some("a"));
    }

    #[test]
    fn duplicate_consecutive_commit_does_not_grow() {
        let mut history = History::new(10);
        history.commit(5);
        assert_eq!(history.commit(5), CommitOutcome::Unchanged);
        assert_eq!(history.len(), 1);

        history.commit(6);
        history.undo();
        assert_eq!(history.commit(5), CommitOutcome::Unchanged);
        assert!(history.can_redo());
    }

    #[test]
    fn capacity_evicts_oldest_entry() {
        let mut history = History::new(3);
        for value in 0..5 {
            history.commit(value);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.undo(), Some(3));
        assert_eq!(history.undo(), Some(2));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn commits_during_restore_are_suppressed() {
        let mut history = History::new(5);
        history.commit(1);
        history.begin_restore();
        assert!(history.is_restoring());
        assert_eq!(history.commit(2), CommitOutcome::Suppressed);
        history.end_restore();
        assert_eq!(history.len(), 1);
        assert_eq!(history.commit(2), CommitOutcome::Recorded);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut history = History::new(0);
        history.commit('x');
        history.commit('y');
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.current(), Some(&'y'));
        assert!(!history.can_undo());
    }
}
